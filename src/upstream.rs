//! Upstream fetcher
//!
//! Issues outbound GETs with a fixed browser-like identity and the
//! caller's byte range. Non-2xx statuses are returned, not raised, so the
//! relay can forward them as they are.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use url::Url;

use crate::classify::TransferMode;
use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};

/// Response read from an upstream origin
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.status, StatusCode::OK | StatusCode::PARTIAL_CONTENT)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(
            self.status,
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
        )
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// HTTP client wrapper carrying the relay's outbound identity
pub struct UpstreamFetcher {
    client: reqwest::Client,
    identity: HeaderMap,
    default_range: HeaderValue,
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| RelayError::Config(format!("invalid {} header value: {:?}", name, value)))
}

impl UpstreamFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(redirect)
            .build()?;

        let mut identity = HeaderMap::new();
        identity.insert(header::USER_AGENT, header_value("User-Agent", &config.user_agent)?);
        identity.insert(header::ACCEPT, header_value("Accept", &config.accept)?);
        identity.insert(
            header::ACCEPT_LANGUAGE,
            header_value("Accept-Language", &config.accept_language)?,
        );
        identity.insert(header::ORIGIN, header_value("Origin", &config.origin)?);
        identity.insert(header::REFERER, header_value("Referer", &config.referer)?);

        Ok(Self {
            client,
            identity,
            default_range: header_value("Range", &config.default_range)?,
        })
    }

    /// Single GET to `url`. The body is decoded as text or kept as raw bytes
    /// depending on `mode`.
    pub async fn fetch(
        &self,
        url: &str,
        range: Option<&HeaderValue>,
        mode: TransferMode,
    ) -> Result<UpstreamResponse> {
        let range = range.unwrap_or(&self.default_range).clone();
        let response = self
            .client
            .get(url)
            .headers(self.identity.clone())
            .header(header::RANGE, range)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = match mode {
            TransferMode::Text => Bytes::from(response.text().await?),
            TransferMode::Binary => response.bytes().await?,
        };

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }

    /// GET `url`, following at most one further 301/302 by hand.
    ///
    /// Whatever the second request returns is final, even another redirect.
    pub async fn fetch_with_redirect(
        &self,
        url: &str,
        range: Option<&HeaderValue>,
        mode: TransferMode,
    ) -> Result<UpstreamResponse> {
        let first = self.fetch(url, range, mode).await?;
        if !first.is_redirect() {
            return Ok(first);
        }

        let target = match first.location() {
            Some(location) => resolve_location(url, location)?,
            None => {
                tracing::warn!("{} from {} without a Location header", first.status, url);
                return Ok(first);
            }
        };

        tracing::info!("Following redirect to: {}", target);
        self.fetch(&target, range, mode).await
    }
}

/// Resolve a `Location` value against the URL that produced it
pub fn resolve_location(base: &str, location: &str) -> Result<String> {
    let resolved = match Url::parse(base) {
        Ok(base) => base.join(location),
        Err(_) => Url::parse(location),
    };
    resolved
        .map(|u| u.to_string())
        .map_err(|e| RelayError::InvalidRedirect(format!("{}: {}", location, e)))
}
