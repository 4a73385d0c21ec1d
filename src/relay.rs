//! Relay endpoint
//!
//! Classify, check the cache, fetch (one manual redirect hop at most),
//! rewrite playlists, populate the cache and reply. Only 200/206 bodies are
//! cached, always under the URL the client asked for.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;

use crate::classify::Classification;
use crate::error::{RelayError, Result};
use crate::http::cache::CacheEntry;
use crate::state::AppState;
use crate::upstream::UpstreamResponse;

/// Response produced by the relay
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RelayResponse {
    fn from_cache(entry: CacheEntry) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers,
            body: entry.body,
        }
    }

    /// Forward a non-success upstream response as it is
    fn passthrough(upstream: UpstreamResponse) -> Self {
        let mut headers = cors_headers();
        if let Some(ct) = upstream.headers.get(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, ct.clone());
        }
        Self {
            status: upstream.status,
            headers,
            body: upstream.body,
        }
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Permissive CORS headers attached to every relay response
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers
}

/// Headers replayed for a successful relay, fresh or cached
pub fn success_headers(upstream: &HeaderMap, body_len: usize) -> HeaderMap {
    let mut headers = cors_headers();

    let copied: [HeaderName; 2] = [header::CONTENT_TYPE, header::CONTENT_RANGE];
    for name in copied {
        if let Some(value) = upstream.get(&name) {
            headers.insert(name, value.clone());
        }
    }

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

/// Relay `url`, passing `range` through to the upstream request.
pub async fn handle(
    state: &AppState,
    url: Option<&str>,
    range: Option<&HeaderValue>,
) -> Result<RelayResponse> {
    let url = url.filter(|u| !u.is_empty()).ok_or(RelayError::MissingUrl)?;

    let class = state.classifier.classify(url);
    let cache = state.cache_for(class);

    if let Some(entry) = cache.get(url) {
        tracing::debug!("Serving from {} cache: {}", cache.name(), url);
        return Ok(RelayResponse::from_cache(entry));
    }

    tracing::info!("Proxying request to: {}", url);

    if !state.config.cache.coalesce_misses {
        return fetch_and_store(state, url, range, class).await;
    }

    // Concurrent misses on the same URL wait on one shared fetch.
    let cell = state
        .in_flight
        .entry(url.to_string())
        .or_insert_with(|| Arc::new(tokio::sync::OnceCell::new()))
        .clone();

    let result = cell
        .get_or_try_init(|| fetch_and_store(state, url, range, class))
        .await
        .cloned();

    state
        .in_flight
        .remove_if(url, |_, current| Arc::ptr_eq(current, &cell));

    result
}

async fn fetch_and_store(
    state: &AppState,
    url: &str,
    range: Option<&HeaderValue>,
    class: Classification,
) -> Result<RelayResponse> {
    let upstream = state
        .fetcher
        .fetch_with_redirect(url, range, class.transfer_mode())
        .await
        .map_err(|e| {
            tracing::error!("Proxy Error for {}: {}", url, e);
            e
        })?;

    if !upstream.is_success() {
        tracing::warn!("Proxy Error - Status: {} for {}", upstream.status, url);
        return Ok(RelayResponse::passthrough(upstream));
    }

    let body = match class {
        Classification::Playlist => {
            let text = String::from_utf8_lossy(&upstream.body);
            let rewritten = state.rewriter.rewrite(&text, url, &state.continuity);
            Bytes::from(rewritten)
        }
        Classification::Segment => upstream.body.clone(),
    };

    let headers = success_headers(&upstream.headers, body.len());
    state.cache_for(class).insert(
        url,
        CacheEntry::new(upstream.status, headers.clone(), body.clone()),
    );

    tracing::info!("Successfully proxied {} ({}): {}", class.as_str(), upstream.status, url);

    Ok(RelayResponse {
        status: upstream.status,
        headers,
        body,
    })
}
