//! Test fixtures for integration tests
//!
//! A mock HLS origin served by axum on an ephemeral port, with per-path
//! request counters, plus helpers to drive the relay router in-process.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::util::ServiceExt;

use crate::config::{ServerConfig, UpstreamConfig};
use crate::http::create_router;
use crate::state::AppState;

/// Raw segment bytes; deliberately not valid UTF-8
pub const SEGMENT_BYTES: &[u8] = &[0x47, 0x40, 0x00, 0x10, 0xff, 0xfe, 0x00, 0x80];

/// Base URL the relay advertises in rewritten playlists
pub const RELAY_BASE: &str = "http://relay.test";

#[derive(Clone)]
struct OriginState {
    base_url: String,
    media_sequence: Arc<AtomicU64>,
}

/// Mock HLS origin
pub struct MockOrigin {
    base_url: String,
    media_sequence: Arc<AtomicU64>,
    request_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockOrigin {
    pub async fn start(media_sequence: u64) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://127.0.0.1:{}", addr.port());

        let media_sequence = Arc::new(AtomicU64::new(media_sequence));
        let request_counts = Arc::new(Mutex::new(HashMap::new()));
        let request_counts_clone = request_counts.clone();

        let origin = OriginState {
            base_url: base_url.clone(),
            media_sequence: media_sequence.clone(),
        };

        let app = Router::new()
            .route("/live/index.m3u8", get(live_playlist))
            .route("/live/seg1.ts", get(segment))
            .route("/missing.ts", get(missing))
            .route("/moved/index.m3u8", get(|| async { redirect("/live/index.m3u8") }))
            .route("/hop1.ts", get(|| async { redirect("/hop2.ts") }))
            .route("/hop2.ts", get(|| async { redirect("/live/seg1.ts") }))
            .route("/gone.ts", get(|| async { redirect("/missing.ts") }))
            .route("/slow.ts", get(slow_segment))
            .route("/echo.ts", get(echo_identity))
            .layer(axum::middleware::from_fn(
                move |req: axum::extract::Request, next: axum::middleware::Next| {
                    let counts = request_counts_clone.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        if let Ok(mut counts) = counts.lock() {
                            *counts.entry(path).or_insert(0) += 1;
                        }
                        next.run(req).await
                    }
                },
            ))
            .with_state(origin);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            media_sequence,
            request_counts,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_media_sequence(&self, seq: u64) {
        self.media_sequence.store(seq, Ordering::SeqCst);
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.request_counts
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.request_counts.lock().unwrap().values().sum()
    }
}

/// Live playlist whose segment URLs are absolute and point at this origin
pub fn playlist_text(base_url: &str, seq: u64) -> String {
    format!(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:{seq}\n\
         #EXTINF:6.0,\n{base}/live/seg{seq}.ts\n#EXTINF:6.0,\n{base}/live/seg{next}.ts\n\
         #EXT-X-PROGRAM-DATE-TIME:2024-01-01T00:00:00Z\n",
        seq = seq,
        next = seq + 1,
        base = base_url
    )
}

async fn live_playlist(State(origin): State<OriginState>) -> impl IntoResponse {
    let seq = origin.media_sequence.load(Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        playlist_text(&origin.base_url, seq),
    )
}

async fn segment(headers: HeaderMap) -> impl IntoResponse {
    let len = SEGMENT_BYTES.len();
    let mut response = (
        [(header::CONTENT_TYPE, "video/mp2t")],
        Bytes::from_static(SEGMENT_BYTES),
    )
        .into_response();

    if headers.contains_key(header::RANGE) {
        *response.status_mut() = StatusCode::PARTIAL_CONTENT;
        response.headers_mut().insert(
            header::CONTENT_RANGE,
            format!("bytes 0-{}/{}", len - 1, len).parse().unwrap(),
        );
    }
    response
}

async fn slow_segment() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Bytes::from_static(SEGMENT_BYTES)
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not here")
}

fn redirect(location: &'static str) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location)])
}

/// Echo the identity headers the relay presented
async fn echo_identity(headers: HeaderMap) -> impl IntoResponse {
    let value_of = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    serde_json::json!({
        "user_agent": value_of(header::USER_AGENT),
        "range": value_of(header::RANGE),
        "origin": value_of(header::ORIGIN),
        "referer": value_of(header::REFERER),
    })
    .to_string()
}

/// Relay configuration for tests. Automatic redirects are off so the
/// manual hop is observable.
pub fn relay_config() -> ServerConfig {
    ServerConfig {
        public_url: Some(RELAY_BASE.to_string()),
        upstream: UpstreamConfig {
            max_redirects: 0,
            timeout_secs: 5,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn relay_state(config: ServerConfig) -> Arc<AppState> {
    Arc::new(AppState::new(config).unwrap())
}

/// Response captured from the relay router
pub struct Captured {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Relay path for an upstream URL
pub fn proxy_path(upstream: &str) -> String {
    format!("/proxy?url={}", urlencoding::encode(upstream))
}

/// Send a GET through the relay router
pub async fn relay_get(state: &Arc<AppState>, path: &str, range: Option<&str>) -> Captured {
    let mut request = Request::get(path);
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }
    let response = create_router(state.clone())
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Captured {
        status,
        headers,
        body,
    }
}

/// Upstream URLs embedded in a rewritten playlist, decoded
pub fn relayed_urls(playlist: &str) -> Vec<String> {
    let prefix = format!("{}/proxy?url=", RELAY_BASE);
    playlist
        .lines()
        .filter_map(|l| l.strip_prefix(prefix.as_str()))
        .map(|enc| urlencoding::decode(enc).unwrap().into_owned())
        .collect()
}
