//! HTTP request handlers

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::RelayError;
use crate::relay::{self, RelayResponse};
use crate::state::AppState;

/// Query parameters for `/proxy`
#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    /// Upstream resource to relay
    pub url: Option<String>,
}

/// Relay endpoint
/// GET /proxy?url=<upstream url>
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<RelayResponse, RelayError> {
    relay::handle(&state, query.url.as_deref(), headers.get(header::RANGE)).await
}

/// CORS preflight for the relay endpoint
/// OPTIONS /proxy
pub async fn proxy_preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, relay::cors_headers())
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Version information endpoint
pub async fn version_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Debug endpoint - cache statistics
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "playlist": state.playlist_cache.stats(),
        "segment": state.segment_cache.stats(),
        "in_flight": state.in_flight.len(),
        "continuity": state.continuity.baseline().map(|b| serde_json::json!({
            "host": b.host,
            "media_sequence": b.media_sequence,
        })),
    }))
}
