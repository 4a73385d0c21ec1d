//! Axum router configuration

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{cache_stats, health_check, proxy, proxy_preflight, version_check};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Debug endpoints
        .route("/debug/cache", get(cache_stats))
        // Relay
        .route("/proxy", get(proxy).options(proxy_preflight))
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
