//! HLS Relay
//!
//! Forwards HLS playlists and segments on behalf of players, rewriting
//! playlist URLs so every follow-up request comes back through the relay,
//! and caching responses briefly so many players polling the same live
//! stream cost one upstream fetch.

mod classify;
mod config;
mod config_file;
mod error;
mod http;
mod playlist;
mod relay;
mod state;
mod upstream;

#[cfg(test)]
mod integration;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::error::{RelayError, Result};
use crate::http::create_router;
use crate::state::{spawn_sweeper, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "hls-relay";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let (mut config, load_error) = match crate::config_file::load_config(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (ServerConfig::default(), Some(e)),
    };
    config.apply_env()?;

    // Initialize logging
    init_logging(&config.log_level);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!("{}. Using defaults.", e);
    }
    tracing::info!("Configuration loaded: {:?}", config);

    // Create application state
    let state = Arc::new(AppState::new(config.clone())?);

    // Background task: sweep expired cache entries.
    spawn_sweeper(Arc::clone(&state));

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Proxy server running on {}", addr);
    tracing::info!("Rewriting playlists to {}", state.rewriter.relay_base());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hls_relay={},tower_http=info", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
