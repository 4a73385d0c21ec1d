//! Server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Default browser identity presented to upstream origins
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for cached playlists in milliseconds
    pub playlist_ttl_ms: u64,

    /// Freshness window for cached segments in milliseconds
    pub segment_ttl_ms: u64,

    /// Period of the background sweep in seconds
    pub sweep_interval_secs: u64,

    /// Share one upstream fetch between concurrent misses on the same URL.
    /// Waiters get the first caller's response, including the body for its
    /// `Range`, just as later cache hits do.
    pub coalesce_misses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            playlist_ttl_ms: 2_000,
            segment_ttl_ms: 30_000,
            sweep_interval_secs: 60,
            coalesce_misses: false,
        }
    }
}

impl CacheConfig {
    pub fn playlist_ttl(&self) -> Duration {
        Duration::from_millis(self.playlist_ttl_ms)
    }

    pub fn segment_ttl(&self) -> Duration {
        Duration::from_millis(self.segment_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Outbound request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Redirects the client follows on its own; 0 disables automatic following
    pub max_redirects: usize,

    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub origin: String,
    pub referer: String,

    /// Range sent when the inbound request carries none
    pub default_range: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_redirects: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: "*/*".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            origin: "http://localhost:8080".to_string(),
            referer: "http://localhost:8080/".to_string(),
            default_range: "bytes=0-".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Substrings that identify playlists and segments in URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    pub playlist: Vec<String>,
    pub segment: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            playlist: vec![".m3u8".to_string()],
            segment: vec![".ts".to_string(), ".js?".to_string()],
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Externally visible base URL used when rewriting playlists.
    /// Falls back to `http://localhost:<port>`.
    pub public_url: Option<String>,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Upstream client configuration
    pub upstream: UpstreamConfig,

    /// URL classification markers
    pub markers: MarkerConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            public_url: None,
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            markers: MarkerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL that rewritten playlist entries point at
    pub fn relay_base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    /// Apply `PORT` and `RELAY_PUBLIC_URL` from the environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var("PORT").ok(),
            std::env::var("RELAY_PUBLIC_URL").ok(),
        )
    }

    fn apply_overrides(&mut self, port: Option<String>, public_url: Option<String>) -> Result<()> {
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| RelayError::Config(format!("invalid PORT value: {:?}", port)))?;
        }
        if let Some(url) = public_url.filter(|u| !u.is_empty()) {
            self.public_url = Some(url);
        }
        Ok(())
    }
}
