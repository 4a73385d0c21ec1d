//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section and field is
//! optional; anything left out keeps its built-in default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{CacheConfig, MarkerConfig, ServerConfig, UpstreamConfig};
use crate::error::{RelayError, Result};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Cache settings
    pub cache: Option<CacheSettings>,
    /// Upstream client settings
    pub upstream: Option<UpstreamSettings>,
    /// URL marker settings
    pub markers: Option<MarkerSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Externally visible base URL
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    pub playlist_ttl_ms: Option<u64>,
    pub segment_ttl_ms: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    pub coalesce_misses: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSettings {
    pub timeout_secs: Option<u64>,
    pub max_redirects: Option<usize>,
    pub user_agent: Option<String>,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub default_range: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkerSettings {
    pub playlist: Option<Vec<String>>,
    pub segment: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(
        path: P,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn to_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Convert to ServerConfig, filling gaps from the defaults
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let server = self.server.unwrap_or_default();
        let cache = self.cache.unwrap_or_default();
        let upstream = self.upstream.unwrap_or_default();
        let markers = self.markers.unwrap_or_default();

        let cache_defaults = CacheConfig::default();
        let upstream_defaults = UpstreamConfig::default();
        let marker_defaults = MarkerConfig::default();

        ServerConfig {
            host: server.host.unwrap_or(defaults.host),
            port: server.port.unwrap_or(defaults.port),
            public_url: server.public_url.or(defaults.public_url),
            cache: CacheConfig {
                playlist_ttl_ms: cache
                    .playlist_ttl_ms
                    .unwrap_or(cache_defaults.playlist_ttl_ms),
                segment_ttl_ms: cache.segment_ttl_ms.unwrap_or(cache_defaults.segment_ttl_ms),
                sweep_interval_secs: cache
                    .sweep_interval_secs
                    .unwrap_or(cache_defaults.sweep_interval_secs),
                coalesce_misses: cache
                    .coalesce_misses
                    .unwrap_or(cache_defaults.coalesce_misses),
            },
            upstream: UpstreamConfig {
                timeout_secs: upstream
                    .timeout_secs
                    .unwrap_or(upstream_defaults.timeout_secs),
                max_redirects: upstream
                    .max_redirects
                    .unwrap_or(upstream_defaults.max_redirects),
                user_agent: upstream.user_agent.unwrap_or(upstream_defaults.user_agent),
                accept: upstream.accept.unwrap_or(upstream_defaults.accept),
                accept_language: upstream
                    .accept_language
                    .unwrap_or(upstream_defaults.accept_language),
                origin: upstream.origin.unwrap_or(upstream_defaults.origin),
                referer: upstream.referer.unwrap_or(upstream_defaults.referer),
                default_range: upstream
                    .default_range
                    .unwrap_or(upstream_defaults.default_range),
            },
            markers: MarkerConfig {
                playlist: markers.playlist.unwrap_or(marker_defaults.playlist),
                segment: markers.segment.unwrap_or(marker_defaults.segment),
            },
            log_level: self
                .logging
                .map(|l| l.level)
                .unwrap_or(defaults.log_level),
        }
    }
}

/// Load the configuration at `path`. A missing file yields the defaults;
/// a file that exists but cannot be read or parsed is an error, which the
/// caller reports once logging is up.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServerConfig::default());
    }
    ConfigFile::from_file(path)
        .map(ConfigFile::into_server_config)
        .map_err(|e| {
            RelayError::Config(format!(
                "failed to load config file {}: {}",
                path.display(),
                e
            ))
        })
}
