//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - The two cache buckets (playlists, segments)
//! - Media-sequence continuity state
//! - The upstream fetcher and playlist rewriter
//! - Server configuration

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::classify::{Classification, Classifier};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::http::cache::ResponseCache;
use crate::playlist::{ContinuityState, PlaylistRewriter};
use crate::relay::RelayResponse;
use crate::upstream::UpstreamFetcher;

/// Application state shared across all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    pub classifier: Classifier,

    pub fetcher: UpstreamFetcher,

    pub rewriter: PlaylistRewriter,

    /// Last adopted (host, media sequence) pair
    pub continuity: ContinuityState,

    /// Short-lived playlist bucket
    pub playlist_cache: ResponseCache,

    /// Longer-lived segment bucket
    pub segment_cache: ResponseCache,

    /// In-flight upstream fetches: request URL -> shared cell resolving to the response.
    /// Only used when miss coalescing is enabled.
    pub in_flight: DashMap<String, Arc<OnceCell<RelayResponse>>>,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        let classifier = Classifier::new(&config.markers);
        let rewriter = PlaylistRewriter::new(config.relay_base_url(), classifier.clone());

        Ok(Self {
            fetcher: UpstreamFetcher::new(&config.upstream)?,
            playlist_cache: ResponseCache::new("playlist", config.cache.playlist_ttl()),
            segment_cache: ResponseCache::new("segment", config.cache.segment_ttl()),
            continuity: ContinuityState::new(),
            in_flight: DashMap::new(),
            classifier,
            rewriter,
            config,
        })
    }

    /// Cache bucket for a classification
    pub fn cache_for(&self, class: Classification) -> &ResponseCache {
        match class {
            Classification::Playlist => &self.playlist_cache,
            Classification::Segment => &self.segment_cache,
        }
    }

    /// Sweep both buckets, returning the number of evicted entries
    pub fn sweep_caches(&self) -> usize {
        self.playlist_cache.sweep() + self.segment_cache.sweep()
    }
}

/// Background task: sweep expired cache entries every `sweep_interval`.
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.cache.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = state.sweep_caches();
            if removed > 0 {
                tracing::info!("Swept {} expired cache entries", removed);
            } else {
                tracing::debug!("Cache sweep found nothing to evict");
            }
        }
    })
}
