//! TTL response cache
//!
//! Holds the most recent successful upstream response per request URL,
//! along with the status and headers to replay. Entries are replaced
//! wholesale and never mutated in place. Freshness is checked on lookup,
//! and a periodic sweep drops entries for URLs nobody asks for anymore.

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Cached response
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self::stored_at(status, headers, body, Instant::now())
    }

    pub fn stored_at(status: StatusCode, headers: HeaderMap, body: Bytes, at: Instant) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: at,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        self.age(now) < ttl
    }
}

/// One cache bucket with its own time-to-live
pub struct ResponseCache {
    name: &'static str,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry for `url`
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.get_at(url, Instant::now())
    }

    /// Look up a fresh entry for `url` as of `now`. A stale entry is evicted
    /// and reported as a miss.
    pub fn get_at(&self, url: &str, now: Instant) -> Option<CacheEntry> {
        match self.entries.get(url) {
            Some(entry) if entry.is_fresh(self.ttl, now) => return Some(entry.value().clone()),
            Some(_) => {}
            None => return None,
        }

        // Only drop it if nobody replaced it with a fresh one meanwhile.
        self.entries
            .remove_if(url, |_, entry| !entry.is_fresh(self.ttl, now));
        None
    }

    /// Store an entry, overwriting whatever was there
    pub fn insert(&self, url: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(url.into(), entry);
    }

    #[cfg(test)]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Remove every entry older than the TTL
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        if self.is_empty() {
            return 0;
        }
        let before = self.len();
        self.entries.retain(|_, entry| entry.age(now) <= self.ttl);
        before.saturating_sub(self.len())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut total_size = 0;
        let mut oldest_age = Duration::ZERO;

        for entry in self.entries.iter() {
            total_size += entry.value().body.len();
            oldest_age = oldest_age.max(entry.value().age(now));
        }

        CacheStats {
            name: self.name,
            entry_count: self.len(),
            total_size_bytes: total_size,
            ttl_ms: self.ttl().as_millis() as u64,
            oldest_entry_age_ms: oldest_age.as_millis() as u64,
        }
    }

    /// Get the number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache statistics
#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub name: &'static str,
    pub entry_count: usize,
    pub total_size_bytes: usize,
    pub ttl_ms: u64,
    pub oldest_entry_age_ms: u64,
}
