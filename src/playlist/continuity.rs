//! Media-sequence continuity across upstream host changes
//!
//! Live playlists can move between origins mid-stream (failover, CDN
//! switch). The new origin usually advertises an unrelated media sequence,
//! and players stall when the counter jumps. While playlists keep arriving
//! from a host other than the recorded one, the recorded sequence number is
//! advertised instead.

use parking_lot::Mutex;

/// Last host and media sequence adopted as reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub host: String,
    pub media_sequence: u64,
}

/// Result of reconciling one playlist against the recorded baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The playlist's own sequence became the new baseline
    Adopted(u64),
    /// The host differs from the baseline; advertise this sequence instead
    Pinned(u64),
}

/// Shared continuity state, one per relay
#[derive(Debug, Default)]
pub struct ContinuityState {
    baseline: Mutex<Option<Baseline>>,
}

impl ContinuityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline.lock().clone()
    }

    /// Reconcile a playlist served by `host` that declares `media_sequence`.
    ///
    /// The read-modify-write happens under one lock so concurrent playlists
    /// never interleave between the comparison and the update.
    pub fn reconcile(&self, host: &str, media_sequence: u64) -> Reconciled {
        let mut baseline = self.baseline.lock();
        match baseline.as_ref() {
            Some(prev) if prev.host != host => Reconciled::Pinned(prev.media_sequence),
            _ => {
                *baseline = Some(Baseline {
                    host: host.to_string(),
                    media_sequence,
                });
                Reconciled::Adopted(media_sequence)
            }
        }
    }
}
