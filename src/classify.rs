//! Request classification
//!
//! Decides whether a relayed URL is a playlist or a media segment. The
//! answer picks the cache bucket and whether the upstream body is decoded
//! as text or kept as raw bytes.

use crate::config::MarkerConfig;

/// Kind of resource a relayed URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Playlist,
    Segment,
}

/// How the upstream body is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Text,
    Binary,
}

impl Classification {
    pub fn transfer_mode(self) -> TransferMode {
        match self {
            Classification::Playlist => TransferMode::Text,
            Classification::Segment => TransferMode::Binary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Playlist => "playlist",
            Classification::Segment => "segment",
        }
    }
}

/// URL classifier driven by configured substring markers
#[derive(Debug, Clone)]
pub struct Classifier {
    playlist_markers: Vec<String>,
    segment_markers: Vec<String>,
}

impl Classifier {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self {
            playlist_markers: markers.playlist.clone(),
            segment_markers: markers.segment.clone(),
        }
    }

    /// Classify a request URL. The playlist check runs first, so a URL that
    /// carries both kinds of marker is a playlist. Anything that is not a
    /// playlist is relayed as a segment.
    pub fn classify(&self, url: &str) -> Classification {
        if self.is_playlist(url) {
            Classification::Playlist
        } else {
            Classification::Segment
        }
    }

    pub fn is_playlist(&self, url: &str) -> bool {
        self.playlist_markers.iter().any(|m| url.contains(m.as_str()))
    }

    pub fn is_segment(&self, url: &str) -> bool {
        self.segment_markers.iter().any(|m| url.contains(m.as_str()))
    }

    /// Whether a URL found inside a playlist should be routed back through
    /// the relay.
    pub fn is_relayable(&self, url: &str) -> bool {
        self.is_playlist(url) || self.is_segment(url)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&MarkerConfig::default())
    }
}
