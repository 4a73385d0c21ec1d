//! Playlist processing module
//!
//! This module handles relayed HLS playlists:
//! - URL rewriting so playlists and segments are fetched through the relay
//! - Media-sequence continuity when the upstream host changes

pub mod continuity;
pub mod rewrite;

pub use continuity::ContinuityState;
pub use rewrite::PlaylistRewriter;
