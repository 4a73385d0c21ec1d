//! Integration testing module
//!
//! End-to-end tests for the relay:
//! - Playlist rewriting and caching
//! - Segment byte passthrough with ranges
//! - Redirect, error and transport-failure handling
//! - Media-sequence continuity across origins

pub mod fixtures;
