//! Playlist rewriting
//!
//! Points every playlist and segment URL inside a playlist back at the
//! relay, and applies media-sequence continuity.

use url::Url;

use super::continuity::{ContinuityState, Reconciled};
use crate::classify::Classifier;

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

fn media_sequence_re() -> &'static regex::Regex {
    regex!(r"#EXT-X-MEDIA-SEQUENCE:(\d+)")
}

/// Absolute URL with a path. Stops at whitespace and quotes so URLs inside
/// `URI="..."` attributes keep their closing quote.
fn absolute_url_re() -> &'static regex::Regex {
    regex!(r#"https?://[^/\s"']+/[^\s"']+"#)
}

/// Scheme and authority of `url`, e.g. `https://cdn.example.com:8443`
pub fn host_of(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}

/// Value of the first `#EXT-X-MEDIA-SEQUENCE` tag
pub fn media_sequence(playlist: &str) -> Option<u64> {
    media_sequence_re()
        .captures(playlist)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Relay URL that fetches `target` through `/proxy`
pub fn relay_url(relay_base: &str, target: &str) -> String {
    format!("{}/proxy?url={}", relay_base, urlencoding::encode(target))
}

/// Rewrites playlists fetched through the relay
#[derive(Debug, Clone)]
pub struct PlaylistRewriter {
    relay_base: String,
    classifier: Classifier,
}

impl PlaylistRewriter {
    pub fn new(relay_base: impl Into<String>, classifier: Classifier) -> Self {
        Self {
            relay_base: relay_base.into(),
            classifier,
        }
    }

    pub fn relay_base(&self) -> &str {
        &self.relay_base
    }

    /// Rewrite `playlist`, fetched from `source_url`, updating `continuity`.
    pub fn rewrite(&self, playlist: &str, source_url: &str, continuity: &ContinuityState) -> String {
        let text = match (host_of(source_url), media_sequence(playlist)) {
            (Some(host), Some(seq)) => match continuity.reconcile(&host, seq) {
                Reconciled::Pinned(pinned) if pinned != seq => {
                    tracing::info!(
                        "Host {} differs from baseline, advertising media sequence {} instead of {}",
                        host,
                        pinned,
                        seq
                    );
                    media_sequence_re()
                        .replace(playlist, format!("#EXT-X-MEDIA-SEQUENCE:{}", pinned))
                        .into_owned()
                }
                _ => playlist.to_string(),
            },
            _ => playlist.to_string(),
        };

        self.rewrite_urls(&text)
    }

    /// Replace every relayable absolute URL with its relay form
    pub fn rewrite_urls(&self, playlist: &str) -> String {
        absolute_url_re()
            .replace_all(playlist, |caps: &regex::Captures| {
                let url = &caps[0];
                if self.classifier.is_relayable(url) {
                    relay_url(&self.relay_base, url)
                } else {
                    url.to_string()
                }
            })
            .into_owned()
    }
}
