//! Playlist detection
//!
//! URL classification is a cheap pattern match; whether the URL really
//! resolves to a playlist is only known after a probe.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::engine::PlaylistSummary;

/// Whether the URL looks like it references a collection of videos
pub fn is_playlist_url(url: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[&?]list=|playlist\?|/playlist").expect("static playlist pattern")
    })
    .is_match(url)
}

/// Result of a playlist probe, as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub is_playlist: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlaylistInfo {
    pub fn not_playlist() -> Self {
        Self {
            is_playlist: false,
            title: None,
            video_count: None,
            uploader: None,
            error: None,
        }
    }

    pub fn probe_failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::not_playlist()
        }
    }
}

impl From<PlaylistSummary> for PlaylistInfo {
    fn from(summary: PlaylistSummary) -> Self {
        Self {
            is_playlist: true,
            title: Some(summary.title),
            video_count: Some(summary.video_count),
            uploader: Some(summary.uploader),
            error: None,
        }
    }
}
