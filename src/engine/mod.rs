//! External extraction engine
//!
//! The engine fetches media and transcodes it to audio. It reports what it
//! is doing through an [`EventSink`], a channel the download task drains
//! into the job record. The engine never touches job state itself.

pub mod output;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::jobs::record::round1;

pub use ytdlp::YtDlp;

/// How the engine treats a URL that references a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistMode {
    /// Let the engine decide (URL is not playlist-bearing)
    Auto,
    /// Only the single video the URL points at
    Single,
    /// Every entry of the playlist
    Entire,
}

/// Parameters of one download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub playlist: PlaylistMode,
    pub output_dir: PathBuf,
}

/// Metadata of a playlist found by a probe
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSummary {
    pub title: String,
    pub video_count: usize,
    pub uploader: String,
}

/// Severity of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Post-processing stage boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessStage {
    Started,
    Finished,
}

/// A single download progress report.
///
/// The engine reports either byte counts or a pre-formatted percentage;
/// any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    pub percent_str: Option<String>,
    pub playlist_index: Option<u32>,
    pub playlist_count: Option<u32>,
}

impl ProgressEvent {
    /// Percentage rounded to one decimal. Exact totals win over estimates,
    /// which win over the percent string. `None` if nothing is usable.
    pub fn percent(&self) -> Option<f64> {
        let total = self
            .total_bytes
            .filter(|t| *t > 0.0)
            .or(self.total_bytes_estimate.filter(|t| *t > 0.0));

        if let (Some(done), Some(total)) = (self.downloaded_bytes, total) {
            return Some(round1(done / total * 100.0));
        }

        self.percent_str.as_deref().and_then(parse_percent)
    }

    /// Playlist position, when the event carries both halves
    pub fn playlist_position(&self) -> Option<(u32, u32)> {
        match (self.playlist_index, self.playlist_count) {
            (Some(current), Some(total)) => Some((current, total)),
            _ => None,
        }
    }
}

/// Parse strings like `" 45.2%"`. Garbage yields `None`.
pub fn parse_percent(s: &str) -> Option<f64> {
    let value = s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?;
    value.is_finite().then(|| round1(value))
}

/// Everything an engine can report while it works
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(ProgressEvent),
    /// Download done, transcoding starts
    Finished,
    PostProcess {
        stage: PostProcessStage,
        name: String,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    /// Path of a produced output file
    Output(PathBuf),
}

/// Sending half of the engine event channel.
///
/// Sends never fail: once the receiving task is gone, events are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn finished(&self) {
        self.send(EngineEvent::Finished);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.send(EngineEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub fn output(&self, path: impl Into<PathBuf>) {
        self.send(EngineEvent::Output(path.into()));
    }
}

/// The external extraction and transcoding tool.
///
/// `download` receives the sink by value and must not keep it (or clones
/// of it) alive after returning: the caller treats the closed channel as
/// the end of the event stream.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    fn name(&self) -> &str;

    /// List playlist metadata without downloading anything.
    /// `Ok(None)` means the URL does not resolve to a playlist.
    async fn probe_playlist(&self, url: &str) -> Result<Option<PlaylistSummary>, EngineError>;

    /// Fetch and transcode, reporting through `sink`.
    async fn download(&self, request: DownloadRequest, sink: EventSink) -> Result<(), EngineError>;
}
