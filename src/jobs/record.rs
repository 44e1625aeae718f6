//! Job status record
//!
//! One record per accepted download request. The record is what
//! `GET /status/{id}` serializes, so field names follow the wire format.

use serde::{Deserialize, Serialize};

/// Progress reported while the download is done but transcoding still runs.
pub const FINISHED_MILESTONE: f64 = 95.0;

/// Highest progress a job may show before it reaches `completed`.
pub const MAX_RUNNING_PROGRESS: f64 = 99.9;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Downloading,
    Completed,
    Error,
    PlaylistDetected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::PlaylistDetected => "playlist_detected",
        }
    }

    /// Terminal states accept no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Position inside a playlist download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistProgress {
    pub current: u32,
    pub total: u32,
}

/// Mutable status record of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub status: JobStatus,
    pub progress: f64,
    pub log: Vec<String>,
    pub filename: Option<String>,
    pub is_playlist: bool,
    pub playlist_progress: PlaylistProgress,
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

impl Job {
    /// Fresh record for a job that was just accepted
    pub fn new() -> Self {
        Self {
            status: JobStatus::Downloading,
            progress: 0.0,
            log: vec!["Initializing download...".to_string()],
            filename: None,
            is_playlist: false,
            playlist_progress: PlaylistProgress::default(),
        }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    /// Record download progress. Ignored once the job is terminal.
    pub fn set_progress(&mut self, percent: f64) {
        if self.status.is_terminal() || !percent.is_finite() {
            return;
        }
        self.progress = round1(percent.clamp(0.0, MAX_RUNNING_PROGRESS));
    }

    pub fn set_playlist_position(&mut self, current: u32, total: u32) {
        if self.status.is_terminal() {
            return;
        }
        self.playlist_progress = PlaylistProgress { current, total };
    }

    /// Move to `error`. One-way: progress resets and stays at 0.
    pub fn fail(&mut self) {
        self.status = JobStatus::Error;
        self.progress = 0.0;
    }

    /// Move to `completed` unless the job already failed.
    /// Returns whether the transition happened.
    pub fn complete(&mut self) -> bool {
        if self.status == JobStatus::Error {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        true
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
