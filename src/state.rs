//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - The job tracker
//! - The download orchestrator and its engine
//! - Server configuration

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::download::DownloadOrchestrator;
use crate::engine::{MediaEngine, YtDlp};
use crate::jobs::JobTracker;

/// Application state shared across all handlers
pub struct AppState {
    /// Job status records (job_id -> Job)
    pub jobs: Arc<JobTracker>,

    /// Starts and tracks download tasks
    pub downloads: DownloadOrchestrator,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create a new AppState backed by yt-dlp
    pub fn new(config: ServerConfig) -> Self {
        let engine = Arc::new(YtDlp::new(config.engine.clone()));
        Self::with_engine(config, engine)
    }

    /// Create an AppState with a specific engine
    pub fn with_engine(config: ServerConfig, engine: Arc<dyn MediaEngine>) -> Self {
        let jobs = Arc::new(JobTracker::new());
        let downloads = DownloadOrchestrator::new(
            Arc::clone(&jobs),
            engine,
            config.download_dir.clone(),
            config.engine.audio_format.clone(),
        );
        Self {
            jobs,
            downloads,
            config,
        }
    }
}
