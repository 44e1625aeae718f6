//! Download orchestration
//!
//! Accepts download requests, creates the job record, and runs one
//! background task per job that drives the engine and folds its events
//! into the [`JobTracker`].

pub mod playlist;

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::engine::{
    DownloadRequest, EngineEvent, EventSink, LogLevel, MediaEngine, PlaylistMode,
    PostProcessStage, ProgressEvent,
};
use crate::error::{AppError, EngineError, Result};
use crate::jobs::record::FINISHED_MILESTONE;
use crate::jobs::{new_job_id, Job, JobTracker};

pub use playlist::{is_playlist_url, PlaylistInfo};

/// What happened to a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A job was created and its task started
    Started { job_id: String },
    /// The URL looks like a playlist; the client must confirm first
    PlaylistDetected { info: PlaylistInfo },
}

/// Everything a download task needs, cheap to clone into the task
#[derive(Clone)]
struct JobRunner {
    tracker: Arc<JobTracker>,
    engine: Arc<dyn MediaEngine>,
    download_dir: PathBuf,
    audio_format: String,
}

pub struct DownloadOrchestrator {
    runner: JobRunner,
    /// Handles of tasks that may still be running, pruned on submit
    tasks: DashMap<String, JoinHandle<()>>,
}

impl DownloadOrchestrator {
    pub fn new(
        tracker: Arc<JobTracker>,
        engine: Arc<dyn MediaEngine>,
        download_dir: PathBuf,
        audio_format: String,
    ) -> Self {
        Self {
            runner: JobRunner {
                tracker,
                engine,
                download_dir,
                audio_format,
            },
            tasks: DashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.runner.tracker
    }

    /// Accept a download request.
    ///
    /// Playlist-looking URLs are not started unless the caller asked for the
    /// whole playlist or confirmed; a probe result is returned instead.
    pub async fn submit(
        &self,
        url: &str,
        download_playlist: bool,
        confirmed: bool,
    ) -> Result<SubmitOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("URL is required".to_string()));
        }

        let playlist_url = is_playlist_url(url);
        if playlist_url && !download_playlist && !confirmed {
            tracing::info!(url, "playlist URL without confirmation, probing");
            let info = self.check_playlist(url).await;
            return Ok(SubmitOutcome::PlaylistDetected { info });
        }

        let mode = match (playlist_url, download_playlist) {
            (true, true) => PlaylistMode::Entire,
            (true, false) => PlaylistMode::Single,
            (false, _) => PlaylistMode::Auto,
        };

        let job_id = self.start(url.to_string(), mode);
        Ok(SubmitOutcome::Started { job_id })
    }

    /// Probe a URL for playlist metadata. Probe failures are reported in
    /// the returned info, never as an error.
    pub async fn check_playlist(&self, url: &str) -> PlaylistInfo {
        match self.runner.engine.probe_playlist(url).await {
            Ok(Some(summary)) => summary.into(),
            Ok(None) => PlaylistInfo::not_playlist(),
            Err(e) => {
                tracing::warn!(url, error = %e, "playlist probe failed");
                PlaylistInfo::probe_failed(e.to_string())
            }
        }
    }

    /// Create the job record, then spawn its task. The record exists before
    /// the task does, so a poll right after submit always finds it.
    fn start(&self, url: String, mode: PlaylistMode) -> String {
        let job_id = loop {
            let id = new_job_id();
            if self.runner.tracker.create(&id, Job::new()) {
                break id;
            }
        };
        tracing::info!(
            job_id = %job_id,
            url = %url,
            ?mode,
            engine = self.runner.engine.name(),
            "download accepted"
        );

        self.tasks.retain(|_, handle| !handle.is_finished());

        let runner = self.runner.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move { runner.supervise(id, url, mode).await });
        self.tasks.insert(job_id.clone(), handle);

        job_id
    }

    /// Wait for a job's task to finish. Returns immediately if the task is
    /// already done or the id is unknown.
    pub async fn wait(&self, job_id: &str) {
        let handle = self.tasks.remove(job_id).map(|(_, handle)| handle);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(job_id, error = %e, "download task did not complete");
            }
        }
    }

    /// Number of tasks that have not finished yet
    pub fn running_tasks(&self) -> usize {
        self.tasks.iter().filter(|r| !r.value().is_finished()).count()
    }
}

impl JobRunner {
    /// Run the job in its own task so a panic still ends in `error`
    async fn supervise(self, job_id: String, url: String, mode: PlaylistMode) {
        let tracker = Arc::clone(&self.tracker);
        let id = job_id.clone();
        let inner = tokio::spawn(async move { self.run(id, url, mode).await });

        if let Err(e) = inner.await {
            tracing::error!(job_id = %job_id, error = %e, "download task aborted");
            tracker.update(&job_id, |job| {
                job.fail();
                job.push_log(format!("Error: {}", e));
            });
        }
    }

    async fn run(self, job_id: String, url: String, mode: PlaylistMode) {
        self.tracker.update(&job_id, |job| {
            job.push_log("Starting download process...");
            match mode {
                PlaylistMode::Single => {
                    job.push_log("Extracting single video from playlist URL...");
                    job.push_log("Option: noplaylist (single video only)");
                }
                PlaylistMode::Entire => {
                    job.is_playlist = true;
                    job.push_log("Downloading entire playlist...");
                }
                PlaylistMode::Auto => {}
            }
            job.push_log("Connecting to video host...");
        });

        let (sink, mut events) = EventSink::channel();
        let request = DownloadRequest {
            url,
            playlist: mode,
            output_dir: self.download_dir.clone(),
        };

        let engine = Arc::clone(&self.engine);
        let download = async move { engine.download(request, sink).await };
        let consume = async {
            while let Some(event) = events.recv().await {
                self.apply(&job_id, event);
            }
        };
        let (result, ()) = tokio::join!(download, consume);

        self.finish(&job_id, result);
    }

    fn finish(&self, job_id: &str, result: std::result::Result<(), EngineError>) {
        match result {
            Ok(()) => {
                let mut completed = false;
                self.tracker.update(job_id, |job| {
                    completed = job.complete();
                    if completed {
                        job.push_log("Download completed successfully!");
                    }
                });
                if completed {
                    tracing::info!(job_id, "download completed");
                } else {
                    tracing::warn!(job_id, "engine exited cleanly after reporting an error");
                }
            }
            Err(e) => {
                tracing::warn!(job_id, error = %e, "download failed");
                self.tracker.update(job_id, |job| {
                    job.fail();
                    job.push_log(format!("Error: {}", e));
                });
            }
        }
    }

    fn apply(&self, job_id: &str, event: EngineEvent) {
        match event {
            EngineEvent::Progress(progress) => {
                self.tracker
                    .update(job_id, |job| apply_progress(job, &progress));
            }
            EngineEvent::Finished => {
                let message = format!(
                    "Download finished, now converting to {}...",
                    self.audio_format.to_uppercase()
                );
                self.tracker.update(job_id, |job| {
                    job.set_progress(FINISHED_MILESTONE);
                    job.push_log(message);
                });
            }
            EngineEvent::PostProcess { stage, name } => {
                let line = match stage {
                    PostProcessStage::Started => format!("Post-processing: {}...", name),
                    PostProcessStage::Finished => "Post-processing complete!".to_string(),
                };
                self.tracker.update(job_id, |job| job.push_log(line));
            }
            EngineEvent::Log { level, message } => {
                if level == LogLevel::Error {
                    tracing::debug!(job_id, %message, "engine reported an error");
                }
                self.tracker.update(job_id, |job| match level {
                    LogLevel::Info => job.push_log(message),
                    LogLevel::Warning => job.push_log(format!("WARNING: {}", message)),
                    LogLevel::Error => {
                        job.push_log(format!("ERROR: {}", message));
                        job.fail();
                    }
                });
            }
            EngineEvent::Output(path) => {
                let name = output_name(&self.download_dir, &path);
                self.tracker.update(job_id, |job| job.filename = Some(name));
            }
        }
    }
}

fn apply_progress(job: &mut Job, progress: &ProgressEvent) {
    if let Some(percent) = progress.percent() {
        job.set_progress(percent);
    }
    if let Some((current, total)) = progress.playlist_position() {
        job.set_playlist_position(current, total);
    }
}

/// File name relative to the download directory when possible
fn output_name(download_dir: &Path, path: &Path) -> String {
    path.strip_prefix(download_dir)
        .ok()
        .or_else(|| path.file_name().map(Path::new))
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
