//! HTTP request handlers
//!
//! JSON endpoints for submitting downloads, probing playlists and polling
//! job status.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::download::{PlaylistInfo, SubmitOutcome};
use crate::error::AppError;
use crate::jobs::Job;
use crate::state::AppState;

/// HTTP error type, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => HttpError::BadRequest(msg),
            AppError::JobNotFound(_) => HttpError::NotFound("Download not found".to_string()),
            AppError::FileNotFound(_) => HttpError::NotFound("File not found".to_string()),
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

/// Body of `POST /download`
#[derive(Debug, Deserialize)]
pub struct DownloadRequestBody {
    pub url: Option<String>,
    pub download_playlist: Option<bool>,
    pub confirmed: Option<bool>,
}

/// Body of `POST /check-playlist`
#[derive(Debug, Deserialize)]
pub struct CheckPlaylistBody {
    pub url: Option<String>,
}

/// Response of `POST /download`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DownloadResponse {
    Started {
        download_id: String,
    },
    PlaylistDetected {
        playlist_detected: bool,
        playlist_info: PlaylistInfo,
    },
}

impl From<SubmitOutcome> for DownloadResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Started { job_id } => DownloadResponse::Started {
                download_id: job_id,
            },
            SubmitOutcome::PlaylistDetected { info } => DownloadResponse::PlaylistDetected {
                playlist_detected: true,
                playlist_info: info,
            },
        }
    }
}

fn required_url(url: Option<String>) -> Result<String, HttpError> {
    url.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest("URL is required".to_string()))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("ytaudio-server v", env!("CARGO_PKG_VERSION"))
}

/// Submit a download
/// POST /download
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DownloadRequestBody>, JsonRejection>,
) -> Result<Json<DownloadResponse>, HttpError> {
    let Json(body) = body?;
    let url = required_url(body.url)?;
    let download_playlist = body.download_playlist.unwrap_or(false);
    let confirmed = body.confirmed.unwrap_or(false);

    tracing::debug!(%url, download_playlist, confirmed, "download request");

    let outcome = state
        .downloads
        .submit(&url, download_playlist, confirmed)
        .await?;
    Ok(Json(outcome.into()))
}

/// Probe a URL for playlist metadata
/// POST /check-playlist
pub async fn check_playlist(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CheckPlaylistBody>, JsonRejection>,
) -> Result<Json<PlaylistInfo>, HttpError> {
    let Json(body) = body?;
    let url = required_url(body.url)?;
    Ok(Json(state.downloads.check_playlist(url.trim()).await))
}

/// Poll a job
/// GET /status/{download_id}
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<String>,
) -> Result<Json<Job>, HttpError> {
    let job = state.jobs.get(&download_id).map_err(|e| {
        tracing::debug!(%download_id, "status requested for unknown job");
        HttpError::from(e)
    })?;
    Ok(Json(job))
}

/// Debug endpoint - job statistics
pub async fn job_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "count": state.jobs.len(),
        "by_status": state.jobs.summary(),
        "running_tasks": state.downloads.running_tasks(),
    }))
}
