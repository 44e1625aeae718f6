//! Finished file handlers
//!
//! The download directory is the only catalog of finished files: listing
//! reads it directly and downloads are served from it by name.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::io::ReaderStream;

use super::handlers::HttpError;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// One finished file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedFile {
    pub name: String,
    pub size: u64,
    /// Local time, ISO-8601
    pub modified: String,
}

/// Regular files directly inside `dir`, newest first.
/// A missing directory is an empty listing.
pub async fn scan_download_dir(dir: &FsPath) -> Result<Vec<DownloadedFile>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<(SystemTime, DownloadedFile)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        // Follows symlinks; a file vanishing mid-scan is skipped.
        let Ok(meta) = tokio::fs::metadata(entry.path()).await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
        files.push((
            modified,
            DownloadedFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                modified: iso_timestamp(modified),
            },
        ));
    }

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    Ok(files.into_iter().map(|(_, file)| file).collect())
}

fn iso_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// A bare file name: no directories, no parent references
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\', '\0'][..])
}

fn content_type(name: &str) -> &'static str {
    let ext = FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("opus") | Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

/// List finished files
/// GET /downloads
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<Vec<DownloadedFile>>, HttpError> {
    let files = scan_download_dir(&state.config.download_dir).await?;
    Ok(Json(files))
}

/// Stream a finished file as an attachment
/// GET /download_file/{filename}
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> std::result::Result<Response, HttpError> {
    if !is_plain_file_name(&filename) {
        return Err(AppError::FileNotFound(filename).into());
    }

    let path = state.config.download_dir.join(&filename);
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta,
        _ => return Err(AppError::FileNotFound(filename).into()),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::FileNotFound(filename).into())
        }
        Err(e) => return Err(AppError::Io(e).into()),
    };
    tracing::debug!(file = %filename, bytes = meta.len(), "serving file");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(&filename)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.len()));
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| HttpError::InternalError(e.to_string()))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}
