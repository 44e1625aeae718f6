//! yt-dlp output parsing
//!
//! yt-dlp is run with `--newline` and custom progress templates so that
//! every progress report is a single machine-readable line. Everything else
//! it prints is turned into log events.

use std::path::PathBuf;

use super::{EngineEvent, LogLevel, PostProcessStage, ProgressEvent};

/// Marker of download progress lines
pub const PROGRESS_MARKER: &str = "[progress]";

/// Marker of post-processor progress lines
pub const POSTPROCESS_MARKER: &str = "[postprocess]";

/// `--progress-template` for download progress. Fields are `|` separated;
/// yt-dlp prints `NA` for missing values.
pub const PROGRESS_TEMPLATE: &str = "download:[progress]%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress._percent_str)s|%(info.playlist_index)s|%(info.playlist_count)s";

/// `--progress-template` for post-processor progress
pub const POSTPROCESS_TEMPLATE: &str =
    "postprocess:[postprocess]%(progress.status)s|%(progress.postprocessor)s";

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Translate one output line into engine events
pub fn parse_line(line: &str, stream: Stream) -> Vec<EngineEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(rest) = trimmed.strip_prefix(PROGRESS_MARKER) {
        return parse_progress(rest).into_iter().collect();
    }
    if let Some(rest) = trimmed.strip_prefix(POSTPROCESS_MARKER) {
        return parse_postprocess(rest).into_iter().collect();
    }

    match stream {
        Stream::Stderr => vec![classify_stderr(trimmed)],
        Stream::Stdout => {
            if trimmed.starts_with("[debug]") {
                return Vec::new();
            }
            let mut events = vec![EngineEvent::Log {
                level: LogLevel::Info,
                message: trimmed.to_string(),
            }];
            if let Some(path) = parse_audio_destination(trimmed) {
                events.push(EngineEvent::Output(path));
            }
            events
        }
    }
}

fn classify_stderr(line: &str) -> EngineEvent {
    let (level, message) = if let Some(msg) = line.strip_prefix("ERROR:") {
        (LogLevel::Error, msg.trim())
    } else if let Some(msg) = line.strip_prefix("WARNING:") {
        (LogLevel::Warning, msg.trim())
    } else {
        (LogLevel::Info, line)
    };
    EngineEvent::Log {
        level,
        message: message.to_string(),
    }
}

fn parse_progress(rest: &str) -> Option<EngineEvent> {
    let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
    if fields.len() < 7 {
        return None;
    }

    match fields[0] {
        "downloading" => Some(EngineEvent::Progress(ProgressEvent {
            downloaded_bytes: number(fields[1]),
            total_bytes: number(fields[2]),
            total_bytes_estimate: number(fields[3]),
            percent_str: text(fields[4]),
            playlist_index: number(fields[5]).map(|v| v as u32),
            playlist_count: number(fields[6]).map(|v| v as u32),
        })),
        "finished" => Some(EngineEvent::Finished),
        "error" => Some(EngineEvent::Log {
            level: LogLevel::Error,
            message: "Error during download".to_string(),
        }),
        _ => None,
    }
}

fn parse_postprocess(rest: &str) -> Option<EngineEvent> {
    let (status, name) = rest.split_once('|')?;
    let stage = match status.trim() {
        "started" => PostProcessStage::Started,
        "finished" => PostProcessStage::Finished,
        _ => return None,
    };
    let name = text(name).unwrap_or_else(|| "processing".to_string());
    Some(EngineEvent::PostProcess { stage, name })
}

/// The final audio file: `[ExtractAudio] Destination: <path>` after a
/// transcode, or `[ExtractAudio] Not converting audio <path>; file is already
/// in target format` when none was needed.
fn parse_audio_destination(line: &str) -> Option<PathBuf> {
    let rest = line.strip_prefix("[ExtractAudio]")?.trim_start();
    let path = if let Some(path) = rest.strip_prefix("Destination:") {
        path
    } else {
        let path = rest.strip_prefix("Not converting audio")?;
        path.rsplit_once("; file is already").map_or(path, |(path, _)| path)
    };
    let path = path.trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

fn number(field: &str) -> Option<f64> {
    if field == "NA" {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn text(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty() && field != "NA").then(|| field.to_string())
}
