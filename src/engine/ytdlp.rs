//! yt-dlp subprocess engine

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::output::{parse_line, Stream, POSTPROCESS_TEMPLATE, PROGRESS_TEMPLATE};
use super::{DownloadRequest, EventSink, MediaEngine, PlaylistMode, PlaylistSummary};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Engine backed by the `yt-dlp` command line tool
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: EngineConfig,
}

impl YtDlp {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Command line for a download
    pub fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".into(),
            self.config.format.clone(),
            "--extract-audio".into(),
            "--audio-format".into(),
            self.config.audio_format.clone(),
            "--audio-quality".into(),
            format!("{}K", self.config.audio_quality),
            "--newline".into(),
            "--no-colors".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--progress-template".into(),
            POSTPROCESS_TEMPLATE.into(),
            "-o".into(),
            output_template(&request.output_dir, request.playlist),
        ];

        match request.playlist {
            PlaylistMode::Single => args.push("--no-playlist".into()),
            PlaylistMode::Entire => args.push("--yes-playlist".into()),
            PlaylistMode::Auto => {}
        }

        // A URL starting with '-' must not be read as an option.
        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    /// Command line for a metadata-only playlist probe
    pub fn probe_args(url: &str) -> Vec<String> {
        vec![
            "--flat-playlist".into(),
            "--dump-single-json".into(),
            "--no-warnings".into(),
            "--".into(),
            url.to_string(),
        ]
    }
}

/// Output path template handed to yt-dlp
fn output_template(dir: &Path, mode: PlaylistMode) -> String {
    let path = match mode {
        PlaylistMode::Entire => dir.join("%(playlist_title)s").join("%(title)s.%(ext)s"),
        PlaylistMode::Single | PlaylistMode::Auto => dir.join("%(title)s.%(ext)s"),
    };
    path.to_string_lossy().into_owned()
}

/// Interpret `--dump-single-json` output
pub fn parse_probe_output(stdout: &[u8]) -> Result<Option<PlaylistSummary>, EngineError> {
    let info: Value =
        serde_json::from_slice(stdout).map_err(|e| EngineError::Probe(e.to_string()))?;

    if info.get("_type").and_then(Value::as_str) != Some("playlist") {
        return Ok(None);
    }

    let video_count = info
        .get("entries")
        .and_then(Value::as_array)
        .map(Vec::len)
        .or_else(|| {
            info.get("playlist_count")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
        })
        .unwrap_or(0);

    Ok(Some(PlaylistSummary {
        title: string_field(&info, &["title"]).unwrap_or_else(|| "Unknown Playlist".to_string()),
        video_count,
        uploader: string_field(&info, &["uploader", "channel"])
            .unwrap_or_else(|| "Unknown".to_string()),
    }))
}

fn string_field(info: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| info.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Last non-empty stderr line, which is where yt-dlp puts the reason
fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}

/// Feed every line of `reader` through the parser into `sink`.
/// Invalid UTF-8 (odd titles) is replaced rather than aborting the read.
async fn forward_lines<R>(reader: R, stream: Stream, sink: &EventSink) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        for event in parse_line(&line, stream) {
            sink.send(event);
        }
    }
}

#[async_trait]
impl MediaEngine for YtDlp {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe_playlist(&self, url: &str) -> Result<Option<PlaylistSummary>, EngineError> {
        let timeout = self.config.probe_timeout_secs;
        let run = Command::new(&self.config.binary)
            .args(Self::probe_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(Duration::from_secs(timeout), run)
            .await
            .map_err(|_| EngineError::Timeout(timeout))?
            .map_err(EngineError::Spawn)?;

        if !output.status.success() {
            return Err(EngineError::Probe(last_line(&output.stderr)));
        }
        parse_probe_output(&output.stdout)
    }

    async fn download(&self, request: DownloadRequest, sink: EventSink) -> Result<(), EngineError> {
        let args = self.download_args(&request);
        tracing::debug!(binary = %self.config.binary, ?args, "spawning yt-dlp");

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            EngineError::Io(std::io::Error::other("yt-dlp stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            EngineError::Io(std::io::Error::other("yt-dlp stderr not captured"))
        })?;

        let (out, err) = tokio::join!(
            forward_lines(stdout, Stream::Stdout, &sink),
            forward_lines(stderr, Stream::Stderr, &sink),
        );
        let status = child.wait().await?;
        out?;
        err?;

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Exited(status.to_string()))
        }
    }
}
