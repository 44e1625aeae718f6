//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// External extraction engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path or name of the yt-dlp executable
    pub binary: String,

    /// Format selector handed to the engine
    pub format: String,

    /// Target audio codec for the transcoding step
    pub audio_format: String,

    /// Target audio quality in kbps
    pub audio_quality: String,

    /// Upper bound for metadata-only playlist probes in seconds
    pub probe_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            audio_format: "mp3".to_string(),
            audio_quality: "192".to_string(),
            probe_timeout_secs: 60,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory where finished audio files are written
    pub download_dir: PathBuf,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Engine configuration
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            download_dir: PathBuf::from("downloads"),
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
