//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{EngineConfig, ServerConfig};
use crate::error::{AppError, Result};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Storage settings
    pub storage: Option<StorageSettings>,
    /// Engine settings
    pub engine: Option<EngineSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for finished downloads
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub binary: Option<String>,
    pub format: Option<String>,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
    pub probe_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                cors_enabled: Some(defaults.cors_enabled),
            },
            storage: Some(StorageSettings {
                download_dir: defaults.download_dir,
            }),
            engine: Some(EngineSettings {
                binary: Some(defaults.engine.binary),
                format: Some(defaults.engine.format),
                audio_format: Some(defaults.engine.audio_format),
                audio_quality: Some(defaults.engine.audio_quality),
                probe_timeout_secs: Some(defaults.engine.probe_timeout_secs),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some(defaults.log_format),
            }),
        }
    }

    /// Convert to ServerConfig, filling gaps with defaults
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let engine_defaults = EngineConfig::default();

        let engine = match self.engine {
            Some(e) => EngineConfig {
                binary: e.binary.unwrap_or(engine_defaults.binary),
                format: e.format.unwrap_or(engine_defaults.format),
                audio_format: e.audio_format.unwrap_or(engine_defaults.audio_format),
                audio_quality: e.audio_quality.unwrap_or(engine_defaults.audio_quality),
                probe_timeout_secs: e
                    .probe_timeout_secs
                    .unwrap_or(engine_defaults.probe_timeout_secs),
            },
            None => engine_defaults,
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            download_dir: self
                .storage
                .map(|s| s.download_dir)
                .unwrap_or(defaults.download_dir),
            cors_enabled: self.server.cors_enabled.unwrap_or(defaults.cors_enabled),
            log_level,
            log_format,
            engine,
        }
    }
}

/// Load the server configuration from `path`.
///
/// A missing file yields the defaults. A file that fails to parse is
/// reported back alongside the defaults so the caller can log it once
/// logging is up.
pub fn load_config(path: &Path) -> (ServerConfig, Option<AppError>) {
    if !path.exists() {
        return (ServerConfig::default(), None);
    }
    match ConfigFile::from_file(path) {
        Ok(cf) => (cf.into_server_config(), None),
        Err(e) => (ServerConfig::default(), Some(e)),
    }
}
