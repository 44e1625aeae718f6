//! YouTube Audio Download Server
//!
//! A small HTTP back-end that accepts video URLs, runs yt-dlp in background
//! tasks to extract audio, exposes live job progress for polling, and
//! serves the finished files from a download directory.

#![allow(dead_code)]

mod config;
mod config_file;
mod download;
mod engine;
mod error;
mod http;
mod integration;
mod jobs;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::error::{AppError, Result};
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "ytaudio-server";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging, the log level lives in it
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let (config, config_error) = config_file::load_config(&config_path);

    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = config_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path.display(),
            e
        );
    }
    tracing::info!("Configuration loaded: {:?}", config);

    std::fs::create_dir_all(&config.download_dir)?;
    tracing::info!("Download directory: {}", config.download_dir.display());

    // Create application state
    let state = Arc::new(AppState::new(config.clone()));

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ytaudio_server={},tower_http=debug", config.log_level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
