use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Download not found: {0}")]
    JobNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while driving the external extraction engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start engine: {0}")]
    Spawn(std::io::Error),

    #[error("Engine exited with {0}")]
    Exited(String),

    #[error("Engine did not answer within {0}s")]
    Timeout(u64),

    #[error("Metadata probe failed: {0}")]
    Probe(String),

    #[error("Engine IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
