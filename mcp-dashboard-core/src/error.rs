//! Error types for mcp-dashboard-core

use thiserror::Error;

/// Main error type for the mcp-dashboard-core library
///
/// Unparsable log lines are never errors; they yield partial or absent events.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem notification error
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type alias for mcp-dashboard-core
pub type Result<T> = std::result::Result<T, Error>;
