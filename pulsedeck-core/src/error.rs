//! Error types for pulsedeck-core

use thiserror::Error;

/// Main error type for the pulsedeck-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Event store / fetch error
    #[error("event store error: {0}")]
    Fetch(String),

    /// Invalid date range
    #[error("invalid date range: {0}")]
    Range(String),
}

/// Result type alias for pulsedeck-core
pub type Result<T> = std::result::Result<T, Error>;
