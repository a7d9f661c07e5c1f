//! Unified error types for the LEXArchive mirror core.

use thiserror::Error;

/// Main error type for all archive operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ArchiveError {
    /// Local store operation failed (SQLite).
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote source answered with a non-success status.
    #[error("Remote error: TAP service returned status {0}")]
    Remote(u16),

    /// Remote response could not be parsed as delimited rows.
    #[error("Malformed remote response: {0}")]
    MalformedResponse(String),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

impl From<String> for ArchiveError {
    fn from(s: String) -> Self {
        ArchiveError::Unknown(s)
    }
}

impl From<&str> for ArchiveError {
    fn from(s: &str) -> Self {
        ArchiveError::Unknown(s.to_string())
    }
}
