//! Unified error types for Outreach Core.

use outreach_types::{ConfigError, PoolError, QueueError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for all Outreach core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Database operation failed (SQLite).
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource pool operation rejected or invariant violated.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Work queue operation rejected or invariant violated.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Storage back-end returned something unusable.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// True when the error reports a broken scheduling invariant.
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::Pool(PoolError::InvariantViolation { .. })
                | Self::Queue(QueueError::InvariantViolation { .. })
        )
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for Outreach operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Unknown(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Unknown(s.to_string())
    }
}
