//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Configuration file could not be read or written
    #[error("Config I/O error at {path}: {message}")]
    Io {
        /// Path of the configuration file
        path: String,
        /// Underlying failure
        message: String,
    },

    /// Configuration file is not valid JSON for `AppConfig`
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parser message
        message: String,
    },

    /// A value is outside its accepted range
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the offending field
        field: String,
        /// Why it was rejected
        message: String,
    },
}
