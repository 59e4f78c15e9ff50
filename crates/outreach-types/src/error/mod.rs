//! Typed error definitions for Outreach.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants
//!
//! "No resource available" and "no work item eligible" are absent:
//! they are ordinary outcomes (`Option::None`), not errors.

mod config;
mod pool;
mod queue;

pub use config::ConfigError;
pub use pool::PoolError;
pub use queue::QueueError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a resource pool error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Wraps a work queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TypedError {
    /// True when the error indicates a broken internal invariant (a bug),
    /// as opposed to a rejected operator request.
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::Pool(PoolError::InvariantViolation { .. })
                | Self::Queue(QueueError::InvariantViolation { .. })
        )
    }
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = TypedError::Pool(PoolError::NotFound { id: "acc-123".to_string() });

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Pool"));
        assert!(json.contains("acc-123"));

        let deserialized: TypedError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_invariant_violation_detection() {
        let err = TypedError::Queue(QueueError::InvariantViolation {
            id: "item-1".to_string(),
            message: "double dispatch".to_string(),
        });
        assert!(err.is_invariant_violation());

        let err = TypedError::Queue(QueueError::InvalidPriority { priority: 11 });
        assert!(!err.is_invariant_violation());
    }
}
