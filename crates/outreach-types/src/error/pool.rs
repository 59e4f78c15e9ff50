//! Resource pool errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during resource pool operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum PoolError {
    /// Resource with given ID not found
    #[error("Resource not found: {id}")]
    NotFound {
        /// Unique identifier of the missing resource
        id: String,
    },

    /// A resource with this ID is already registered
    #[error("Resource already exists: {id}")]
    AlreadyExists {
        /// Unique identifier of the duplicate resource
        id: String,
    },

    /// Operator requested a status change that has no defined edge
    #[error("Resource {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Unique identifier of the resource
        id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Resource is leased and cannot be removed right now
    #[error("Resource {id} is leased by an in-flight dispatch")]
    Leased {
        /// Unique identifier of the leased resource
        id: String,
    },

    /// Lease bookkeeping was violated (release of a free resource, etc.)
    #[error("Lease invariant violated for {id}: {message}")]
    InvariantViolation {
        /// Unique identifier of the resource
        id: String,
        /// What went wrong
        message: String,
    },

    /// Resource address could not be parsed
    #[error("Invalid resource address '{raw}': {message}")]
    InvalidAddress {
        /// Raw input
        raw: String,
        /// Parse failure details
        message: String,
    },
}
