//! Work queue errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during work queue operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum QueueError {
    /// Work item with given ID not found
    #[error("Work item not found: {id}")]
    NotFound {
        /// Unique identifier of the missing item
        id: String,
    },

    /// Priority outside 1..=10
    #[error("Invalid priority {priority}: must be between 1 and 10")]
    InvalidPriority {
        /// Rejected priority value
        priority: u8,
    },

    /// Target key was empty
    #[error("Work item target must not be empty")]
    EmptyTarget,

    /// Item is in flight and cannot be deleted
    #[error("Work item {id} is in flight")]
    InFlight {
        /// Unique identifier of the in-flight item
        id: String,
    },

    /// State machine violated: double dispatch, mutation of a terminal item, ...
    #[error("Work item invariant violated for {id}: {message}")]
    InvariantViolation {
        /// Unique identifier of the item
        id: String,
        /// What went wrong
        message: String,
    },
}
