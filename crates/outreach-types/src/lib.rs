//! # Outreach Types
//!
//! Core types, models, and error definitions for the Outreach scheduler.
//!
//! This crate provides the foundational type system:
//!
//! - **`error`** - Typed error hierarchy for pools, the work queue, and configuration
//! - **`models`** - Domain models (Resource, WorkItem, Config, Stats)
//!
//! ## Architecture Role
//!
//! `outreach-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                outreach-types (this crate)
//!                        │
//!                        ▼
//!                  outreach-core
//!                        │
//!                        ▼
//!                 outreach-server
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for API and storage
//! - **Clone** for cheap snapshots handed out of the pool/queue critical sections
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, PoolError, QueueError, Result, TypedError};

// Re-export core model types
pub use models::{
    AppConfig, ErrorAnalysis, ErrorCategory, LeaseState, NewWorkItem, PoolStats, ProxyProtocol,
    QueueStats, ReleaseOutcome, Resource, ResourceAddress, ResourceKind, ResourceStatus,
    UsageLogEntry, WorkItem, WorkItemState,
};
