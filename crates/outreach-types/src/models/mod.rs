//! Core domain models for Outreach.
//!
//! This module contains all shared data structures used across the workspace.

mod config;
mod resource;
mod stats;
mod work_item;

// Re-export all models
pub use config::{
    AlertConfig, AppConfig, DispatcherConfig, HealthConfig, PoolLimits, QueueConfig,
    RateLimitConfig, ScraperConfig,
};
pub use resource::{
    LeaseState, ProxyProtocol, ReleaseOutcome, Resource, ResourceAddress, ResourceKind,
    ResourceStatus, UsageLogEntry,
};
pub use stats::{ErrorAnalysis, ErrorCategory, PoolStats, QueueStats};
pub use work_item::{NewWorkItem, WorkItem, WorkItemState, DEFAULT_MAX_ATTEMPTS, DEFAULT_PRIORITY};
