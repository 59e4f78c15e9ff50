//! Aggregate statistics for pools and the work queue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ResourceKind;

/// Snapshot of one resource pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub kind: ResourceKind,
    pub total: usize,
    pub active: usize,
    pub cooldown: usize,
    pub suspended: usize,
    pub disabled: usize,
    pub leased: usize,
    /// Mean success rate over all resources, 0 for an empty pool
    pub avg_success_rate: f64,
    pub daily_limit: u32,
}

/// Snapshot of the work queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub retry_scheduled: usize,
    pub done: usize,
    pub failed: usize,
}

/// Coarse classification of failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Auth,
    Blocked,
    Network,
    RateLimit,
    InvalidInput,
    Unknown,
}

/// Operator-facing aggregation of failed work items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub total_errors: usize,
    pub error_types: BTreeMap<ErrorCategory, usize>,
    pub recommendations: Vec<String>,
}
