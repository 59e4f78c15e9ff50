//! Work item model: one unit of scheduled scraping work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Attempt budget when the caller does not specify one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Middle of the 1..=10 priority range.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Work item state machine.
///
/// ```text
/// pending ──dispatch──> in_flight ──success──> done
///    ^                      │
///    │                   failure(retryable, attempts<max)
///    │                      ▼
///    └───── elapsed ── retry_scheduled
/// in_flight ──failure(not retryable, or attempts==max)──> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemState {
    Pending,
    InFlight,
    Done,
    Failed,
    RetryScheduled,
}

impl WorkItemState {
    /// `done` and `failed` accept no further transitions (except operator retry).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// States `next_eligible()` may pick from.
    pub const fn is_dispatchable(self) -> bool {
        matches!(self, Self::Pending | Self::RetryScheduled)
    }
}

impl fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
            Self::RetryScheduled => write!(f, "retry_scheduled"),
        }
    }
}

/// A scheduled scrape request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier
    pub id: String,
    /// Target key, e.g. a channel identifier
    pub target: String,
    /// Operation tag, e.g. `channel_about`
    pub kind: String,
    /// 1 (most urgent) ..= 10
    pub priority: u8,
    pub state: WorkItemState,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Not dispatchable before this instant
    pub not_before: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_proxy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Operation-specific parameters
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Result data returned by the scraper on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl WorkItem {
    /// Whether `next_eligible()` may return this item at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.state.is_dispatchable() && now >= self.not_before
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Caller-supplied description of work to enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub target: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Overrides the queue's configured attempt budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl NewWorkItem {
    pub fn new(target: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: kind.into(),
            priority: DEFAULT_PRIORITY,
            payload: Map::new(),
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

fn default_kind() -> String {
    "channel_about".to_string()
}

const fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}
