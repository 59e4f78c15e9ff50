//! Priority work queue with a retry schedule.
//!
//! Items are ordered by `(priority, not_before, id)`: lower priority values
//! first, then the longest-waiting item. Every state change goes through one
//! `parking_lot::Mutex`, and illegal transitions come back as
//! [`QueueError::InvariantViolation`] instead of being silently ignored.

mod backoff;
mod error_analysis;


pub use backoff::BackoffPolicy;
pub use error_analysis::categorize;

use chrono::{DateTime, Utc};
use outreach_types::models::QueueConfig;
use outreach_types::{
    ErrorAnalysis, NewWorkItem, QueueError, QueueStats, WorkItem, WorkItemState,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::AppResult;
use crate::storage::WorkItemStore;

const MIN_PRIORITY: u8 = 1;
const MAX_PRIORITY: u8 = 10;

fn violation(id: &str, message: impl Into<String>) -> QueueError {
    let message = message.into();
    tracing::error!(work_item_id = %id, "Work item invariant violated: {}", message);
    QueueError::InvariantViolation { id: id.to_string(), message }
}

pub struct WorkQueue {
    items: Mutex<BTreeMap<String, WorkItem>>,
    store: Arc<dyn WorkItemStore>,
    backoff: BackoffPolicy,
    max_attempts: u32,
}

impl WorkQueue {
    /// Build a queue backed by `store`, loading any persisted items.
    ///
    /// Items persisted as `in_flight` are left as-is; call
    /// [`recover_interrupted`](Self::recover_interrupted) once no dispatcher
    /// is running.
    pub fn new(store: Arc<dyn WorkItemStore>, config: &QueueConfig) -> AppResult<Self> {
        let items: BTreeMap<String, WorkItem> =
            store.load_work_items()?.into_iter().map(|item| (item.id.clone(), item)).collect();
        tracing::info!(count = items.len(), "Work queue loaded");

        Ok(Self {
            items: Mutex::new(items),
            store,
            backoff: BackoffPolicy::from_config(config),
            max_attempts: config.max_attempts,
        })
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    fn persist(&self, item: &WorkItem) {
        if let Err(e) = self.store.save_work_item(item) {
            tracing::warn!(work_item_id = %item.id, "Failed to persist work item: {}", e);
        }
    }

    fn validate(new_item: &NewWorkItem) -> Result<(), QueueError> {
        if new_item.target.trim().is_empty() {
            return Err(QueueError::EmptyTarget);
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&new_item.priority) {
            return Err(QueueError::InvalidPriority { priority: new_item.priority });
        }
        Ok(())
    }

    // ===== Producer surface =====

    /// Add a new `pending` item, eligible immediately. Returns its id.
    pub fn enqueue(&self, new_item: NewWorkItem) -> Result<String, QueueError> {
        self.enqueue_at(new_item, Utc::now())
    }

    pub fn enqueue_at(&self, new_item: NewWorkItem, now: DateTime<Utc>) -> Result<String, QueueError> {
        Self::validate(&new_item)?;

        let item = WorkItem {
            id: uuid::Uuid::new_v4().to_string(),
            target: new_item.target.trim().to_string(),
            kind: new_item.kind,
            priority: new_item.priority,
            state: WorkItemState::Pending,
            attempts: 0,
            max_attempts: new_item.max_attempts.unwrap_or(self.max_attempts).max(1),
            not_before: now,
            assigned_account_id: None,
            assigned_proxy_id: None,
            last_error: None,
            payload: new_item.payload,
            created_at: now,
            updated_at: now,
            result: None,
        };

        self.persist(&item);
        tracing::debug!(work_item_id = %item.id, target = %item.target, priority = item.priority, "Work item enqueued");
        let id = item.id.clone();
        self.items.lock().insert(id.clone(), item);
        Ok(id)
    }

    /// Enqueue each item independently; one rejection does not affect the others.
    pub fn enqueue_batch(&self, items: Vec<NewWorkItem>) -> Vec<Result<String, QueueError>> {
        let now = Utc::now();
        items.into_iter().map(|new_item| self.enqueue_at(new_item, now)).collect()
    }

    // ===== Dispatch protocol =====

    /// Most urgent dispatchable item whose `not_before` has passed.
    pub fn next_eligible(&self) -> Option<WorkItem> {
        self.next_eligible_at(Utc::now())
    }

    pub fn next_eligible_at(&self, now: DateTime<Utc>) -> Option<WorkItem> {
        self.items
            .lock()
            .values()
            .filter(|item| item.is_eligible(now))
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.not_before.cmp(&b.not_before))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
    }

    /// `pending | retry_scheduled -> in_flight`, consuming one attempt.
    pub fn mark_in_flight(
        &self,
        id: &str,
        account_id: &str,
        proxy_id: &str,
    ) -> Result<WorkItem, QueueError> {
        self.mark_in_flight_at(id, account_id, proxy_id, Utc::now())
    }

    pub fn mark_in_flight_at(
        &self,
        id: &str,
        account_id: &str,
        proxy_id: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkItem, QueueError> {
        let mut items = self.items.lock();
        let item = items.get_mut(id).ok_or_else(|| QueueError::NotFound { id: id.to_string() })?;

        if !item.is_eligible(now) {
            return Err(violation(
                id,
                format!("cannot dispatch item in state {} (not_before {})", item.state, item.not_before),
            ));
        }

        item.state = WorkItemState::InFlight;
        item.attempts += 1;
        item.assigned_account_id = Some(account_id.to_string());
        item.assigned_proxy_id = Some(proxy_id.to_string());
        item.updated_at = now;
        self.persist(item);
        Ok(item.clone())
    }

    /// `in_flight -> done`, storing the scraper's result.
    pub fn complete(&self, id: &str, result: Option<Value>) -> Result<WorkItem, QueueError> {
        let now = Utc::now();
        let mut items = self.items.lock();
        let item = items.get_mut(id).ok_or_else(|| QueueError::NotFound { id: id.to_string() })?;

        if item.state != WorkItemState::InFlight {
            return Err(violation(id, format!("cannot complete item in state {}", item.state)));
        }

        item.state = WorkItemState::Done;
        item.last_error = None;
        item.result = result;
        item.updated_at = now;
        self.persist(item);
        tracing::info!(work_item_id = %id, target = %item.target, attempts = item.attempts, "✓ Work item done");
        Ok(item.clone())
    }

    /// Record a failed attempt.
    ///
    /// Retryable failures with attempts left go to `retry_scheduled` after a
    /// backoff; everything else becomes terminally `failed`.
    pub fn fail(&self, id: &str, error: &str, retryable: bool) -> Result<WorkItem, QueueError> {
        self.fail_at(id, error, retryable, Utc::now())
    }

    pub fn fail_at(
        &self,
        id: &str,
        error: &str,
        retryable: bool,
        now: DateTime<Utc>,
    ) -> Result<WorkItem, QueueError> {
        let mut items = self.items.lock();
        let item = items.get_mut(id).ok_or_else(|| QueueError::NotFound { id: id.to_string() })?;

        if item.state != WorkItemState::InFlight {
            return Err(violation(id, format!("cannot fail item in state {}", item.state)));
        }

        item.last_error = Some(error.to_string());
        item.updated_at = now;

        if retryable && !item.attempts_exhausted() {
            let delay = self.backoff.delay(item.attempts);
            item.state = WorkItemState::RetryScheduled;
            item.not_before = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
            item.assigned_account_id = None;
            item.assigned_proxy_id = None;
            tracing::info!(
                work_item_id = %id,
                attempts = item.attempts,
                max_attempts = item.max_attempts,
                retry_at = %item.not_before,
                "Work item scheduled for retry: {}",
                error
            );
        } else {
            item.state = WorkItemState::Failed;
            tracing::warn!(
                work_item_id = %id,
                attempts = item.attempts,
                retryable,
                "✗ Work item failed permanently: {}",
                error
            );
        }

        self.persist(item);
        Ok(item.clone())
    }

    // ===== Operator surface =====

    /// Reset every `failed` item to `pending` with a fresh attempt budget.
    pub fn retry_failed(&self) -> usize {
        let now = Utc::now();
        let mut items = self.items.lock();
        let mut reset = 0;
        for item in items.values_mut().filter(|item| item.state == WorkItemState::Failed) {
            item.state = WorkItemState::Pending;
            item.attempts = 0;
            item.not_before = now;
            item.assigned_account_id = None;
            item.assigned_proxy_id = None;
            item.updated_at = now;
            self.persist(item);
            reset += 1;
        }
        if reset > 0 {
            tracing::info!(reset, "Failed work items requeued");
        }
        reset
    }

    /// Return items left `in_flight` by a previous process to the retry
    /// schedule, or to `failed` when their attempts are used up.
    pub fn recover_interrupted(&self) -> usize {
        let now = Utc::now();
        let mut items = self.items.lock();
        let mut recovered = 0;
        for item in items.values_mut().filter(|item| item.state == WorkItemState::InFlight) {
            item.last_error = Some("dispatch interrupted".to_string());
            item.assigned_account_id = None;
            item.assigned_proxy_id = None;
            item.updated_at = now;
            if item.attempts_exhausted() {
                item.state = WorkItemState::Failed;
            } else {
                item.state = WorkItemState::RetryScheduled;
                item.not_before = now;
            }
            self.persist(item);
            recovered += 1;
        }
        if recovered > 0 {
            tracing::warn!(recovered, "Recovered interrupted work items");
        }
        recovered
    }

    /// Remove an item. In-flight items cannot be deleted.
    pub fn delete(&self, id: &str) -> Result<WorkItem, QueueError> {
        let mut items = self.items.lock();
        let item = items.get(id).ok_or_else(|| QueueError::NotFound { id: id.to_string() })?;
        if item.state == WorkItemState::InFlight {
            return Err(QueueError::InFlight { id: id.to_string() });
        }
        let removed = items.remove(id).ok_or_else(|| QueueError::NotFound { id: id.to_string() })?;
        if let Err(e) = self.store.delete_work_item(id) {
            tracing::warn!(work_item_id = %id, "Failed to delete work item from store: {}", e);
        }
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<WorkItem> {
        self.items.lock().get(id).cloned()
    }

    /// Items in dispatch order, optionally restricted to one state.
    pub fn list(&self, state: Option<WorkItemState>) -> Vec<WorkItem> {
        let mut items: Vec<WorkItem> = self
            .items
            .lock()
            .values()
            .filter(|item| state.map_or(true, |s| item.state == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.not_before.cmp(&b.not_before))
                .then_with(|| a.id.cmp(&b.id))
        });
        items
    }

    pub fn in_flight_count(&self) -> usize {
        self.items.lock().values().filter(|item| item.state == WorkItemState::InFlight).count()
    }

    pub fn stats(&self) -> QueueStats {
        let items = self.items.lock();
        let mut stats = QueueStats { total: items.len(), ..QueueStats::default() };
        for item in items.values() {
            match item.state {
                WorkItemState::Pending => stats.pending += 1,
                WorkItemState::InFlight => stats.in_flight += 1,
                WorkItemState::RetryScheduled => stats.retry_scheduled += 1,
                WorkItemState::Done => stats.done += 1,
                WorkItemState::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Categorized summary of terminally failed items.
    pub fn error_analysis(&self) -> ErrorAnalysis {
        let items = self.items.lock();
        error_analysis::analyze(items.values().filter(|item| item.state == WorkItemState::Failed))
    }
}
