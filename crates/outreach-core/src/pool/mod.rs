//! Resource pool: one kind of leasable resource (accounts or proxies).
//!
//! All mutation happens inside a single `parking_lot::Mutex` critical section,
//! so eligibility check and lease are one indivisible step. Callers never see
//! `&mut Resource`; they get cloned snapshots and a [`ResourceLease`] guard.
//!
//! Counters roll over lazily: the first access to a resource on a new UTC day
//! zeroes its daily count, and an elapsed cooldown flips back to `active` on
//! the next access. No timer is required for either.

mod address;
mod lease;


pub use address::parse_proxy_address;
pub use lease::ResourceLease;

use chrono::{DateTime, Duration, Utc};
use outreach_types::models::PoolLimits;
use outreach_types::{
    LeaseState, PoolError, PoolStats, ReleaseOutcome, Resource, ResourceKind, ResourceStatus,
    UsageLogEntry,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use crate::alert::Alerter;
use crate::error::AppResult;
use crate::storage::ResourceStore;

/// Usage history kept per resource.
const USAGE_LOG_CAPACITY: usize = 200;

/// Upper bound of the EMA weight; later samples get `1/total`.
const MAX_SAMPLE_WEIGHT: f64 = 0.1;

/// Pool of resources of one kind. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ResourcePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    kind: ResourceKind,
    limits: PoolLimits,
    state: Mutex<PoolState>,
    store: Arc<dyn ResourceStore>,
    alerter: Arc<dyn Alerter>,
}

#[derive(Default)]
struct PoolState {
    // BTreeMap keeps id order, which is the final tie-break for selection.
    resources: BTreeMap<String, Resource>,
    usage_logs: HashMap<String, VecDeque<UsageLogEntry>>,
}

/// EMA update of the success rate. `total` is the use count including this
/// sample; the weight is `min(0.1, 1/total)`.
pub(crate) fn next_success_rate(old: f64, total: u64, success: bool) -> f64 {
    let weight = if total == 0 { MAX_SAMPLE_WEIGHT } else { (1.0 / total as f64).min(MAX_SAMPLE_WEIGHT) };
    let sample = if success { 100.0 } else { 0.0 };
    (old * (1.0 - weight) + sample * weight).clamp(0.0, 100.0)
}

impl ResourcePool {
    /// Build a pool and load its resources from `store`.
    ///
    /// Resources persisted as leased belong to dispatches that died with the
    /// previous process; they come back free.
    pub fn new(
        kind: ResourceKind,
        limits: PoolLimits,
        store: Arc<dyn ResourceStore>,
        alerter: Arc<dyn Alerter>,
    ) -> AppResult<Self> {
        let mut state = PoolState::default();
        for mut resource in store.load_resources(kind)? {
            if resource.is_leased() {
                resource.lease_state = LeaseState::Free;
                tracing::info!(resource_id = %resource.id, "Recovered stale lease from previous run");
                if let Err(e) = store.save_resource(&resource) {
                    tracing::warn!(resource_id = %resource.id, "Failed to persist recovered lease: {}", e);
                }
            }
            state.resources.insert(resource.id.clone(), resource);
        }

        tracing::info!(%kind, count = state.resources.len(), daily_limit = limits.daily_limit, "Resource pool loaded");

        Ok(Self {
            inner: Arc::new(PoolInner { kind, limits, state: Mutex::new(state), store, alerter }),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.kind
    }

    pub fn daily_limit(&self) -> u32 {
        self.inner.limits.daily_limit
    }

    pub fn cooldown_duration(&self) -> Duration {
        let minutes = i64::try_from(self.inner.limits.cooldown_minutes).unwrap_or(i64::MAX);
        Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
    }

    fn persist(&self, resource: &Resource) {
        if let Err(e) = self.inner.store.save_resource(resource) {
            tracing::warn!(resource_id = %resource.id, "Failed to persist resource: {}", e);
        }
    }

    /// Apply lazy daily rollover and cooldown expiry to one resource.
    /// Returns true if anything changed.
    fn refresh(resource: &mut Resource, now: DateTime<Utc>) -> bool {
        let rolled = resource.counters_day != Some(now.date_naive());
        resource.roll_daily_counter(now.date_naive());
        let expired = resource.expire_cooldown(now);
        if expired {
            tracing::info!(resource_id = %resource.id, "Cooldown elapsed, resource active again");
        }
        rolled || expired
    }

    fn refresh_all(&self, state: &mut PoolState, now: DateTime<Utc>) {
        for resource in state.resources.values_mut() {
            if Self::refresh(resource, now) {
                self.persist(resource);
            }
        }
    }

    // ===== Operator surface =====

    /// Register a new resource. Its address must match the pool kind.
    pub fn add(&self, resource: Resource) -> Result<Resource, PoolError> {
        if resource.kind() != self.inner.kind {
            return Err(PoolError::InvalidAddress {
                raw: resource.address.to_string(),
                message: format!("expected a {} address", self.inner.kind),
            });
        }

        let mut state = self.inner.state.lock();
        if state.resources.contains_key(&resource.id) {
            return Err(PoolError::AlreadyExists { id: resource.id });
        }

        let mut resource = resource;
        resource.lease_state = LeaseState::Free;
        self.persist(&resource);
        tracing::info!(resource_id = %resource.id, address = %resource.address, "Resource added");
        state.resources.insert(resource.id.clone(), resource.clone());
        Ok(resource)
    }

    /// Remove a resource. Leased resources cannot be removed.
    pub fn remove(&self, id: &str) -> Result<Resource, PoolError> {
        let mut state = self.inner.state.lock();
        let resource =
            state.resources.get(id).ok_or_else(|| PoolError::NotFound { id: id.to_string() })?;
        if resource.is_leased() {
            return Err(PoolError::Leased { id: id.to_string() });
        }

        let removed = state.resources.remove(id).ok_or_else(|| PoolError::NotFound { id: id.to_string() })?;
        state.usage_logs.remove(id);
        if let Err(e) = self.inner.store.delete_resource(id) {
            tracing::warn!(resource_id = %id, "Failed to delete resource from store: {}", e);
        }
        tracing::info!(resource_id = %id, "Resource removed");
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<Resource> {
        let now = Utc::now();
        let mut state = self.inner.state.lock();
        let resource = state.resources.get_mut(id)?;
        if Self::refresh(resource, now) {
            self.persist(resource);
        }
        Some(resource.clone())
    }

    /// All resources, ordered by id.
    pub fn list(&self) -> Vec<Resource> {
        self.list_at(Utc::now())
    }

    pub fn list_at(&self, now: DateTime<Utc>) -> Vec<Resource> {
        let mut state = self.inner.state.lock();
        self.refresh_all(&mut state, now);
        state.resources.values().cloned().collect()
    }

    /// Number of resources `acquire()` could hand out right now.
    pub fn available_count(&self) -> usize {
        let now = Utc::now();
        let limit = self.inner.limits.daily_limit;
        let mut state = self.inner.state.lock();
        self.refresh_all(&mut state, now);
        state.resources.values().filter(|r| r.is_eligible(now, limit)).count()
    }

    // ===== Lease protocol =====

    /// Lease the least-recently-used eligible resource.
    ///
    /// Returns `None` when nothing qualifies; that is a normal condition.
    pub fn acquire(&self) -> Option<ResourceLease> {
        self.acquire_at(Utc::now())
    }

    pub fn acquire_at(&self, now: DateTime<Utc>) -> Option<ResourceLease> {
        self.acquire_where_at(now, |_| true)
    }

    /// Like [`acquire_at`](Self::acquire_at), but only resources accepted by
    /// `accept` are candidates. `accept` runs under the pool lock and must not
    /// call back into this pool.
    pub fn acquire_where_at<F>(&self, now: DateTime<Utc>, accept: F) -> Option<ResourceLease>
    where
        F: Fn(&Resource) -> bool,
    {
        let limit = self.inner.limits.daily_limit;
        let mut state = self.inner.state.lock();
        self.refresh_all(&mut state, now);

        // Option<DateTime> orders None first: never-used resources win.
        let chosen_id = state
            .resources
            .values()
            .filter(|r| r.is_eligible(now, limit) && accept(r))
            .min_by(|a, b| a.last_used_at.cmp(&b.last_used_at).then_with(|| a.id.cmp(&b.id)))
            .map(|r| r.id.clone());

        let Some(id) = chosen_id else {
            tracing::debug!(kind = %self.inner.kind, "No eligible resource to lease");
            return None;
        };

        let resource = state.resources.get_mut(&id)?;
        resource.lease_state = LeaseState::Leased;
        self.persist(resource);
        let snapshot = resource.clone();
        drop(state);

        tracing::debug!(resource_id = %snapshot.id, kind = %self.inner.kind, "Resource leased");
        Some(ResourceLease::new(self.clone(), snapshot))
    }

    /// End a lease and fold the outcome into the resource's counters and status.
    ///
    /// Releasing a resource that is not leased is an invariant violation.
    pub fn release(&self, id: &str, outcome: ReleaseOutcome) -> Result<Resource, PoolError> {
        self.release_at(id, outcome, Utc::now())
    }

    pub fn release_at(
        &self,
        id: &str,
        outcome: ReleaseOutcome,
        now: DateTime<Utc>,
    ) -> Result<Resource, PoolError> {
        let cooldown = self.cooldown_duration();
        let mut state = self.inner.state.lock();
        let resource =
            state.resources.get_mut(id).ok_or_else(|| PoolError::NotFound { id: id.to_string() })?;

        if !resource.is_leased() {
            tracing::error!(resource_id = %id, outcome = outcome.label(), "Release of a resource that is not leased");
            return Err(PoolError::InvariantViolation {
                id: id.to_string(),
                message: "release called on a free resource".to_string(),
            });
        }

        resource.lease_state = LeaseState::Free;
        let mut alert = None;

        if outcome.is_usage() {
            Self::refresh(resource, now);
            let success = outcome == ReleaseOutcome::Success;
            resource.daily_request_count = resource.daily_request_count.saturating_add(1);
            resource.total_request_count = resource.total_request_count.saturating_add(1);
            resource.success_rate =
                next_success_rate(resource.success_rate, resource.total_request_count, success);
            resource.last_used_at = Some(now);
            if let Some(reason) = outcome.error() {
                resource.last_error = Some(reason.to_string());
            }
        }

        match &outcome {
            ReleaseOutcome::RateLimited(reason) => {
                if resource.status == ResourceStatus::Active {
                    let until = now.checked_add_signed(cooldown).unwrap_or(DateTime::<Utc>::MAX_UTC);
                    resource.status = ResourceStatus::Cooldown;
                    resource.cooldown_until = Some(until);
                    tracing::warn!(resource_id = %id, %until, "Resource rate limited, cooling down: {}", reason);
                }
            },
            ReleaseOutcome::Banned(reason) => {
                if resource.status != ResourceStatus::Disabled {
                    resource.status = ResourceStatus::Disabled;
                    resource.cooldown_until = None;
                    tracing::warn!(resource_id = %id, "⛔ Resource disabled after ban signal: {}", reason);
                    alert = Some(format!(
                        "{} {} ({}) permanently disabled: {}",
                        self.inner.kind, id, resource.address, reason
                    ));
                }
            },
            ReleaseOutcome::NoOp | ReleaseOutcome::Success | ReleaseOutcome::Transient(_) => {},
        }

        self.persist(resource);
        let snapshot = resource.clone();

        if outcome.is_usage() {
            let log = state.usage_logs.entry(id.to_string()).or_default();
            if log.len() >= USAGE_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(UsageLogEntry {
                resource_id: id.to_string(),
                action_type: outcome.label().to_string(),
                success: outcome == ReleaseOutcome::Success,
                error: outcome.error().map(str::to_string),
                timestamp: now,
            });
        }
        drop(state);

        if let Some(message) = alert {
            self.inner.alerter.notify(&message);
        }

        Ok(snapshot)
    }

    /// Zero daily counters of every resource whose counters belong to an
    /// earlier UTC day. Returns how many non-zero counters were cleared.
    pub fn reset_daily_counters(&self) -> usize {
        self.reset_daily_counters_at(Utc::now())
    }

    pub fn reset_daily_counters_at(&self, now: DateTime<Utc>) -> usize {
        let today = now.date_naive();
        let mut state = self.inner.state.lock();
        let mut cleared = 0;
        for resource in state.resources.values_mut() {
            if resource.counters_day == Some(today) {
                continue;
            }
            if resource.roll_daily_counter(today) {
                cleared += 1;
            }
            self.persist(resource);
        }
        if cleared > 0 {
            tracing::info!(kind = %self.inner.kind, cleared, "Daily counters reset");
        }
        cleared
    }

    /// Operator-applied cooldown. Returns the new `cooldown_until`.
    pub fn cooldown(&self, id: &str, duration: Duration) -> Result<DateTime<Utc>, PoolError> {
        let now = Utc::now();
        let mut state = self.inner.state.lock();
        let resource =
            state.resources.get_mut(id).ok_or_else(|| PoolError::NotFound { id: id.to_string() })?;

        if !matches!(resource.status, ResourceStatus::Active | ResourceStatus::Cooldown) {
            return Err(PoolError::InvalidTransition {
                id: id.to_string(),
                from: resource.status.to_string(),
                to: ResourceStatus::Cooldown.to_string(),
            });
        }

        let until = now.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC);
        resource.status = ResourceStatus::Cooldown;
        resource.cooldown_until = Some(until);
        self.persist(resource);
        tracing::info!(resource_id = %id, %until, "Manual cooldown applied");
        Ok(until)
    }

    /// Return a suspended or cooling-down resource to `active`.
    /// Disabled resources stay disabled.
    pub fn restore(&self, id: &str) -> Result<Resource, PoolError> {
        let mut state = self.inner.state.lock();
        let resource =
            state.resources.get_mut(id).ok_or_else(|| PoolError::NotFound { id: id.to_string() })?;

        match resource.status {
            ResourceStatus::Active => {},
            ResourceStatus::Suspended | ResourceStatus::Cooldown => {
                tracing::info!(resource_id = %id, from = %resource.status, "Resource restored to active");
                resource.status = ResourceStatus::Active;
                resource.cooldown_until = None;
                self.persist(resource);
            },
            ResourceStatus::Disabled => {
                return Err(PoolError::InvalidTransition {
                    id: id.to_string(),
                    from: ResourceStatus::Disabled.to_string(),
                    to: ResourceStatus::Active.to_string(),
                });
            },
        }
        Ok(resource.clone())
    }

    /// Operator status change. Allowed edges: `active -> suspended`,
    /// `* -> disabled`, and back to `active` as in [`restore`](Self::restore).
    /// Nothing leaves `disabled`; cooldowns go through [`cooldown`](Self::cooldown).
    pub fn set_status(&self, id: &str, target: ResourceStatus) -> Result<Resource, PoolError> {
        if target == ResourceStatus::Active {
            return self.restore(id);
        }

        let mut state = self.inner.state.lock();
        let resource =
            state.resources.get_mut(id).ok_or_else(|| PoolError::NotFound { id: id.to_string() })?;
        let from = resource.status;

        let allowed = match target {
            ResourceStatus::Disabled => true,
            ResourceStatus::Suspended => {
                matches!(from, ResourceStatus::Active | ResourceStatus::Suspended)
            },
            ResourceStatus::Active | ResourceStatus::Cooldown => false,
        };
        if !allowed {
            return Err(PoolError::InvalidTransition {
                id: id.to_string(),
                from: from.to_string(),
                to: target.to_string(),
            });
        }

        if from != target {
            resource.status = target;
            resource.cooldown_until = None;
            self.persist(resource);
            tracing::warn!(resource_id = %id, %from, to = %target, "Resource status changed by operator");
        }
        Ok(resource.clone())
    }

    /// Move every `active` resource matching `predicate` to `suspended`,
    /// atomically with respect to other pool operations. Returns the ids.
    pub fn suspend_matching<F>(&self, predicate: F, reason: &str) -> Vec<String>
    where
        F: Fn(&Resource) -> bool,
    {
        let mut state = self.inner.state.lock();
        let mut suspended = Vec::new();
        for resource in state.resources.values_mut() {
            if resource.status == ResourceStatus::Active && predicate(resource) {
                resource.status = ResourceStatus::Suspended;
                resource.last_error = Some(reason.to_string());
                self.persist(resource);
                tracing::warn!(
                    resource_id = %resource.id,
                    success_rate = resource.success_rate,
                    "Resource suspended: {}",
                    reason
                );
                suspended.push(resource.id.clone());
            }
        }
        suspended
    }

    pub fn usage_logs(&self, id: &str) -> Result<Vec<UsageLogEntry>, PoolError> {
        let state = self.inner.state.lock();
        if !state.resources.contains_key(id) {
            return Err(PoolError::NotFound { id: id.to_string() });
        }
        Ok(state.usage_logs.get(id).map(|log| log.iter().cloned().collect()).unwrap_or_default())
    }

    pub fn stats(&self) -> PoolStats {
        let now = Utc::now();
        let mut state = self.inner.state.lock();
        self.refresh_all(&mut state, now);

        let resources = &state.resources;
        let count = |status: ResourceStatus| resources.values().filter(|r| r.status == status).count();
        let total = resources.len();
        let avg_success_rate = if total == 0 {
            0.0
        } else {
            resources.values().map(|r| r.success_rate).sum::<f64>() / total as f64
        };

        PoolStats {
            kind: self.inner.kind,
            total,
            active: count(ResourceStatus::Active),
            cooldown: count(ResourceStatus::Cooldown),
            suspended: count(ResourceStatus::Suspended),
            disabled: count(ResourceStatus::Disabled),
            leased: resources.values().filter(|r| r.is_leased()).count(),
            avg_success_rate,
            daily_limit: self.inner.limits.daily_limit,
        }
    }
}
