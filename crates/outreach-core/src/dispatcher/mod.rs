//! Dispatcher: binds queue, pools, rate limiter and scraper into one
//! dispatch step.
//!
//! ```text
//! run_once
//!  ├─ 1. reserve a dispatch slot           (none  -> Saturated)
//!  ├─ claim lock ─────────────────────────────────────────────
//!  │   2. queue.next_eligible              (none  -> QueueEmpty)
//!  │   3. accounts.acquire (under ceiling) (none  -> NoAccount)
//!  │   4. proxies.acquire                  (none  -> NoProxy, account no_op)
//!  │   5. rate_limiter.allow(account)      (false -> RateLimited, both no_op)
//!  │   6. queue.mark_in_flight
//!  ├─ 7. scraper.scrape                    (no locks held, per-call timeout)
//!  └─ 8-11. queue outcome + lease releases
//! ```
//!
//! Steps 2-6 run under one claim lock so two workers never pick the same item
//! or burn a lease on an item another worker is about to take. Leases and the
//! item claim are drop guards, so a cancelled dispatch still returns its
//! resources and reschedules its item.

mod claim;
mod slot;

#[cfg(test)]
mod tests;

use chrono::Utc;
use outreach_types::models::DispatcherConfig;
use outreach_types::{ReleaseOutcome, ResourceStatus, WorkItemState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;

use self::claim::ItemClaim;
use self::slot::DispatchSlot;
use crate::error::AppResult;
use crate::health::HealthMonitor;
use crate::metrics;
use crate::pool::{ResourceLease, ResourcePool};
use crate::queue::WorkQueue;
use crate::rate_limit::RateLimiter;
use crate::scrape::{ScrapeOutcome, ScrapeRequest, Scraper};

/// What a single `run_once()` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DispatchReport {
    /// All dispatch slots busy
    Saturated,
    /// Nothing eligible right now
    QueueEmpty,
    NoAccount,
    NoProxy,
    /// Leased account is over its hourly ceiling
    RateLimited { account_id: String },
    /// An item was sent to the scraper
    Dispatched {
        work_item_id: String,
        account_id: String,
        proxy_id: String,
        /// Scrape outcome label, or `contract_error`
        outcome: &'static str,
        state: WorkItemState,
    },
}

impl DispatchReport {
    pub const fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }
}

/// Snapshot for operators: how much work could start right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub available_accounts: usize,
    pub available_proxies: usize,
    /// New dispatches that could start immediately
    pub processing_capacity: usize,
    pub in_flight: usize,
    pub active_dispatches: usize,
    pub max_concurrent: usize,
}

pub struct Dispatcher {
    accounts: ResourcePool,
    proxies: ResourcePool,
    queue: Arc<WorkQueue>,
    rate_limiter: Arc<RateLimiter>,
    health: HealthMonitor,
    scraper: Arc<dyn Scraper>,
    config: DispatcherConfig,
    active: Arc<AtomicUsize>,
    claim_lock: Mutex<()>,
}

/// Resources and item held between claim and outcome.
struct Claimed {
    item: ItemClaim,
    request: ScrapeRequest,
    account: ResourceLease,
    proxy: ResourceLease,
}

impl Dispatcher {
    pub fn new(
        accounts: ResourcePool,
        proxies: ResourcePool,
        queue: Arc<WorkQueue>,
        rate_limiter: Arc<RateLimiter>,
        health: HealthMonitor,
        scraper: Arc<dyn Scraper>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            accounts,
            proxies,
            queue,
            rate_limiter,
            health,
            scraper,
            config,
            active: Arc::new(AtomicUsize::new(0)),
            claim_lock: Mutex::new(()),
        }
    }

    pub fn accounts(&self) -> &ResourcePool {
        &self.accounts
    }

    pub fn proxies(&self) -> &ResourcePool {
        &self.proxies
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// Steps 2-6. Returns the idle report when nothing could be claimed.
    fn claim(&self) -> AppResult<Result<Claimed, DispatchReport>> {
        let _claim_guard = self.claim_lock.lock();
        let now = Utc::now();

        let Some(item) = self.queue.next_eligible_at(now) else {
            return Ok(Err(DispatchReport::QueueEmpty));
        };

        // Accounts over their hourly ceiling are skipped here, otherwise the
        // least-recently-used one would be re-picked on every step.
        let Some(account) =
            self.accounts.acquire_where_at(now, |r| self.rate_limiter.allow_at(&r.id, now))
        else {
            tracing::debug!(work_item_id = %item.id, "No account available, item stays queued");
            return Ok(Err(DispatchReport::NoAccount));
        };

        let Some(proxy) = self.proxies.acquire_at(now) else {
            tracing::debug!(work_item_id = %item.id, "No proxy available, item stays queued");
            account.release_at(ReleaseOutcome::NoOp, now)?;
            return Ok(Err(DispatchReport::NoProxy));
        };

        if !self.rate_limiter.allow_at(account.id(), now) {
            let account_id = account.id().to_string();
            account.release_at(ReleaseOutcome::NoOp, now)?;
            proxy.release_at(ReleaseOutcome::NoOp, now)?;
            return Ok(Err(DispatchReport::RateLimited { account_id }));
        }

        let item = self.queue.mark_in_flight_at(&item.id, account.id(), proxy.id(), now)?;

        let request = ScrapeRequest {
            work_item_id: item.id.clone(),
            target: item.target,
            kind: item.kind,
            payload: item.payload,
            account: account.resource().address.clone(),
            proxy: proxy.resource().address.clone(),
        };

        Ok(Ok(Claimed { item: ItemClaim::new(Arc::clone(&self.queue), item.id), request, account, proxy }))
    }

    /// Perform at most one dispatch.
    ///
    /// Exhaustion of any kind is an `Ok` idle report. `Err` means a pool or
    /// queue invariant was violated.
    pub async fn run_once(&self) -> AppResult<DispatchReport> {
        let Some(_slot) = DispatchSlot::try_acquire(&self.active, self.config.max_concurrent) else {
            return Ok(DispatchReport::Saturated);
        };

        let Claimed { mut item, request, account, proxy } = match self.claim()? {
            Ok(claimed) => claimed,
            Err(idle) => return Ok(idle),
        };

        let account_id = account.id().to_string();
        let proxy_id = proxy.id().to_string();
        tracing::info!(
            work_item_id = %item.id(),
            target = %request.target,
            %account_id,
            %proxy_id,
            "Dispatching work item"
        );

        let timeout = Duration::from_secs(self.config.scrape_timeout_secs);
        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, self.scraper.scrape(&request)).await {
            Ok(result) => result,
            Err(_) => Ok(ScrapeOutcome::TransientFailure(format!(
                "scrape timed out after {}s",
                self.config.scrape_timeout_secs
            ))),
        };

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "contract_error",
        };
        metrics::record_scrape_duration(label, started.elapsed().as_secs_f64());
        metrics::record_dispatch(label);

        let (queued, account_outcome, proxy_outcome) = match result {
            Ok(ScrapeOutcome::Success(data)) => {
                let queued = self.queue.complete(item.id(), Some(data));
                if queued.is_ok() {
                    self.rate_limiter.record(&account_id);
                }
                (queued, ReleaseOutcome::Success, ReleaseOutcome::Success)
            },
            Ok(ScrapeOutcome::TransientFailure(reason)) => (
                self.queue.fail(item.id(), &reason, true),
                ReleaseOutcome::Transient(reason.clone()),
                ReleaseOutcome::Transient(reason),
            ),
            Ok(ScrapeOutcome::RateLimited(reason)) => (
                self.queue.fail(item.id(), &reason, true),
                ReleaseOutcome::RateLimited(reason),
                ReleaseOutcome::NoOp,
            ),
            Ok(ScrapeOutcome::Banned(reason)) => (
                self.queue.fail(item.id(), &reason, true),
                ReleaseOutcome::Banned(reason),
                ReleaseOutcome::NoOp,
            ),
            Err(contract) => {
                tracing::error!(work_item_id = %item.id(), "Scraper rejected work item: {}", contract);
                (
                    self.queue.fail(item.id(), &contract.to_string(), false),
                    ReleaseOutcome::NoOp,
                    ReleaseOutcome::NoOp,
                )
            },
        };
        item.resolve();

        let account_failed = account_outcome.error().is_some();
        let proxy_failed = proxy_outcome.error().is_some();
        let account_released = account.release(account_outcome);
        let proxy_released = proxy.release(proxy_outcome);

        if account_failed {
            self.health.evaluate_resource(&self.accounts, &account_id);
        }
        if proxy_failed {
            self.health.evaluate_resource(&self.proxies, &proxy_id);
        }

        let work_item = queued?;
        account_released?;
        proxy_released?;

        Ok(DispatchReport::Dispatched {
            work_item_id: work_item.id,
            account_id,
            proxy_id,
            outcome: label,
            state: work_item.state,
        })
    }

    /// Run `max_concurrent` dispatch workers until `shutdown` turns true.
    ///
    /// Idle workers sleep for the poll interval; shutdown is checked between
    /// dispatches, so an in-flight scrape finishes (or times out) first.
    pub async fn run_forever(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let workers = self.config.max_concurrent.max(1);
        tracing::info!(
            workers,
            poll_interval_ms = self.config.poll_interval_ms,
            "🚀 Dispatcher started"
        );

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let dispatcher = Arc::clone(&self);
            let shutdown = shutdown.clone();
            set.spawn(async move { dispatcher.worker_loop(worker_id, shutdown).await });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Dispatch worker terminated abnormally: {}", e);
            }
        }
        tracing::info!("Dispatcher stopped");
    }

    async fn worker_loop(&self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.run_once().await {
                Ok(report) => {
                    if !report.is_dispatched() {
                        tracing::trace!(worker_id, ?report, "Dispatcher idle");
                    }
                    !report.is_dispatched()
                },
                Err(e) => {
                    tracing::error!(worker_id, "Dispatch step failed: {}", e);
                    true
                },
            };

            if idle {
                tokio::select! {
                    () = tokio::time::sleep(poll) => {},
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    },
                }
            }
        }
        tracing::debug!(worker_id, "Dispatch worker exiting");
    }

    /// Operator sweep: requeue all terminally failed items.
    pub fn retry_failed(&self) -> usize {
        self.queue.retry_failed()
    }

    /// Let the scraper forget proxies that were removed or disabled.
    /// Returns how many cached entries it dropped.
    pub fn prune_scraper_clients(&self) -> usize {
        let live: HashSet<String> = self
            .proxies
            .list()
            .iter()
            .filter(|p| p.status != ResourceStatus::Disabled)
            .filter_map(|p| p.address.proxy_url())
            .collect();
        self.scraper.retain_proxies(&live)
    }

    pub fn processing_status(&self) -> ProcessingStatus {
        let available_accounts = self.accounts.available_count();
        let available_proxies = self.proxies.available_count();
        let active_dispatches = self.active.load(Ordering::SeqCst);
        let free_slots = self.config.max_concurrent.saturating_sub(active_dispatches);

        ProcessingStatus {
            available_accounts,
            available_proxies,
            processing_capacity: available_accounts.min(available_proxies).min(free_slots),
            in_flight: self.queue.in_flight_count(),
            active_dispatches,
            max_concurrent: self.config.max_concurrent,
        }
    }
}
