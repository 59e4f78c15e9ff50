//! Background Schedulers
//!
//! - Dispatcher workers (`Dispatcher::run_forever`)
//! - Maintenance, hourly: daily counter reset on both pools, removal of
//!   stale rate-limiter buckets and of scraper clients for departed proxies
//! - Health triage, every `health.evaluate_interval_secs`: suspend failing
//!   resources in both pools
//!
//! Every task stops when the shutdown channel turns true.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::state::AppState;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub accounts_reset: usize,
    pub proxies_reset: usize,
    pub buckets_removed: usize,
    pub clients_pruned: usize,
}

/// Roll daily counters, drop rate-limiter buckets from past hours and
/// scraper clients of proxies no longer usable.
pub fn run_maintenance(state: &AppState) -> MaintenanceReport {
    let report = MaintenanceReport {
        accounts_reset: state.accounts().reset_daily_counters(),
        proxies_reset: state.proxies().reset_daily_counters(),
        buckets_removed: state.rate_limiter().cleanup_expired(),
        clients_pruned: state.dispatcher().prune_scraper_clients(),
    };
    if report != MaintenanceReport::default() {
        tracing::info!(
            "[Scheduler] Maintenance: {} accounts reset, {} proxies reset, {} rate-limit buckets removed, {} scraper clients pruned",
            report.accounts_reset,
            report.proxies_reset,
            report.buckets_removed,
            report.clients_pruned
        );
    }
    report
}

/// Suspend failing resources in both pools. Returns the suspended ids.
pub fn run_health_triage(state: &AppState) -> Vec<String> {
    let mut suspended = state.health().evaluate_and_flag(state.accounts());
    suspended.extend(state.health().evaluate_and_flag(state.proxies()));
    suspended
}

/// Spawn the dispatcher and the periodic tasks.
pub fn start(state: &AppState, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let dispatcher = Arc::clone(state.dispatcher());
    let triage_every = Duration::from_secs(state.config().health.evaluate_interval_secs.max(1));

    vec![
        tokio::spawn(dispatcher.run_forever(shutdown.clone())),
        spawn_periodic("Maintenance", MAINTENANCE_INTERVAL, shutdown.clone(), {
            let state = state.clone();
            move || {
                run_maintenance(&state);
            }
        }),
        spawn_periodic("HealthTriage", triage_every, shutdown.clone(), {
            let state = state.clone();
            move || {
                run_health_triage(&state);
            }
        }),
    ]
}

fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    task: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!("[Scheduler] {} task started (every {}s)", name, period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => task(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }
        tracing::debug!("[Scheduler] {} task stopped", name);
    })
}
