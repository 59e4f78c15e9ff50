use std::sync::Arc;

use outreach_types::models::{HealthConfig, PoolLimits};
use outreach_types::{ReleaseOutcome, Resource, ResourceKind, ResourceStatus};

use crate::alert::LogAlerter;
use crate::health::HealthMonitor;
use crate::pool::ResourcePool;
use crate::storage::MemoryStore;

fn account(id: &str, success_rate: f64, total: u64, daily: u32) -> Resource {
    let mut res = Resource::account(format!("user-{id}"), "pw");
    res.id = id.to_string();
    res.success_rate = success_rate;
    res.total_request_count = total;
    res.daily_request_count = daily;
    res.counters_day = Some(chrono::Utc::now().date_naive());
    res
}

fn pool(resources: Vec<Resource>) -> ResourcePool {
    let pool = ResourcePool::new(
        ResourceKind::Account,
        PoolLimits { daily_limit: 10, cooldown_minutes: 30 },
        Arc::new(MemoryStore::new()),
        Arc::new(LogAlerter),
    )
    .unwrap();
    for res in resources {
        pool.add(res).unwrap();
    }
    pool
}

#[test]
fn test_score_monotonic() {
    let monitor = HealthMonitor::default();

    let strong = account("a", 90.0, 20, 2);
    let weak = account("b", 60.0, 20, 2);
    assert!(monitor.score(&strong, 10) > monitor.score(&weak, 10));

    let idle = account("c", 90.0, 20, 0);
    let busy = account("d", 90.0, 20, 9);
    assert!(monitor.score(&idle, 10) > monitor.score(&busy, 10));

    // Pure function of inputs
    assert_eq!(monitor.score(&strong, 10), monitor.score(&strong.clone(), 10));
}

#[test]
fn test_score_bounds() {
    let monitor = HealthMonitor::default();
    assert!((monitor.score(&account("a", 100.0, 0, 0), 10) - 100.0).abs() < 1e-9);
    assert_eq!(monitor.score(&account("b", 0.0, 50, 10), 10), 0.0);
}

#[test]
fn test_healthiest_skips_non_active_and_leased() {
    let mut disabled = account("a-best", 100.0, 50, 0);
    disabled.status = ResourceStatus::Disabled;
    let pool = pool(vec![disabled, account("b", 95.0, 50, 0), account("c", 70.0, 50, 0)]);
    let monitor = HealthMonitor::default();

    assert_eq!(monitor.healthiest(&pool).unwrap().id, "b");

    // Lease the LRU pick ("b", never used; ties by id) and it drops out
    let lease = pool.acquire().unwrap();
    assert_eq!(lease.id(), "b");
    assert_eq!(monitor.healthiest(&pool).unwrap().id, "c");
}

#[test]
fn test_healthiest_tie_breaks_on_id() {
    let pool = pool(vec![account("z", 80.0, 5, 1), account("m", 80.0, 5, 1)]);
    assert_eq!(HealthMonitor::default().healthiest(&pool).unwrap().id, "m");
}

#[test]
fn test_healthiest_empty_pool() {
    assert!(HealthMonitor::default().healthiest(&pool(vec![])).is_none());
}

#[test]
fn test_evaluate_and_flag_respects_min_samples() {
    let pool = pool(vec![
        account("failing", 20.0, 30, 0),
        account("young", 10.0, 3, 0),
        account("fine", 85.0, 30, 0),
    ]);
    let monitor = HealthMonitor::default();

    let flagged = monitor.evaluate_and_flag(&pool);
    assert_eq!(flagged, vec!["failing".to_string()]);
    assert_eq!(pool.get("failing").unwrap().status, ResourceStatus::Suspended);
    assert_eq!(pool.get("young").unwrap().status, ResourceStatus::Active);

    // Suspended is restorable, unlike disabled
    pool.restore("failing").unwrap();
    assert_eq!(pool.get("failing").unwrap().status, ResourceStatus::Active);
}

#[test]
fn test_evaluate_resource_after_failure() {
    let pool = pool(vec![account("acc", 40.5, 30, 0)]);
    let monitor = HealthMonitor::new(HealthConfig { success_rate_floor: 40.0, ..HealthConfig::default() });

    let lease = pool.acquire().unwrap();
    lease.release(ReleaseOutcome::Transient("timeout".into())).unwrap();

    assert!(monitor.evaluate_resource(&pool, "acc"));
    assert_eq!(pool.get("acc").unwrap().status, ResourceStatus::Suspended);
}

#[test]
fn test_check_reports_issues() {
    let monitor = HealthMonitor::default();

    let report = monitor.check(&account("ok", 99.0, 20, 1), 10);
    assert!(report.healthy);
    assert!(report.issues.is_empty());
    assert_eq!(report.metrics.daily_limit, 10);

    let mut bad = account("bad", 15.0, 40, 9);
    bad.status = ResourceStatus::Suspended;
    let report = monitor.check(&bad, 10);
    assert!(!report.healthy);
    assert_eq!(report.issues.len(), 3);
    assert_eq!(report.issues.len(), report.recommendations.len());
    assert!(!report.address.contains("pw"));
}

#[test]
fn test_overview_counts() {
    let mut disabled = account("d", 50.0, 10, 0);
    disabled.status = ResourceStatus::Disabled;
    let mut suspended = account("s", 10.0, 30, 0);
    suspended.status = ResourceStatus::Suspended;
    let pool = pool(vec![account("h1", 99.0, 5, 0), account("h2", 98.0, 5, 0), disabled, suspended]);

    let overview = HealthMonitor::default().overview(&pool);
    assert_eq!(overview.total, 4);
    assert_eq!(overview.healthy, 2);
    assert_eq!(overview.unhealthy, 2);
    assert_eq!(overview.disabled, 1);
    assert_eq!(overview.suspended, 1);
    assert_eq!(overview.overall_health_score, 50.0);
    assert_eq!(overview.needs_attention.len(), 1);
    assert_eq!(overview.needs_attention[0].resource_id, "s");
    assert!(!overview.recommendations.is_empty());
}

#[test]
fn test_overview_empty_pool() {
    let overview = HealthMonitor::default().overview(&pool(vec![]));
    assert_eq!(overview.total, 0);
    assert_eq!(overview.overall_health_score, 0.0);
    assert_eq!(overview.recommendations.len(), 1);
}
