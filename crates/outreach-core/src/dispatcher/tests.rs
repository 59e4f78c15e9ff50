use super::*;
use crate::alert::testing::RecordingAlerter;
use crate::scrape::ScrapeError;
use crate::storage::MemoryStore;
use async_trait::async_trait;
use outreach_types::models::{PoolLimits, QueueConfig};
use outreach_types::{
    NewWorkItem, ProxyProtocol, Resource, ResourceAddress, ResourceKind, ResourceStatus,
};
use std::collections::{HashSet, VecDeque};
use tokio::sync::Notify;

/// Replays scripted outcomes, then succeeds. Optionally blocks until released.
#[derive(Default)]
struct ScriptedScraper {
    script: Mutex<VecDeque<Result<ScrapeOutcome, ScrapeError>>>,
    calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
    delay: Option<Duration>,
    live_proxies: Mutex<Option<HashSet<String>>>,
}

impl ScriptedScraper {
    fn with_script(script: Vec<Result<ScrapeOutcome, ScrapeError>>) -> Self {
        Self { script: Mutex::new(script.into()), ..Self::default() }
    }
}

#[async_trait]
impl Scraper for ScriptedScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(ScrapeOutcome::Success(serde_json::json!({ "target": request.target }))))
    }

    fn retain_proxies(&self, live: &HashSet<String>) -> usize {
        *self.live_proxies.lock() = Some(live.clone());
        0
    }
}

struct Harness {
    dispatcher: Arc<Dispatcher>,
    alerter: Arc<RecordingAlerter>,
    scraper: Arc<ScriptedScraper>,
}

impl Harness {
    fn queue(&self) -> &Arc<WorkQueue> {
        self.dispatcher.queue()
    }

    fn enqueue(&self, target: &str) -> String {
        self.queue().enqueue(NewWorkItem::new(target, "channel_about")).unwrap()
    }
}

fn proxy(id: &str) -> Resource {
    Resource::new(
        id,
        ResourceAddress::Proxy {
            host: "203.0.113.5".to_string(),
            port: 8000,
            protocol: ProxyProtocol::Http,
            username: None,
            password: None,
        },
    )
}

fn account(id: &str) -> Resource {
    let mut res = Resource::account(format!("user-{id}"), "pw");
    res.id = id.to_string();
    res
}

fn harness(
    accounts: &[&str],
    proxies: &[&str],
    scraper: ScriptedScraper,
    config: DispatcherConfig,
    hourly_limit: u32,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let alerter = Arc::new(RecordingAlerter::default());

    let account_pool = ResourcePool::new(
        ResourceKind::Account,
        PoolLimits { daily_limit: 50, cooldown_minutes: 30 },
        store.clone(),
        alerter.clone(),
    )
    .unwrap();
    for id in accounts {
        account_pool.add(account(id)).unwrap();
    }

    let proxy_pool = ResourcePool::new(
        ResourceKind::Proxy,
        PoolLimits { daily_limit: 200, cooldown_minutes: 30 },
        store.clone(),
        alerter.clone(),
    )
    .unwrap();
    for id in proxies {
        proxy_pool.add(proxy(id)).unwrap();
    }

    // Zero backoff so retries are immediately eligible
    let queue_config = QueueConfig { max_attempts: 3, backoff_base_secs: 0, backoff_max_secs: 0 };
    let queue = Arc::new(WorkQueue::new(store, &queue_config).unwrap());
    let scraper = Arc::new(scraper);

    let dispatcher = Dispatcher::new(
        account_pool,
        proxy_pool,
        queue,
        Arc::new(RateLimiter::new(hourly_limit)),
        HealthMonitor::default(),
        scraper.clone(),
        config,
    );

    Harness { dispatcher: Arc::new(dispatcher), alerter, scraper }
}

fn simple(scraper: ScriptedScraper) -> Harness {
    harness(&["acc-1"], &["px-1"], scraper, DispatcherConfig::default(), 10)
}

#[tokio::test]
async fn test_enqueue_dispatch_success_round_trip() {
    let h = simple(ScriptedScraper::default());
    let id = h.enqueue("UC_creator");

    let report = h.dispatcher.run_once().await.unwrap();
    assert!(matches!(
        &report,
        DispatchReport::Dispatched { outcome: "success", state: WorkItemState::Done, .. }
    ));

    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::Done);
    assert_eq!(item.attempts, 1);
    assert_eq!(item.assigned_account_id.as_deref(), Some("acc-1"));
    assert_eq!(item.result.unwrap()["target"], "UC_creator");

    let acc = h.dispatcher.accounts().get("acc-1").unwrap();
    assert_eq!(acc.daily_request_count, 1);
    assert!(!acc.is_leased());
    assert_eq!(h.dispatcher.proxies().get("px-1").unwrap().daily_request_count, 1);
    assert_eq!(h.dispatcher.rate_limiter().usage("acc-1"), 1);

    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::QueueEmpty);
}

#[tokio::test]
async fn test_ban_disables_account_alerts_once_and_requeues() {
    let h = simple(ScriptedScraper::with_script(vec![Ok(ScrapeOutcome::Banned(
        "account terminated".to_string(),
    ))]));
    let id = h.enqueue("UC_creator");

    h.dispatcher.run_once().await.unwrap();

    let acc = h.dispatcher.accounts().get("acc-1").unwrap();
    assert_eq!(acc.status, ResourceStatus::Disabled);
    assert_eq!(h.alerter.messages().len(), 1);

    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::RetryScheduled);
    assert_eq!(item.last_error.as_deref(), Some("account terminated"));

    // Proxy was not at fault
    let px = h.dispatcher.proxies().get("px-1").unwrap();
    assert_eq!(px.daily_request_count, 0);
    assert_eq!(px.status, ResourceStatus::Active);

    // No usable account left: the item waits without losing an attempt
    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::NoAccount);
    assert_eq!(h.queue().get(&id).unwrap().attempts, 1);
    assert_eq!(h.alerter.messages().len(), 1);
}

#[tokio::test]
async fn test_three_transient_failures_end_failed() {
    let transient = || Ok(ScrapeOutcome::TransientFailure("connection reset".to_string()));
    let h = simple(ScriptedScraper::with_script(vec![transient(), transient(), transient()]));
    let id = h.enqueue("UC_creator");

    for _ in 0..3 {
        assert!(h.dispatcher.run_once().await.unwrap().is_dispatched());
    }

    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::Failed);
    assert_eq!(item.attempts, 3);
    assert_eq!(item.last_error.as_deref(), Some("connection reset"));
    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::QueueEmpty);

    assert_eq!(h.dispatcher.retry_failed(), 1);
    assert_eq!(h.queue().get(&id).unwrap().attempts, 0);
}

#[tokio::test]
async fn test_platform_rate_limit_cools_account_down() {
    let h = simple(ScriptedScraper::with_script(vec![Ok(ScrapeOutcome::RateLimited(
        "HTTP 429".to_string(),
    ))]));
    let id = h.enqueue("UC_creator");

    h.dispatcher.run_once().await.unwrap();

    assert_eq!(h.dispatcher.accounts().get("acc-1").unwrap().status, ResourceStatus::Cooldown);
    assert_eq!(h.queue().get(&id).unwrap().state, WorkItemState::RetryScheduled);
    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::NoAccount);
}

#[tokio::test]
async fn test_no_proxy_returns_account_untouched() {
    let h = harness(&["acc-1"], &[], ScriptedScraper::default(), DispatcherConfig::default(), 10);
    let id = h.enqueue("UC_creator");

    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::NoProxy);

    let acc = h.dispatcher.accounts().get("acc-1").unwrap();
    assert!(!acc.is_leased());
    assert_eq!(acc.daily_request_count, 0);
    assert!(acc.last_used_at.is_none());
    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::Pending);
    assert_eq!(item.attempts, 0);
    assert_eq!(h.scraper.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hourly_ceiling_blocks_dispatch() {
    let h = harness(&["acc-1"], &["px-1"], ScriptedScraper::default(), DispatcherConfig::default(), 1);
    h.enqueue("UC_one");
    let second = h.enqueue("UC_two");

    assert!(h.dispatcher.run_once().await.unwrap().is_dispatched());
    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::NoAccount);

    assert_eq!(h.queue().get(&second).unwrap().state, WorkItemState::Pending);
    assert!(!h.dispatcher.accounts().get("acc-1").unwrap().is_leased());
    assert!(!h.dispatcher.proxies().get("px-1").unwrap().is_leased());
    assert_eq!(h.dispatcher.proxies().get("px-1").unwrap().daily_request_count, 1);
}

#[tokio::test]
async fn test_account_at_ceiling_does_not_starve_others() {
    let h = harness(&["acc-a"], &["px-1"], ScriptedScraper::default(), DispatcherConfig::default(), 2);
    h.enqueue("UC_one");
    h.enqueue("UC_two");
    assert!(h.dispatcher.run_once().await.unwrap().is_dispatched());
    assert!(h.dispatcher.run_once().await.unwrap().is_dispatched());
    assert_eq!(h.dispatcher.rate_limiter().usage("acc-a"), 2);

    // After its first job acc-b is more recently used than acc-a.
    h.dispatcher.accounts().add(account("acc-b")).unwrap();
    let third = h.enqueue("UC_three");
    let fourth = h.enqueue("UC_four");

    let mut used = Vec::new();
    for _ in 0..5 {
        match h.dispatcher.run_once().await.unwrap() {
            DispatchReport::Dispatched { account_id, .. } => used.push(account_id),
            DispatchReport::QueueEmpty => break,
            other => panic!("unexpected idle report: {other:?}"),
        }
    }

    assert_eq!(used, vec!["acc-b".to_string(), "acc-b".to_string()]);
    assert_eq!(h.dispatcher.rate_limiter().usage("acc-b"), 2);
    assert_eq!(h.queue().get(&third).unwrap().state, WorkItemState::Done);
    assert_eq!(h.queue().get(&fourth).unwrap().state, WorkItemState::Done);
    assert_eq!(h.dispatcher.accounts().get("acc-a").unwrap().daily_request_count, 2);
}

#[tokio::test]
async fn test_scrape_timeout_is_transient() {
    let scraper = ScriptedScraper { delay: Some(Duration::from_secs(5)), ..ScriptedScraper::default() };
    let config = DispatcherConfig { scrape_timeout_secs: 1, ..DispatcherConfig::default() };
    let h = harness(&["acc-1"], &["px-1"], scraper, config, 10);
    let id = h.enqueue("UC_slow");

    let report = h.dispatcher.run_once().await.unwrap();
    assert!(matches!(report, DispatchReport::Dispatched { outcome: "transient", .. }));

    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::RetryScheduled);
    assert!(item.last_error.unwrap().contains("timed out"));
    assert!(!h.dispatcher.accounts().get("acc-1").unwrap().is_leased());
}

#[tokio::test]
async fn test_contract_error_fails_item_without_touching_resources() {
    let h = simple(ScriptedScraper::with_script(vec![Err(ScrapeError::InvalidPayload(
        "bad target".to_string(),
    ))]));
    let id = h.enqueue("UC_creator");

    let report = h.dispatcher.run_once().await.unwrap();
    assert!(matches!(report, DispatchReport::Dispatched { outcome: "contract_error", .. }));

    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::Failed);
    assert_eq!(item.attempts, 1);

    let acc = h.dispatcher.accounts().get("acc-1").unwrap();
    assert_eq!(acc.total_request_count, 0);
    assert_eq!(acc.success_rate, 100.0);
}

#[tokio::test]
async fn test_saturated_when_all_slots_busy() {
    let hold = Arc::new(Notify::new());
    let scraper = ScriptedScraper { hold: Some(hold.clone()), ..ScriptedScraper::default() };
    let config = DispatcherConfig { max_concurrent: 1, ..DispatcherConfig::default() };
    let h = harness(&["acc-1", "acc-2"], &["px-1", "px-2"], scraper, config, 10);
    h.enqueue("UC_one");
    h.enqueue("UC_two");

    let dispatcher = h.dispatcher.clone();
    let running = tokio::spawn(async move { dispatcher.run_once().await });
    while h.scraper.calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(h.dispatcher.run_once().await.unwrap(), DispatchReport::Saturated);
    assert_eq!(h.dispatcher.processing_status().processing_capacity, 0);

    hold.notify_one();
    assert!(running.await.unwrap().unwrap().is_dispatched());
    assert_eq!(h.dispatcher.processing_status().active_dispatches, 0);
}

#[tokio::test]
async fn test_cancelled_dispatch_releases_everything() {
    let hold = Arc::new(Notify::new());
    let scraper = ScriptedScraper { hold: Some(hold), ..ScriptedScraper::default() };
    let h = simple(scraper);
    let id = h.enqueue("UC_creator");

    let dispatcher = h.dispatcher.clone();
    let running = tokio::spawn(async move { dispatcher.run_once().await });
    while h.scraper.calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.queue().get(&id).unwrap().state, WorkItemState::InFlight);

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());

    let item = h.queue().get(&id).unwrap();
    assert_eq!(item.state, WorkItemState::RetryScheduled);
    assert_eq!(item.last_error.as_deref(), Some("dispatch interrupted"));

    let acc = h.dispatcher.accounts().get("acc-1").unwrap();
    assert!(!acc.is_leased());
    assert_eq!(acc.total_request_count, 0);
    assert!(!h.dispatcher.proxies().get("px-1").unwrap().is_leased());
    assert_eq!(h.dispatcher.processing_status().active_dispatches, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_never_doubles_up() {
    let scraper = ScriptedScraper { delay: Some(Duration::from_millis(20)), ..ScriptedScraper::default() };
    let config = DispatcherConfig { max_concurrent: 3, ..DispatcherConfig::default() };
    let h = harness(&["a1", "a2", "a3"], &["p1", "p2", "p3"], scraper, config, 100);
    let ids: Vec<String> = (0..9).map(|i| h.enqueue(&format!("UC_{i}"))).collect();

    let mut tasks = JoinSet::new();
    for _ in 0..6 {
        let dispatcher = h.dispatcher.clone();
        tasks.spawn(async move {
            for _ in 0..500 {
                if dispatcher.queue().stats().done == 9 {
                    break;
                }
                if !dispatcher.run_once().await.unwrap().is_dispatched() {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    for id in &ids {
        let item = h.queue().get(id).unwrap();
        assert_eq!(item.state, WorkItemState::Done, "item {id} not done");
        assert_eq!(item.attempts, 1, "item {id} dispatched more than once");
    }
    assert_eq!(h.scraper.calls.load(Ordering::SeqCst), 9);
}

#[tokio::test]
async fn test_run_forever_drains_queue_and_stops() {
    let config = DispatcherConfig { max_concurrent: 2, poll_interval_ms: 10, ..DispatcherConfig::default() };
    let h = harness(&["a1", "a2"], &["p1", "p2"], ScriptedScraper::default(), config, 100);
    for i in 0..5 {
        h.enqueue(&format!("UC_{i}"));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(h.dispatcher.clone().run_forever(shutdown_rx));

    for _ in 0..200 {
        if h.queue().stats().done == 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.queue().stats().done, 5);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_processing_status_reports_capacity() {
    let h = harness(&["a1", "a2"], &["p1"], ScriptedScraper::default(), DispatcherConfig::default(), 10);
    let status = h.dispatcher.processing_status();
    assert_eq!(status.available_accounts, 2);
    assert_eq!(status.available_proxies, 1);
    assert_eq!(status.processing_capacity, 1);
    assert_eq!(status.max_concurrent, 3);
    assert_eq!(status.in_flight, 0);
}

#[tokio::test]
async fn test_prune_scraper_clients_keeps_only_usable_proxies() {
    let h = harness(&["acc-1"], &["px-1"], ScriptedScraper::default(), DispatcherConfig::default(), 10);
    let mut second = proxy("px-2");
    second.address = ResourceAddress::Proxy {
        host: "203.0.113.6".to_string(),
        port: 8000,
        protocol: ProxyProtocol::Http,
        username: None,
        password: None,
    };
    h.dispatcher.proxies().add(second).unwrap();
    h.dispatcher.proxies().set_status("px-2", ResourceStatus::Disabled).unwrap();

    h.dispatcher.prune_scraper_clients();

    let live = h.scraper.live_proxies.lock().clone().unwrap();
    assert_eq!(live, HashSet::from(["http://203.0.113.5:8000".to_string()]));
}
