//! Application State
//!
//! Wires pools, queue, rate limiter and scraper into one `Dispatcher` shared by
//! the API handlers and the background tasks.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use outreach_core::utils::paths;
use outreach_core::{
    config as core_config, Alerter, AppResult, Dispatcher, HealthMonitor, HttpScraper,
    LogAlerter, RateLimiter, ResourcePool, ResourceStore, Scraper, SqliteStore, WebhookAlerter,
    WorkItemStore, WorkQueue,
};
use outreach_types::{AppConfig, ResourceKind};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub dispatcher: Arc<Dispatcher>,
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the config and SQLite store in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config = core_config::load_config(data_dir)?;
        let db_path = data_dir.join(paths::DB_FILE);
        let store = Arc::new(SqliteStore::open(&db_path)?);
        tracing::info!(path = %db_path.display(), "📂 Opened store");

        let alerter: Arc<dyn Alerter> = match &config.alerts.webhook_url {
            Some(url) => Arc::new(WebhookAlerter::new(url.clone())),
            None => Arc::new(LogAlerter),
        };
        let scraper = Arc::new(HttpScraper::new(&config.scraper));

        Ok(Self::new_with_components(config, store, alerter, scraper)?)
    }

    /// Create AppState with pre-initialized components.
    pub fn new_with_components<S>(
        config: AppConfig,
        store: Arc<S>,
        alerter: Arc<dyn Alerter>,
        scraper: Arc<dyn Scraper>,
    ) -> AppResult<Self>
    where
        S: ResourceStore + WorkItemStore + 'static,
    {
        let accounts = ResourcePool::new(
            ResourceKind::Account,
            config.accounts.clone(),
            store.clone(),
            Arc::clone(&alerter),
        )?;
        let proxies =
            ResourcePool::new(ResourceKind::Proxy, config.proxies.clone(), store.clone(), alerter)?;
        let queue = Arc::new(WorkQueue::new(store, &config.queue)?);

        let dispatcher = Dispatcher::new(
            accounts,
            proxies,
            queue,
            Arc::new(RateLimiter::new(config.rate_limit.hourly_limit)),
            HealthMonitor::new(config.health.clone()),
            scraper,
            config.dispatcher.clone(),
        );

        Ok(Self { inner: Arc::new(AppStateInner { dispatcher: Arc::new(dispatcher), config }) })
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn accounts(&self) -> &ResourcePool {
        self.inner.dispatcher.accounts()
    }

    pub fn proxies(&self) -> &ResourcePool {
        self.inner.dispatcher.proxies()
    }

    pub fn queue(&self) -> &WorkQueue {
        self.inner.dispatcher.queue()
    }

    pub fn health(&self) -> &HealthMonitor {
        self.inner.dispatcher.health()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        self.inner.dispatcher.rate_limiter()
    }

    /// Push current pool and queue sizes into the metric gauges.
    pub fn refresh_gauges(&self) {
        for pool in [self.accounts(), self.proxies()] {
            outreach_core::metrics::update_pool_gauges(
                pool.kind(),
                pool.stats().total,
                pool.available_count(),
            );
        }
        outreach_core::metrics::update_queue_gauges(&self.queue().stats());
    }
}
