//! # Outreach Core
//!
//! Resource rotation and rate-limited work scheduling for channel outreach.
//!
//! ## Architecture
//!
//! ```text
//! outreach-core/src/
//! ├── pool/          # ResourcePool: serialized acquire/release, lease guards
//! ├── health/        # HealthMonitor: scores, triage, reports
//! ├── rate_limit/    # RateLimiter: hourly buckets per resource
//! ├── queue/         # WorkQueue: priority + retry schedule, error analysis
//! ├── dispatcher/    # Dispatcher: the control loop binding it all together
//! ├── storage/       # ResourceStore / WorkItemStore (memory, SQLite)
//! ├── alert/         # Alerter collaborator (log, webhook)
//! ├── scrape/        # Scraper collaborator contract + HTTP implementation
//! ├── metrics.rs     # Dispatch/pool/queue metric helpers
//! └── config.rs      # AppConfig load/save
//! ```
//!
//! Pools and the queue own the only shared mutable state. Every mutation goes
//! through their serialized methods; the scraper call runs outside all locks.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards span whole critical sections"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::float_cmp,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::assertions_on_result_states
    )
)]

pub mod alert;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod rate_limit;
pub mod scrape;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use alert::{Alerter, LogAlerter, WebhookAlerter};
pub use dispatcher::{DispatchReport, Dispatcher, ProcessingStatus};
pub use error::{AppError, AppResult};
pub use health::{HealthMonitor, HealthOverview, HealthReport};
pub use pool::{ResourceLease, ResourcePool};
pub use queue::{BackoffPolicy, WorkQueue};
pub use rate_limit::RateLimiter;
pub use scrape::{HttpScraper, ScrapeError, ScrapeOutcome, ScrapeRequest, Scraper};
pub use storage::{MemoryStore, ResourceStore, SqliteStore, WorkItemStore};
