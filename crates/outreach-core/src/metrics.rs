//! Metric recording helpers.
//!
//! Recording is a no-op until a recorder is installed; the server installs the
//! Prometheus exporter at startup.
//!
//! - `outreach_dispatch_total{outcome}` - dispatch attempts by result
//! - `outreach_scrape_duration_seconds{outcome}` - scraper call latency
//! - `outreach_resources_total{kind}` / `outreach_resources_available{kind}`
//! - `outreach_queue_items{state}`

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use outreach_types::{QueueStats, ResourceKind};

pub const DISPATCH_TOTAL: &str = "outreach_dispatch_total";
pub const SCRAPE_DURATION: &str = "outreach_scrape_duration_seconds";
pub const RESOURCES_TOTAL: &str = "outreach_resources_total";
pub const RESOURCES_AVAILABLE: &str = "outreach_resources_available";
pub const QUEUE_ITEMS: &str = "outreach_queue_items";

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(DISPATCH_TOTAL, "Dispatch attempts by outcome");
    describe_histogram!(SCRAPE_DURATION, "Scraper call duration in seconds");
    describe_gauge!(RESOURCES_TOTAL, "Registered resources per pool");
    describe_gauge!(RESOURCES_AVAILABLE, "Resources currently eligible for leasing");
    describe_gauge!(QUEUE_ITEMS, "Work items per state");
}

pub fn record_dispatch(outcome: &'static str) {
    counter!(DISPATCH_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_scrape_duration(outcome: &'static str, seconds: f64) {
    histogram!(SCRAPE_DURATION, "outcome" => outcome).record(seconds);
}

pub fn update_pool_gauges(kind: ResourceKind, total: usize, available: usize) {
    let kind = kind.to_string();
    gauge!(RESOURCES_TOTAL, "kind" => kind.clone()).set(total as f64);
    gauge!(RESOURCES_AVAILABLE, "kind" => kind).set(available as f64);
}

pub fn update_queue_gauges(stats: &QueueStats) {
    for (state, count) in [
        ("pending", stats.pending),
        ("in_flight", stats.in_flight),
        ("retry_scheduled", stats.retry_scheduled),
        ("done", stats.done),
        ("failed", stats.failed),
    ] {
        gauge!(QUEUE_ITEMS, "state" => state).set(count as f64);
    }
}
