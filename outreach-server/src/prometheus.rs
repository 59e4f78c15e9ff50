//! Prometheus exporter for the metrics recorded by `outreach_core::metrics`.

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::state::AppState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Scrape calls range from sub-second cache hits to the 30s timeout.
const SCRAPE_LATENCY_BUCKETS: &[f64] = &[0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0];

/// Install the global recorder. Safe to call more than once.
pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().set_buckets(SCRAPE_LATENCY_BUCKETS)?.install_recorder()?;
    outreach_core::metrics::describe();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Refresh pool and queue gauges, then render everything in text format.
pub fn render_metrics(state: &AppState) -> String {
    state.refresh_gauges();

    PROMETHEUS_HANDLE
        .get()
        .map_or_else(|| String::from("# Metrics not initialized\n"), PrometheusHandle::render)
}
