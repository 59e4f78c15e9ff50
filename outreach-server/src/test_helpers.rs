//! Test helpers for outreach-server unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use outreach_core::{LogAlerter, ScrapeError, ScrapeOutcome, ScrapeRequest, Scraper, SqliteStore};
use outreach_types::{AppConfig, ProxyProtocol, Resource, ResourceAddress};

use crate::state::AppState;

/// Scraper that succeeds without touching the network.
pub struct StubScraper;

#[async_trait]
impl Scraper for StubScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome, ScrapeError> {
        Ok(ScrapeOutcome::Success(serde_json::json!({ "target": request.target })))
    }
}

/// Create a minimal `AppState` backed by SQLite in a temp dir.
///
/// Returns `(AppState, TempDir)`; keep `TempDir` alive for the test duration.
pub fn test_app_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let store = Arc::new(
        SqliteStore::open(&temp_dir.path().join("outreach.db")).expect("failed to open store"),
    );

    let state = AppState::new_with_components(
        AppConfig::default(),
        store,
        Arc::new(LogAlerter),
        Arc::new(StubScraper),
    )
    .expect("failed to create test AppState");

    (state, temp_dir)
}

pub fn test_proxy(id: &str) -> Resource {
    Resource::new(
        id,
        ResourceAddress::Proxy {
            host: "198.51.100.7".to_string(),
            port: 3128,
            protocol: ProxyProtocol::Http,
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
        },
    )
}
