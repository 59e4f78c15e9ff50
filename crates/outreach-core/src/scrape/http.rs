//! HTTP scraper for channel about pages.

use async_trait::async_trait;
use outreach_types::models::ScraperConfig;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{extract_email, ScrapeError, ScrapeOutcome, ScrapeRequest, Scraper};

const CHANNEL_ABOUT: &str = "channel_about";

/// Fetches `{base_url}/channel/{id}/about` (or `/@handle/about`) through the
/// leased proxy and pulls the first contact email out of the page.
///
/// One `reqwest::Client` is cached per proxy URL so connection pools survive
/// across calls. Entries for proxies that left the pool are dropped by
/// [`Scraper::retain_proxies`].
pub struct HttpScraper {
    base_url: String,
    user_agent: String,
    clients: RwLock<HashMap<String, Client>>,
}

impl HttpScraper {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// About-page URL for a channel id (`UC...`), a handle (`@name`), or an
    /// explicit `payload.url` override.
    fn about_url(&self, request: &ScrapeRequest) -> Result<String, ScrapeError> {
        if let Some(url) = request.payload.get("url") {
            let url = url
                .as_str()
                .ok_or_else(|| ScrapeError::InvalidPayload("`url` must be a string".to_string()))?;
            url::Url::parse(url).map_err(|e| ScrapeError::InvalidPayload(format!("`url`: {e}")))?;
            return Ok(url.to_string());
        }

        let target = request.target.trim();
        if target.is_empty() || target.contains('/') || target.contains(char::is_whitespace) {
            return Err(ScrapeError::InvalidPayload(format!("invalid channel target '{target}'")));
        }
        if target.starts_with('@') {
            Ok(format!("{}/{target}/about", self.base_url))
        } else {
            Ok(format!("{}/channel/{target}/about", self.base_url))
        }
    }

    fn client_for(&self, proxy_url: &str) -> Result<Client, String> {
        if let Some(client) = self.clients.read().get(proxy_url) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write();
        if let Some(client) = clients.get(proxy_url) {
            return Ok(client.clone());
        }

        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| format!("invalid proxy: {e}"))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(self.user_agent.clone())
            .proxy(proxy)
            .build()
            .map_err(|e| format!("failed to build proxy client: {e}"))?;

        clients.insert(proxy_url.to_string(), client.clone());
        Ok(client)
    }

    fn classify_status(status: StatusCode) -> Option<ScrapeOutcome> {
        let reason = format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string();

        match status {
            StatusCode::TOO_MANY_REQUESTS => Some(ScrapeOutcome::RateLimited(reason)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(ScrapeOutcome::Banned(reason)),
            s if s.is_success() => None,
            _ => Some(ScrapeOutcome::TransientFailure(reason)),
        }
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome, ScrapeError> {
        if request.kind != CHANNEL_ABOUT {
            return Err(ScrapeError::UnsupportedKind(request.kind.clone()));
        }
        let url = self.about_url(request)?;

        let Some(proxy_url) = request.proxy.proxy_url() else {
            return Err(ScrapeError::InvalidPayload("egress is not a proxy".to_string()));
        };
        let client = match self.client_for(&proxy_url) {
            Ok(client) => client,
            Err(reason) => return Ok(ScrapeOutcome::TransientFailure(reason)),
        };

        tracing::debug!(
            work_item_id = %request.work_item_id,
            account = %request.account,
            proxy = %request.proxy,
            %url,
            "Fetching about page"
        );

        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(ScrapeOutcome::TransientFailure(format!("request timed out: {e}")));
            },
            Err(e) if e.is_connect() => {
                return Ok(ScrapeOutcome::TransientFailure(format!("proxy connection failed: {e}")));
            },
            Err(e) => return Ok(ScrapeOutcome::TransientFailure(format!("network error: {e}"))),
        };

        let status = response.status();
        if let Some(outcome) = Self::classify_status(status) {
            return Ok(outcome);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ScrapeOutcome::TransientFailure(format!("failed to read body: {e}"))),
        };

        let email = extract_email(&body);
        Ok(ScrapeOutcome::Success(serde_json::json!({
            "url": url,
            "status": status.as_u16(),
            "content_length": body.len(),
            "email": email,
        })))
    }

    fn retain_proxies(&self, live: &HashSet<String>) -> usize {
        let mut clients = self.clients.write();
        let before = clients.len();
        clients.retain(|url, _| live.contains(url));
        let removed = before - clients.len();
        if removed > 0 {
            tracing::debug!(removed, "Dropped clients of removed proxies");
        }
        removed
    }
}
