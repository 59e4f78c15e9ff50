use reqwest::Client;
use std::time::Duration;

use super::Alerter;

/// Posts alerts as `{"content": message}` to a Discord-compatible webhook.
pub struct WebhookAlerter {
    client: Client,
    url: String,
}

impl WebhookAlerter {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build webhook client, using defaults: {}", e);
                Client::new()
            });
        Self { client, url: url.into() }
    }

    async fn post(client: Client, url: String, message: String) {
        let body = serde_json::json!({ "content": message });
        match client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("Alert delivered to webhook");
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Alert webhook rejected message");
            },
            Err(e) => {
                tracing::warn!("Alert webhook delivery failed: {}", e);
            },
        }
    }
}

impl Alerter for WebhookAlerter {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "outreach::alert", "🚨 {}", message);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, alert not sent to webhook");
            return;
        };
        let _ = handle.spawn(Self::post(self.client.clone(), self.url.clone(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_webhook_posts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({ "content": "account acc-1 banned" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let alerter = WebhookAlerter::new(format!("{}/hook", server.uri()));
        alerter.notify("account acc-1 banned");

        for _ in 0..50 {
            if !server.received_requests().await.unwrap_or_default().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        server.verify().await;
    }

    #[test]
    fn test_notify_without_runtime_does_not_panic() {
        let alerter = WebhookAlerter::new("http://127.0.0.1:9/hook");
        alerter.notify("no runtime here");
    }
}
