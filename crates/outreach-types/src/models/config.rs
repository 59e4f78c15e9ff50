//! Application configuration.
//!
//! Every field carries a serde default so a partial (or missing) config file
//! yields a working setup.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Limits for the account pool
    #[serde(default = "PoolLimits::accounts")]
    pub accounts: PoolLimits,
    /// Limits for the proxy pool
    #[serde(default = "PoolLimits::proxies")]
    pub proxies: PoolLimits,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            accounts: PoolLimits::accounts(),
            proxies: PoolLimits::proxies(),
            rate_limit: RateLimitConfig::default(),
            queue: QueueConfig::default(),
            dispatcher: DispatcherConfig::default(),
            health: HealthConfig::default(),
            alerts: AlertConfig::default(),
            scraper: ScraperConfig::default(),
        }
    }

    /// Reject values that would stall or break scheduling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };

        if self.accounts.daily_limit == 0 {
            return Err(invalid("accounts.daily_limit", "must be at least 1"));
        }
        if self.proxies.daily_limit == 0 {
            return Err(invalid("proxies.daily_limit", "must be at least 1"));
        }
        if self.rate_limit.hourly_limit == 0 {
            return Err(invalid("rate_limit.hourly_limit", "must be at least 1"));
        }
        if self.dispatcher.max_concurrent == 0 {
            return Err(invalid("dispatcher.max_concurrent", "must be at least 1"));
        }
        if self.dispatcher.poll_interval_ms == 0 {
            return Err(invalid("dispatcher.poll_interval_ms", "must be at least 1"));
        }
        if self.dispatcher.scrape_timeout_secs == 0 {
            return Err(invalid("dispatcher.scrape_timeout_secs", "must be at least 1"));
        }
        if self.health.evaluate_interval_secs == 0 {
            return Err(invalid("health.evaluate_interval_secs", "must be at least 1"));
        }
        if self.queue.max_attempts == 0 {
            return Err(invalid("queue.max_attempts", "must be at least 1"));
        }
        if self.queue.backoff_max_secs < self.queue.backoff_base_secs {
            return Err(invalid("queue.backoff_max_secs", "must not be below backoff_base_secs"));
        }
        if !(0.0..=100.0).contains(&self.health.success_rate_floor) {
            return Err(invalid("health.success_rate_floor", "must be within 0..=100"));
        }
        if !(0.0..=1.0).contains(&self.health.utilization_weight) {
            return Err(invalid("health.utilization_weight", "must be within 0..=1"));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-pool quota and cooldown settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLimits {
    /// Uses per resource per UTC day
    pub daily_limit: u32,
    /// Cooldown applied after a platform rate-limit signal
    pub cooldown_minutes: u64,
}

impl PoolLimits {
    pub const fn accounts() -> Self {
        Self { daily_limit: 50, cooldown_minutes: 30 }
    }

    pub const fn proxies() -> Self {
        Self { daily_limit: 200, cooldown_minutes: 30 }
    }
}

/// Hourly ceiling enforced by the rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Uses per account per clock hour
    pub hourly_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { hourly_limit: 10 }
    }
}

/// Retry budget and backoff for work items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt
    pub backoff_base_secs: u64,
    /// Upper bound for a single retry delay
    pub backoff_max_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_attempts: 3, backoff_base_secs: 60, backoff_max_secs: 1800 }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Upper bound on simultaneous in-flight dispatches
    pub max_concurrent: usize,
    /// Sleep between idle `run_once()` iterations
    pub poll_interval_ms: u64,
    /// Budget for one scraper call
    pub scrape_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_concurrent: 3, poll_interval_ms: 2000, scrape_timeout_secs: 30 }
    }
}

/// Health scoring and suspension triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Resources below this success rate are suspended
    pub success_rate_floor: f64,
    /// Minimum lifetime uses before triage applies
    pub min_samples: u64,
    /// Share of the score taken by daily headroom; the rest is success rate
    pub utilization_weight: f64,
    /// Background triage interval
    pub evaluate_interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            success_rate_floor: 40.0,
            min_samples: 10,
            utilization_weight: 0.3,
            evaluate_interval_secs: 300,
        }
    }
}

/// Alerting collaborator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Discord-compatible webhook; alerts only go to the log when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// HTTP scraper collaborator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Base URL channel paths are joined onto
    pub base_url: String,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"dispatcher":{"max_concurrent":5,"poll_interval_ms":100,"scrape_timeout_secs":10}}"#)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cfg.dispatcher.max_concurrent, 5);
        assert_eq!(cfg.accounts, PoolLimits::accounts());
        assert_eq!(cfg.proxies.daily_limit, 200);
        assert_eq!(cfg.queue.max_attempts, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut cfg = AppConfig::default();
        cfg.dispatcher.max_concurrent = 0;
        match cfg.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "dispatcher.max_concurrent");
            },
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_timings() {
        let cases: [(&str, fn(&mut AppConfig)); 3] = [
            ("dispatcher.poll_interval_ms", |c| c.dispatcher.poll_interval_ms = 0),
            ("dispatcher.scrape_timeout_secs", |c| c.dispatcher.scrape_timeout_secs = 0),
            ("health.evaluate_interval_secs", |c| c.health.evaluate_interval_secs = 0),
        ];
        for (expected, zero) in cases {
            let mut cfg = AppConfig::default();
            zero(&mut cfg);
            match cfg.validate() {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidValue for {expected}, got {other:?}"),
            }
        }
    }
}
