use chrono::Duration;
use outreach_types::models::QueueConfig;

/// Exponential retry delay: `base * 2^(attempts - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_secs: u64,
    max_secs: u64,
}

impl BackoffPolicy {
    pub const fn new(base_secs: u64, max_secs: u64) -> Self {
        Self { base_secs, max_secs }
    }

    pub const fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.backoff_base_secs, config.backoff_max_secs)
    }

    /// Delay before the next try, given how many attempts were already made.
    pub fn delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(32);
        let secs = self.base_secs.saturating_mul(1_u64 << exponent).min(self.max_secs);
        i64::try_from(secs).ok().and_then(Duration::try_seconds).unwrap_or(Duration::MAX)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}
