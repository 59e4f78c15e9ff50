//! Per-resource hourly request ceiling.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const SECONDS_PER_HOUR: i64 = 3600;

fn hour_of(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(SECONDS_PER_HOUR)
}

#[derive(Debug, Clone, Copy)]
struct HourBucket {
    hour: i64,
    count: u32,
}

/// Counts successful uses per resource in fixed, wall-clock hour buckets.
///
/// Buckets reset at the top of each UTC hour rather than sliding. A resource
/// can therefore use its full ceiling at 10:59 and again at 11:00, so up to
/// 2x `hourly_limit` requests may land within any 60-minute window that spans
/// a bucket boundary.
///
/// `allow()` and `record()` are separate calls; the dispatcher holds its claim
/// lock across `allow()` and records only after a successful use.
pub struct RateLimiter {
    hourly_limit: u32,
    buckets: DashMap<String, HourBucket>,
}

impl RateLimiter {
    pub fn new(hourly_limit: u32) -> Self {
        Self { hourly_limit, buckets: DashMap::new() }
    }

    pub fn hourly_limit(&self) -> u32 {
        self.hourly_limit
    }

    /// Whether the resource is below its ceiling for the current hour.
    pub fn allow(&self, resource_id: &str) -> bool {
        self.allow_at(resource_id, Utc::now())
    }

    pub fn allow_at(&self, resource_id: &str, now: DateTime<Utc>) -> bool {
        let allowed = self.usage_at(resource_id, now) < self.hourly_limit;
        if !allowed {
            tracing::debug!(resource_id, limit = self.hourly_limit, "Hourly ceiling reached");
        }
        allowed
    }

    /// Count one successful use.
    pub fn record(&self, resource_id: &str) {
        self.record_at(resource_id, Utc::now());
    }

    pub fn record_at(&self, resource_id: &str, now: DateTime<Utc>) {
        let hour = hour_of(now);
        let mut bucket =
            self.buckets.entry(resource_id.to_string()).or_insert(HourBucket { hour, count: 0 });
        if bucket.hour != hour {
            *bucket = HourBucket { hour, count: 0 };
        }
        bucket.count = bucket.count.saturating_add(1);
    }

    /// Uses recorded in the current hour bucket.
    pub fn usage(&self, resource_id: &str) -> u32 {
        self.usage_at(resource_id, Utc::now())
    }

    pub fn usage_at(&self, resource_id: &str, now: DateTime<Utc>) -> u32 {
        let hour = hour_of(now);
        self.buckets
            .get(resource_id)
            .filter(|bucket| bucket.hour == hour)
            .map_or(0, |bucket| bucket.count)
    }

    pub fn remaining(&self, resource_id: &str) -> u32 {
        self.hourly_limit.saturating_sub(self.usage(resource_id))
    }

    /// Drop buckets from past hours. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let hour = hour_of(now);
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.hour == hour);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(removed, "Expired rate limit buckets cleaned up");
        }
        removed
    }
}
