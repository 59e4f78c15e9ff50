use chrono::{Duration, TimeZone, Utc};

use super::RateLimiter;

#[test]
fn test_allows_until_ceiling() {
    let limiter = RateLimiter::new(3);
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 15, 0).unwrap();

    for _ in 0..3 {
        assert!(limiter.allow_at("acc-1", now));
        limiter.record_at("acc-1", now);
    }
    assert!(!limiter.allow_at("acc-1", now));
    assert_eq!(limiter.usage_at("acc-1", now), 3);

    // Other resources have their own bucket
    assert!(limiter.allow_at("acc-2", now));
}

#[test]
fn test_bucket_resets_on_hour_boundary() {
    let limiter = RateLimiter::new(2);
    let late = Utc.with_ymd_and_hms(2026, 5, 1, 10, 59, 59).unwrap();

    limiter.record_at("acc", late);
    limiter.record_at("acc", late);
    assert!(!limiter.allow_at("acc", late));

    // One second later a fresh bucket opens: the documented 2x burst
    let next = late + Duration::seconds(1);
    assert!(limiter.allow_at("acc", next));
    limiter.record_at("acc", next);
    assert_eq!(limiter.usage_at("acc", next), 1);
}

#[test]
fn test_remaining_and_unknown_resource() {
    let limiter = RateLimiter::new(10);
    assert_eq!(limiter.remaining("never-seen"), 10);
    limiter.record("acc");
    assert_eq!(limiter.remaining("acc"), 9);
}

#[test]
fn test_cleanup_expired_drops_old_buckets() {
    let limiter = RateLimiter::new(10);
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();

    limiter.record_at("old", now - Duration::hours(2));
    limiter.record_at("current", now);

    assert_eq!(limiter.cleanup_expired_at(now), 1);
    assert_eq!(limiter.usage_at("current", now), 1);
    assert_eq!(limiter.cleanup_expired_at(now), 0);
}
