//! Resource health scoring and triage.
//!
//! The monitor holds no state of its own; it reads pool snapshots and asks the
//! pool to perform the `active -> suspended` transition under its lock.
//!
//! ```text
//! score = (1 - w) * success_rate + w * 100 * (1 - utilization)
//! ```
//!
//! with `w = utilization_weight` (default 0.3). Success rate dominates;
//! heavily used resources lose ground so load spreads.

mod monitor;
mod types;

#[cfg(test)]
mod tests;

pub use monitor::HealthMonitor;
pub use types::{HealthMetrics, HealthOverview, HealthReport};
