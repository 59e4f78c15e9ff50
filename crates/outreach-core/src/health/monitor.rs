//! Health monitor implementation.

use chrono::{DateTime, Utc};
use outreach_types::models::HealthConfig;
use outreach_types::{Resource, ResourceStatus};

use super::types::{HealthMetrics, HealthOverview, HealthReport};
use crate::pool::ResourcePool;

/// Utilization at which a resource is reported as close to its daily cap.
const NEAR_LIMIT_UTILIZATION: f64 = 0.9;

/// Scores resources and suspends the ones that keep failing.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    config: HealthConfig,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Deterministic health score in 0..=100.
    /// Increases with success rate, decreases with daily utilization.
    pub fn score(&self, resource: &Resource, daily_limit: u32) -> f64 {
        let weight = self.config.utilization_weight.clamp(0.0, 1.0);
        let utilization = resource.utilization(daily_limit);
        let score = (1.0 - weight) * resource.success_rate + weight * 100.0 * (1.0 - utilization);
        score.clamp(0.0, 100.0)
    }

    /// Whether a resource has enough history and a success rate under the floor.
    pub fn is_failing(&self, resource: &Resource) -> bool {
        resource.total_request_count >= self.config.min_samples
            && resource.success_rate < self.config.success_rate_floor
    }

    /// Highest-scoring resource among those `active` and free. Ties go to the
    /// smaller id.
    pub fn healthiest(&self, pool: &ResourcePool) -> Option<Resource> {
        let limit = pool.daily_limit();
        pool.list()
            .into_iter()
            .filter(|r| r.status == ResourceStatus::Active && !r.is_leased())
            .map(|r| (self.score(&r, limit), r))
            .max_by(|(sa, a), (sb, b)| sa.total_cmp(sb).then_with(|| b.id.cmp(&a.id)))
            .map(|(_, r)| r)
    }

    /// Suspend every active resource that is failing. Returns suspended ids.
    pub fn evaluate_and_flag(&self, pool: &ResourcePool) -> Vec<String> {
        let reason = format!("success rate below {:.0}%", self.config.success_rate_floor);
        let suspended = pool.suspend_matching(|r| self.is_failing(r), &reason);
        if !suspended.is_empty() {
            tracing::warn!(kind = %pool.kind(), count = suspended.len(), "Health triage suspended resources");
        }
        suspended
    }

    /// Re-evaluate one resource after a failed use. Returns true if it was suspended.
    pub fn evaluate_resource(&self, pool: &ResourcePool, id: &str) -> bool {
        let reason = format!("success rate below {:.0}%", self.config.success_rate_floor);
        !pool.suspend_matching(|r| r.id == id && self.is_failing(r), &reason).is_empty()
    }

    pub fn check(&self, resource: &Resource, daily_limit: u32) -> HealthReport {
        self.check_at(resource, daily_limit, Utc::now())
    }

    pub fn check_at(&self, resource: &Resource, daily_limit: u32, now: DateTime<Utc>) -> HealthReport {
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        let utilization = resource.utilization(daily_limit);

        match resource.status {
            ResourceStatus::Active => {},
            ResourceStatus::Cooldown => {
                let until = resource
                    .cooldown_until
                    .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
                issues.push(format!("Cooling down until {until}"));
                recommendations.push("Wait for the cooldown to expire before reuse".to_string());
            },
            ResourceStatus::Suspended => {
                issues.push("Suspended by health triage".to_string());
                recommendations.push("Review the last error, then restore manually".to_string());
            },
            ResourceStatus::Disabled => {
                issues.push("Permanently disabled".to_string());
                recommendations.push("Replace this resource".to_string());
            },
        }

        if self.is_failing(resource) {
            issues.push(format!("Low success rate: {:.1}%", resource.success_rate));
            recommendations.push("Check credentials and egress for repeated failures".to_string());
        }

        if utilization >= NEAR_LIMIT_UTILIZATION {
            issues.push(format!(
                "Near daily limit ({}/{})",
                resource.daily_request_count, daily_limit
            ));
            recommendations.push("Add more resources to spread the daily load".to_string());
        }

        HealthReport {
            resource_id: resource.id.clone(),
            address: resource.address.to_string(),
            healthy: issues.is_empty(),
            status: resource.status,
            score: self.score(resource, daily_limit),
            issues,
            recommendations,
            metrics: HealthMetrics {
                success_rate: resource.success_rate,
                daily_requests: resource.daily_request_count,
                daily_limit,
                total_requests: resource.total_request_count,
                utilization,
            },
            last_error: resource.last_error.clone(),
            last_check: now,
        }
    }

    pub fn overview(&self, pool: &ResourcePool) -> HealthOverview {
        let now = Utc::now();
        let limit = pool.daily_limit();
        let resources = pool.list_at(now);
        let reports: Vec<HealthReport> = resources.iter().map(|r| self.check_at(r, limit, now)).collect();

        let total = reports.len();
        let healthy = reports.iter().filter(|r| r.healthy).count();
        let count = |status: ResourceStatus| reports.iter().filter(|r| r.status == status).count();
        let disabled = count(ResourceStatus::Disabled);
        let cooldown = count(ResourceStatus::Cooldown);
        let suspended = count(ResourceStatus::Suspended);

        let overall_health_score = if total == 0 { 0.0 } else { healthy as f64 / total as f64 * 100.0 };

        let kind = pool.kind();
        let mut recommendations = Vec::new();
        if total == 0 {
            recommendations.push(format!("No {kind} resources registered; add some to start processing"));
        } else if healthy == 0 {
            recommendations.push(format!("No healthy {kind} resources; processing is stalled"));
        } else if overall_health_score < 50.0 {
            recommendations.push(format!("Less than half of {kind} resources are healthy"));
        }
        if suspended > 0 {
            recommendations.push(format!("{suspended} suspended {kind} resource(s) await review"));
        }
        if disabled > 0 {
            recommendations.push(format!("Replace {disabled} disabled {kind} resource(s)"));
        }

        let needs_attention = reports
            .into_iter()
            .filter(|r| !r.healthy && r.status != ResourceStatus::Disabled)
            .collect();

        HealthOverview {
            kind,
            total,
            healthy,
            unhealthy: total - healthy,
            disabled,
            cooldown,
            suspended,
            needs_attention,
            overall_health_score,
            recommendations,
            timestamp: now,
        }
    }
}
