use chrono::{DateTime, Utc};
use outreach_types::{ResourceKind, ResourceStatus};
use serde::{Deserialize, Serialize};

/// Raw numbers behind a health verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub success_rate: f64,
    pub daily_requests: u32,
    pub daily_limit: u32,
    pub total_requests: u64,
    pub utilization: f64,
}

/// Health check result for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub resource_id: String,
    /// Display form of the address, credentials omitted
    pub address: String,
    pub healthy: bool,
    pub status: ResourceStatus,
    pub score: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: HealthMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_check: DateTime<Utc>,
}

/// Pool-wide health summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthOverview {
    pub kind: ResourceKind,
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub disabled: usize,
    pub cooldown: usize,
    pub suspended: usize,
    /// Unhealthy resources that are not permanently disabled
    pub needs_attention: Vec<HealthReport>,
    /// Percentage of healthy resources, 0 for an empty pool
    pub overall_health_score: f64,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
