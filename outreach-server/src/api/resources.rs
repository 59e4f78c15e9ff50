//! Pool handlers shared by `/api/accounts` and `/api/proxies`.

use axum::{http::StatusCode, response::Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use outreach_core::{HealthMonitor, HealthOverview, HealthReport, ResourcePool};
use outreach_types::{PoolError, PoolStats, Resource, ResourceKind, ResourceStatus, UsageLogEntry};

use super::{pool_error, ApiError};

/// Resource as shown to operators. Credentials never leave the server.
#[derive(Debug, Serialize)]
pub struct ResourceInfo {
    pub id: String,
    pub kind: ResourceKind,
    pub address: String,
    pub status: ResourceStatus,
    pub leased: bool,
    pub daily_requests: u32,
    pub daily_limit: u32,
    pub total_requests: u64,
    pub success_rate: f64,
    pub health_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ResourceInfo {
    pub fn new(resource: &Resource, pool: &ResourcePool, health: &HealthMonitor) -> Self {
        let daily_limit = pool.daily_limit();
        Self {
            id: resource.id.clone(),
            kind: resource.kind(),
            address: resource.address.to_string(),
            status: resource.status,
            leased: resource.is_leased(),
            daily_requests: resource.daily_request_count,
            daily_limit,
            total_requests: resource.total_request_count,
            success_rate: resource.success_rate,
            health_score: health.score(resource, daily_limit),
            last_used_at: resource.last_used_at,
            cooldown_until: resource.cooldown_until,
            last_error: resource.last_error.clone(),
        }
    }
}

/// Caller-chosen ids must be usable as a single path segment.
pub fn resource_id(id: String) -> Result<String, ApiError> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err((StatusCode::BAD_REQUEST, format!("invalid resource id '{id}'")));
    }
    Ok(trimmed.to_string())
}

pub fn list(pool: &ResourcePool, health: &HealthMonitor) -> Json<Vec<ResourceInfo>> {
    Json(pool.list().iter().map(|r| ResourceInfo::new(r, pool, health)).collect())
}

pub fn add(
    pool: &ResourcePool,
    health: &HealthMonitor,
    resource: Resource,
) -> Result<(StatusCode, Json<ResourceInfo>), ApiError> {
    let added = pool.add(resource).map_err(pool_error)?;
    tracing::info!("[API] Added {} {}", added.kind(), added.id);
    Ok((StatusCode::CREATED, Json(ResourceInfo::new(&added, pool, health))))
}

pub fn get(
    pool: &ResourcePool,
    health: &HealthMonitor,
    id: &str,
) -> Result<Json<ResourceInfo>, ApiError> {
    let resource = pool
        .get(id)
        .ok_or_else(|| pool_error(PoolError::NotFound { id: id.to_string() }))?;
    Ok(Json(ResourceInfo::new(&resource, pool, health)))
}

pub fn remove(
    pool: &ResourcePool,
    health: &HealthMonitor,
    id: &str,
) -> Result<Json<ResourceInfo>, ApiError> {
    let removed = pool.remove(id).map_err(pool_error)?;
    tracing::info!("[API] Removed {} {}", removed.kind(), removed.id);
    Ok(Json(ResourceInfo::new(&removed, pool, health)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CooldownRequest {
    /// Defaults to the pool's configured cooldown
    pub minutes: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CooldownResponse {
    pub id: String,
    pub cooldown_until: DateTime<Utc>,
}

pub fn cooldown(
    pool: &ResourcePool,
    id: &str,
    request: CooldownRequest,
) -> Result<Json<CooldownResponse>, ApiError> {
    let duration = match request.minutes {
        Some(minutes) => i64::try_from(minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .ok_or_else(|| {
                (StatusCode::BAD_REQUEST, format!("cooldown of {minutes} minutes is too long"))
            })?,
        None => pool.cooldown_duration(),
    };
    let cooldown_until = pool.cooldown(id, duration).map_err(pool_error)?;
    Ok(Json(CooldownResponse { id: id.to_string(), cooldown_until }))
}

pub fn restore(
    pool: &ResourcePool,
    health: &HealthMonitor,
    id: &str,
) -> Result<Json<ResourceInfo>, ApiError> {
    let restored = pool.restore(id).map_err(pool_error)?;
    Ok(Json(ResourceInfo::new(&restored, pool, health)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ResourceStatus,
}

pub fn set_status(
    pool: &ResourcePool,
    health: &HealthMonitor,
    id: &str,
    request: StatusUpdateRequest,
) -> Result<Json<ResourceInfo>, ApiError> {
    let updated = pool.set_status(id, request.status).map_err(pool_error)?;
    tracing::info!("[API] {} {} status set to {}", updated.kind(), updated.id, updated.status);
    Ok(Json(ResourceInfo::new(&updated, pool, health)))
}

pub fn health_report(
    pool: &ResourcePool,
    health: &HealthMonitor,
    id: &str,
) -> Result<Json<HealthReport>, ApiError> {
    let resource = pool
        .get(id)
        .ok_or_else(|| pool_error(PoolError::NotFound { id: id.to_string() }))?;
    Ok(Json(health.check(&resource, pool.daily_limit())))
}

pub fn usage_logs(pool: &ResourcePool, id: &str) -> Result<Json<Vec<UsageLogEntry>>, ApiError> {
    pool.usage_logs(id).map(Json).map_err(pool_error)
}

#[derive(Debug, Serialize)]
pub struct HealthiestResponse {
    pub found: bool,
    #[serde(flatten)]
    pub resource: Option<ResourceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn healthiest(pool: &ResourcePool, health: &HealthMonitor) -> Json<HealthiestResponse> {
    let response = match health.healthiest(pool) {
        Some(resource) => HealthiestResponse {
            found: true,
            resource: Some(ResourceInfo::new(&resource, pool, health)),
            message: None,
        },
        None => HealthiestResponse {
            found: false,
            resource: None,
            message: Some(format!("No {} currently available", pool.kind())),
        },
    };
    Json(response)
}

pub fn monitor_all(pool: &ResourcePool, health: &HealthMonitor) -> Json<HealthOverview> {
    Json(health.overview(pool))
}

pub fn stats(pool: &ResourcePool) -> Json<PoolStats> {
    Json(pool.stats())
}
