//! Proxy pool handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use outreach_core::pool::parse_proxy_address;
use outreach_core::{HealthOverview, HealthReport};
use outreach_types::{PoolStats, Resource, UsageLogEntry};

use super::resources::{
    self, CooldownRequest, CooldownResponse, HealthiestResponse, ResourceInfo, StatusUpdateRequest,
};
use super::{pool_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddProxyRequest {
    /// `scheme://[user:pass@]host:port`, `ip:port` or `ip:port:user:pass`
    pub address: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkAddProxiesRequest {
    pub addresses: Vec<String>,
}

#[derive(Serialize)]
pub struct BulkAddProxiesResponse {
    pub added: Vec<String>,
    pub rejected: Vec<String>,
}

pub async fn list_proxies(State(state): State<AppState>) -> Json<Vec<ResourceInfo>> {
    resources::list(state.proxies(), state.health())
}

pub async fn add_proxy(
    State(state): State<AppState>,
    Json(payload): Json<AddProxyRequest>,
) -> Result<(StatusCode, Json<ResourceInfo>), ApiError> {
    let address = parse_proxy_address(&payload.address).map_err(pool_error)?;
    let mut proxy = Resource::proxy(address);
    if let Some(id) = payload.id {
        proxy.id = resources::resource_id(id)?;
    }
    resources::add(state.proxies(), state.health(), proxy)
}

/// Add many proxies at once; one bad line does not reject the rest.
pub async fn add_proxies_bulk(
    State(state): State<AppState>,
    Json(payload): Json<BulkAddProxiesRequest>,
) -> Json<BulkAddProxiesResponse> {
    let mut response = BulkAddProxiesResponse { added: Vec::new(), rejected: Vec::new() };
    for raw in payload.addresses.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        let added = parse_proxy_address(raw).and_then(|addr| state.proxies().add(Resource::proxy(addr)));
        match added {
            Ok(proxy) => response.added.push(proxy.id),
            Err(e) => {
                tracing::warn!("[API] Rejected proxy: {}", e);
                response.rejected.push(raw.to_string());
            },
        }
    }
    tracing::info!(
        "[API] Bulk proxy import: {} added, {} rejected",
        response.added.len(),
        response.rejected.len()
    );
    Json(response)
}

pub async fn get_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::get(state.proxies(), state.health(), &id)
}

pub async fn set_proxy_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::set_status(state.proxies(), state.health(), &id, payload)
}

pub async fn remove_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::remove(state.proxies(), state.health(), &id)
}

pub async fn cooldown_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<CooldownRequest>>,
) -> Result<Json<CooldownResponse>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    resources::cooldown(state.proxies(), &id, request)
}

pub async fn restore_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::restore(state.proxies(), state.health(), &id)
}

pub async fn get_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HealthReport>, ApiError> {
    resources::health_report(state.proxies(), state.health(), &id)
}

pub async fn get_usage_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UsageLogEntry>>, ApiError> {
    resources::usage_logs(state.proxies(), &id)
}

pub async fn get_healthiest(State(state): State<AppState>) -> Json<HealthiestResponse> {
    resources::healthiest(state.proxies(), state.health())
}

pub async fn monitor_all(State(state): State<AppState>) -> Json<HealthOverview> {
    resources::monitor_all(state.proxies(), state.health())
}

pub async fn get_stats(State(state): State<AppState>) -> Json<PoolStats> {
    resources::stats(state.proxies())
}
