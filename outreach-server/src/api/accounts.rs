//! Account pool handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use outreach_core::{HealthOverview, HealthReport};
use outreach_types::{PoolStats, Resource, UsageLogEntry};

use super::resources::{
    self, CooldownRequest, CooldownResponse, HealthiestResponse, ResourceInfo, StatusUpdateRequest,
};
use super::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddAccountRequest {
    pub username: String,
    pub password: String,
    /// Generated when omitted
    #[serde(default)]
    pub id: Option<String>,
}

pub async fn list_accounts(State(state): State<AppState>) -> Json<Vec<ResourceInfo>> {
    resources::list(state.accounts(), state.health())
}

pub async fn add_account(
    State(state): State<AppState>,
    Json(payload): Json<AddAccountRequest>,
) -> Result<(StatusCode, Json<ResourceInfo>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "username and password are required".to_string()));
    }

    let mut account = Resource::account(username, payload.password);
    if let Some(id) = payload.id {
        account.id = resources::resource_id(id)?;
    }
    resources::add(state.accounts(), state.health(), account)
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::get(state.accounts(), state.health(), &id)
}

pub async fn set_account_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::set_status(state.accounts(), state.health(), &id, payload)
}

pub async fn remove_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::remove(state.accounts(), state.health(), &id)
}

pub async fn cooldown_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<CooldownRequest>>,
) -> Result<Json<CooldownResponse>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    resources::cooldown(state.accounts(), &id, request)
}

pub async fn restore_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResourceInfo>, ApiError> {
    resources::restore(state.accounts(), state.health(), &id)
}

pub async fn get_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HealthReport>, ApiError> {
    resources::health_report(state.accounts(), state.health(), &id)
}

pub async fn get_usage_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UsageLogEntry>>, ApiError> {
    resources::usage_logs(state.accounts(), &id)
}

pub async fn get_healthiest(State(state): State<AppState>) -> Json<HealthiestResponse> {
    resources::healthiest(state.accounts(), state.health())
}

pub async fn monitor_all(State(state): State<AppState>) -> Json<HealthOverview> {
    resources::monitor_all(state.accounts(), state.health())
}

pub async fn get_stats(State(state): State<AppState>) -> Json<PoolStats> {
    resources::stats(state.accounts())
}
