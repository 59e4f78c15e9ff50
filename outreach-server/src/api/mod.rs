//! API Routes
//!
//! Operator REST API over the pools, the work queue and the dispatcher.
//! Exhaustion is never an HTTP error: "no resource available" answers are
//! `200` with `found: false`.

mod accounts;
mod proxies;
mod queue;
mod resources;


use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use outreach_core::ProcessingStatus;
use outreach_types::{PoolError, PoolStats, QueueError, QueueStats};

use crate::state::AppState;

/// Handler error: status code plus a plain message.
pub type ApiError = (StatusCode, String);

pub fn router() -> Router<AppState> {
    Router::new()
        // Status
        .route("/status", get(get_status))
        // Accounts
        .route("/accounts", get(accounts::list_accounts).post(accounts::add_account))
        .route("/accounts/stats", get(accounts::get_stats))
        .route("/accounts/healthiest", get(accounts::get_healthiest))
        .route("/accounts/health/monitor-all", get(accounts::monitor_all))
        .route("/accounts/:id", get(accounts::get_account).delete(accounts::remove_account))
        .route("/accounts/:id/status", put(accounts::set_account_status))
        .route("/accounts/:id/cooldown", post(accounts::cooldown_account))
        .route("/accounts/:id/restore", post(accounts::restore_account))
        .route("/accounts/:id/health", get(accounts::get_health))
        .route("/accounts/:id/usage-logs", get(accounts::get_usage_logs))
        // Proxies
        .route("/proxies", get(proxies::list_proxies).post(proxies::add_proxy))
        .route("/proxies/bulk", post(proxies::add_proxies_bulk))
        .route("/proxies/stats", get(proxies::get_stats))
        .route("/proxies/healthiest", get(proxies::get_healthiest))
        .route("/proxies/health/monitor-all", get(proxies::monitor_all))
        .route("/proxies/:id", get(proxies::get_proxy).delete(proxies::remove_proxy))
        .route("/proxies/:id/status", put(proxies::set_proxy_status))
        .route("/proxies/:id/cooldown", post(proxies::cooldown_proxy))
        .route("/proxies/:id/restore", post(proxies::restore_proxy))
        .route("/proxies/:id/health", get(proxies::get_health))
        .route("/proxies/:id/usage-logs", get(proxies::get_usage_logs))
        // Queue
        .route("/queue", get(queue::list_items).post(queue::enqueue))
        .route("/queue/batch", post(queue::enqueue_batch))
        .route("/queue/stats", get(queue::get_stats))
        .route("/queue/error-analysis", get(queue::get_error_analysis))
        .route("/queue/processing-status", get(queue::get_processing_status))
        .route("/queue/retry-failed", post(queue::retry_failed))
        .route("/queue/:id", get(queue::get_item).delete(queue::delete_item))
        // API fallback: return 404 for unknown API endpoints
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Not found"})))
}

pub(crate) fn pool_error(e: PoolError) -> ApiError {
    let status = match &e {
        PoolError::NotFound { .. } => StatusCode::NOT_FOUND,
        PoolError::AlreadyExists { .. }
        | PoolError::Leased { .. }
        | PoolError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PoolError::InvalidAddress { .. } => StatusCode::BAD_REQUEST,
        PoolError::InvariantViolation { .. } => {
            tracing::error!("[API] {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        },
    };
    (status, e.to_string())
}

pub(crate) fn queue_error(e: QueueError) -> ApiError {
    let status = match &e {
        QueueError::NotFound { .. } => StatusCode::NOT_FOUND,
        QueueError::InvalidPriority { .. } | QueueError::EmptyTarget => StatusCode::BAD_REQUEST,
        QueueError::InFlight { .. } => StatusCode::CONFLICT,
        QueueError::InvariantViolation { .. } => {
            tracing::error!("[API] {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        },
    };
    (status, e.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub accounts: PoolStats,
    pub proxies: PoolStats,
    pub queue: QueueStats,
    pub processing: ProcessingStatus,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        accounts: state.accounts().stats(),
        proxies: state.proxies().stats(),
        queue: state.queue().stats(),
        processing: state.dispatcher().processing_status(),
    })
}
