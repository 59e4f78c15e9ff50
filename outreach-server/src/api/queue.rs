//! Work queue handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use outreach_core::ProcessingStatus;
use outreach_types::{ErrorAnalysis, NewWorkItem, QueueStats, WorkItem, WorkItemState};

use super::{queue_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub id: String,
}

pub async fn enqueue(
    State(state): State<AppState>,
    Json(payload): Json<NewWorkItem>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    let id = state.queue().enqueue(payload).map_err(queue_error)?;
    Ok((StatusCode::CREATED, Json(EnqueueResponse { id })))
}

#[derive(Deserialize)]
pub struct BatchEnqueueRequest {
    pub items: Vec<NewWorkItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchEnqueueResponse {
    pub accepted: usize,
    pub rejected: usize,
    /// One entry per submitted item, in order
    pub results: Vec<BatchItemResult>,
}

pub async fn enqueue_batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchEnqueueRequest>,
) -> Json<BatchEnqueueResponse> {
    let results: Vec<BatchItemResult> = state
        .queue()
        .enqueue_batch(payload.items)
        .into_iter()
        .map(|r| match r {
            Ok(id) => BatchItemResult { id: Some(id), error: None },
            Err(e) => BatchItemResult { id: None, error: Some(e.to_string()) },
        })
        .collect();
    let accepted = results.iter().filter(|r| r.id.is_some()).count();

    Json(BatchEnqueueResponse { accepted, rejected: results.len() - accepted, results })
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub state: Option<WorkItemState>,
    pub limit: Option<usize>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<WorkItem>> {
    let mut items = state.queue().list(query.state);
    if let Some(limit) = query.limit {
        items.truncate(limit);
    }
    Json(items)
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkItem>, ApiError> {
    state
        .queue()
        .get(&id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Work item not found: {id}")))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkItem>, ApiError> {
    let removed = state.queue().delete(&id).map_err(queue_error)?;
    tracing::info!("[API] Deleted work item {}", id);
    Ok(Json(removed))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.queue().stats())
}

pub async fn get_error_analysis(State(state): State<AppState>) -> Json<ErrorAnalysis> {
    Json(state.queue().error_analysis())
}

pub async fn get_processing_status(State(state): State<AppState>) -> Json<ProcessingStatus> {
    Json(state.dispatcher().processing_status())
}

#[derive(Debug, Serialize)]
pub struct RetryFailedResponse {
    pub requeued: usize,
}

pub async fn retry_failed(State(state): State<AppState>) -> Json<RetryFailedResponse> {
    let requeued = state.dispatcher().retry_failed();
    tracing::info!("[API] Requeued {} failed work items", requeued);
    Json(RetryFailedResponse { requeued })
}
