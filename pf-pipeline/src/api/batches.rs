//! Batch endpoints: submission, status polling, export, resume

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Batch, BatchExport, BatchPhase, BatchStatus};
use crate::processor::build_batch_export;
use crate::submit::{submit_batch, BatchSubmission};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub status: BatchStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: Uuid,
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub status: BatchPhase,
    #[serde(rename = "totalTasks")]
    pub total_tasks: i64,
    #[serde(rename = "pendingTasks")]
    pub pending_tasks: i64,
    pub paused: bool,
}

/// POST /batches
pub async fn submit(
    State(state): State<AppState>,
    Json(submission): Json<BatchSubmission>,
) -> ApiResult<Json<SubmitResponse>> {
    let batch = submit_batch(&state.db, submission).await?;

    Ok(Json(SubmitResponse {
        id: batch.id,
        batch_id: batch.external_ref,
        status: batch.status,
    }))
}

/// Resolve a path key as an internal batch id or an external `batchId`
async fn find_batch(state: &AppState, key: &str) -> ApiResult<Batch> {
    if let Ok(id) = key.parse::<Uuid>() {
        if let Some(batch) = db::batches::get_batch(&state.db, id).await? {
            return Ok(batch);
        }
    }

    db::batches::get_batch_by_external_ref(&state.db, key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Batch not found: {}", key)))
}

/// GET /batches/:id/status
///
/// Phase is derived from the batch/task aggregate: `completed` only after
/// the batch's own status flips; `pending` while no task has started.
pub async fn status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let batch = find_batch(&state, &key).await?;

    let (total, pending) = db::tasks::count_by_status(&state.db, batch.id).await?;

    let phase = match batch.status {
        BatchStatus::Completed => BatchPhase::Completed,
        BatchStatus::Pending if pending == total => BatchPhase::Pending,
        BatchStatus::Pending => BatchPhase::Processing,
    };

    let paused = state.processor.pause_registry().is_paused(batch.id).await?;

    Ok(Json(StatusResponse {
        id: batch.id,
        batch_id: batch.external_ref,
        status: phase,
        total_tasks: total,
        pending_tasks: pending,
        paused,
    }))
}

/// GET /batches/:id/export
pub async fn export(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<BatchExport>> {
    let batch = find_batch(&state, &key).await?;

    let export = build_batch_export(&state.db, &batch).await?;
    Ok(Json(export))
}

/// POST /batches/:id/resume
///
/// Administrative: clears the pause entry; queued jobs for the batch start
/// flowing again on their own (they were parked at the tail, not dropped).
pub async fn resume(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let batch = find_batch(&state, &key).await?;
    let cleared = state.processor.pause_registry().resume(batch.id).await?;
    Ok(Json(json!({ "batchId": batch.external_ref, "resumed": cleared })))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batches", post(submit))
        .route("/batches/:id/status", get(status))
        .route("/batches/:id/export", get(export))
        .route("/batches/:id/resume", post(resume))
}
