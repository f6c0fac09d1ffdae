//! Webhook receiver: asynchronous provider completions
//!
//! Providers that answer out-of-band POST their final result here with the
//! ledger entry and task ids they were given at call time. Deliveries are
//! idempotent; duplicates for a finalized task are acknowledged and ignored.

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::processor::WebhookDisposition;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookParams {
    /// Ledger entry id handed to the provider
    pub id: i64,
    #[serde(rename = "taskId")]
    pub task_id: Uuid,
}

/// POST /webhook?id={ledger_id}&taskId={task_id}
pub async fn receive(
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Value>> {
    let disposition = state
        .processor
        .handle_webhook(params.id, params.task_id, payload)
        .await?;

    let result = match disposition {
        WebhookDisposition::Finalized => "finalized",
        WebhookDisposition::Ignored => "ignored",
        WebhookDisposition::Requeued => "requeued",
    };

    Ok(Json(json!({ "result": result })))
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(receive))
}
