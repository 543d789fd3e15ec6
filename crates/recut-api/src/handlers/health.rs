//! Health and readiness probes.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Ready when the queue backend answers.
pub async fn ready(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let backlog = state.queue.len().await?;
    Ok(Json(json!({"status": "ready", "queue_backlog": backlog})))
}
