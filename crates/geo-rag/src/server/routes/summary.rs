//! Polling endpoint

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::TaskStatus;

/// GET /get_summary/:task_id - Report a task's status or summary
pub async fn get_summary(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    let (task_id, status) = state.query().get_status(&raw_id).await?;

    let response = match status {
        TaskStatus::Completed { summary } => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": { "task_id": task_id, "summary": summary }
            })),
        )
            .into_response(),
        TaskStatus::Processing => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "processing",
                "data": { "task_id": task_id, "status": "Processing" }
            })),
        )
            .into_response(),
        TaskStatus::Failed => Error::TaskFailed(task_id.to_string()).into_response(),
        TaskStatus::NotFound => Error::NotFound(task_id.to_string()).into_response(),
    };

    Ok(response)
}
