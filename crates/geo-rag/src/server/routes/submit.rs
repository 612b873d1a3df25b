//! Submission endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::TaskId;

/// Content type assumed when the file part does not declare one
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct SubmitData {
    pub task_id: TaskId,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub data: SubmitData,
}

/// Map a multipart read failure, keeping the body-limit case apart
fn multipart_error(context: &str, err: MultipartError) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(format!("{}: {}", context, err.body_text()))
    } else {
        Error::invalid_input(format!("{}: {}", context, err.body_text()))
    }
}

/// POST /submit_data - Upload one file for asynchronous processing
pub async fn submit_data(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        // The first part carrying a filename is the upload
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        // Reject before buffering the body
        if !state.dispatcher().is_allowed(&content_type) {
            return Err(Error::invalid_input(format!(
                "Invalid file type '{}'. Allowed: {}",
                content_type,
                state.config().server.allowed_content_types.join(", ")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&format!("Failed to read file {}", filename), e))?;

        tracing::info!("Received {} ({} bytes, {})", filename, data.len(), content_type);

        let task_id = state
            .dispatcher()
            .submit(&data, &content_type, &filename)
            .await?;

        return Ok((
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                status: "success",
                data: SubmitData { task_id },
            }),
        ));
    }

    Err(Error::invalid_input("No file provided"))
}
