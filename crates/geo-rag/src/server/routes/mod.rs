//! API routes

pub mod submit;
pub mod summary;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build the task routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Submission, with the upload body limit
        .route(
            "/submit_data",
            post(submit::submit_data).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Polling
        .route("/get_summary/:task_id", get(summary::get_summary))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "geo-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Asynchronous geospatial file summarization",
        "endpoints": {
            "POST /submit_data": "Upload a file (multipart) and receive a task id",
            "GET /get_summary/:task_id": "Poll a task for its summary",
            "GET /health": "Liveness check",
            "GET /ready": "Collaborator health"
        }
    }))
}
