//! Error types for the geospatial task pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::processing::PipelineStage;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed task id or disallowed content type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload larger than the configured body limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Blob store put/get failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Queue enqueue failure after the payload was stored
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Worker-side failure, tagged with the step that failed
    #[error("Pipeline failed at {stage}: {message}")]
    Pipeline {
        stage: PipelineStage,
        message: String,
    },

    /// Task reached the failed state; the cause is only in the worker logs
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Task has neither a status nor a result record
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Key-value cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// Summarizer/LLM error
    #[error("Summarizer error: {0}")]
    Summarizer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation exceeded its deadline
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch(message.into())
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create a summarizer error
    pub fn summarizer(message: impl Into<String>) -> Self {
        Self::Summarizer(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wrap any error as a pipeline failure at `stage`.
    ///
    /// An error that is already a pipeline failure keeps its original stage.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            Error::Pipeline { .. } => self,
            other => Error::Pipeline {
                stage,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Cache(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg.clone()),
            Error::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg.clone())
            }
            Error::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Task not found: {}", id),
            ),
            Error::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg.clone()),
            Error::Dispatch(msg) => (StatusCode::SERVICE_UNAVAILABLE, "dispatch_error", msg.clone()),
            Error::Pipeline { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing_failed",
                "Processing failed.".to_string(),
            ),
            Error::TaskFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing_failed",
                "Processing failed.".to_string(),
            ),
            Error::Cache(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "cache_error", msg.clone()),
            Error::Embedding(msg) => (StatusCode::BAD_GATEWAY, "embedding_error", msg.clone()),
            Error::VectorIndex(msg) => (StatusCode::BAD_GATEWAY, "vector_index_error", msg.clone()),
            Error::Summarizer(msg) => (StatusCode::BAD_GATEWAY, "summarizer_error", msg.clone()),
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!("Timed out after {}s", secs),
            ),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (Error::invalid_input("bad id"), StatusCode::BAD_REQUEST),
            (Error::PayloadTooLarge("big".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::dispatch("queue down"), StatusCode::SERVICE_UNAVAILABLE),
            (Error::TaskFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_at_stage_keeps_first_stage() {
        let err = Error::embedding("model offline").at_stage(PipelineStage::Embed);
        let err = err.at_stage(PipelineStage::Summarize);
        match err {
            Error::Pipeline { stage, message } => {
                assert_eq!(stage, PipelineStage::Embed);
                assert!(message.contains("model offline"));
            }
            other => panic!("expected pipeline error, got {:?}", other),
        }
    }
}
