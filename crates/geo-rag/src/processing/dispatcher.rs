//! Task Dispatcher: turns an upload into a queued task

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{BlobStoreProvider, QueueProvider};
use crate::types::{object_path, TaskId, TaskMessage};

/// Accepts submissions, stores the payload and enqueues the work
#[derive(Clone)]
pub struct TaskDispatcher {
    blob_store: Arc<dyn BlobStoreProvider>,
    queue: Arc<dyn QueueProvider>,
    allowed_content_types: Vec<String>,
}

impl TaskDispatcher {
    pub fn new(
        blob_store: Arc<dyn BlobStoreProvider>,
        queue: Arc<dyn QueueProvider>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            blob_store,
            queue,
            allowed_content_types,
        }
    }

    /// Whether `content_type` (parameters ignored) is on the allow-list
    pub fn is_allowed(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }

    /// Submit a payload for asynchronous processing.
    ///
    /// Nothing is written for a rejected content type. A storage failure
    /// leaves no message behind; a queue failure leaves the stored blob
    /// orphaned.
    pub async fn submit(&self, payload: &[u8], content_type: &str, filename: &str) -> Result<TaskId> {
        if !self.is_allowed(content_type) {
            tracing::warn!("Rejected upload '{}' with content type '{}'", filename, content_type);
            return Err(Error::invalid_input(format!(
                "Invalid file type '{}'. Allowed: {}",
                content_type,
                self.allowed_content_types.join(", ")
            )));
        }

        let task_id = TaskId::new();
        let path = object_path(&task_id, filename);

        self.blob_store
            .put(&path, payload, content_type)
            .await
            .map_err(|e| match e {
                Error::Storage(_) => e,
                other => Error::storage(other.to_string()),
            })?;

        let message = TaskMessage::new(task_id, path.clone());
        if let Err(e) = self.queue.send(&message).await {
            tracing::error!(
                "Failed to enqueue task {}; blob '{}' is orphaned: {}",
                task_id,
                path,
                e
            );
            return Err(match e {
                Error::Dispatch(_) => e,
                other => Error::dispatch(other.to_string()),
            });
        }

        tracing::info!(
            "Submitted task {} ({} bytes, {}) via {}",
            task_id,
            payload.len(),
            path,
            self.queue.name()
        );
        Ok(task_id)
    }
}
