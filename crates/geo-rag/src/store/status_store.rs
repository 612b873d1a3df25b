//! Status Store: `status:{task_id}` -> lifecycle state

use std::sync::Arc;

use crate::error::Result;
use crate::providers::CacheProvider;
use crate::types::{TaskId, TaskState};

/// Lifecycle state per task, backed by the key-value cache
#[derive(Clone)]
pub struct StatusStore {
    cache: Arc<dyn CacheProvider>,
}

impl StatusStore {
    pub fn new(cache: Arc<dyn CacheProvider>) -> Self {
        Self { cache }
    }

    /// Cache key of a task's status record
    pub fn key(task_id: &TaskId) -> String {
        format!("status:{}", task_id)
    }

    async fn set(&self, task_id: &TaskId, state: TaskState) -> Result<()> {
        self.cache.set(&Self::key(task_id), state.as_str()).await?;
        tracing::debug!("Task {} -> {}", task_id, state);
        Ok(())
    }

    /// Record worker pickup
    pub async fn mark_processing(&self, task_id: &TaskId) -> Result<()> {
        self.set(task_id, TaskState::Processing).await
    }

    /// Record successful completion
    pub async fn mark_completed(&self, task_id: &TaskId) -> Result<()> {
        self.set(task_id, TaskState::Completed).await
    }

    /// Record pipeline failure
    pub async fn mark_failed(&self, task_id: &TaskId) -> Result<()> {
        self.set(task_id, TaskState::Failed).await
    }

    /// Current state, `None` when there is no (recognisable) record
    pub async fn get(&self, task_id: &TaskId) -> Result<Option<TaskState>> {
        let raw = self.cache.get(&Self::key(task_id)).await?;
        Ok(raw.and_then(|value| {
            let state = TaskState::from_stored(&value);
            if state.is_none() {
                tracing::warn!("Ignoring unrecognised status '{}' for task {}", value, task_id);
            }
            state
        }))
    }
}
