//! Result Cache: `summary:{task_id}` -> summary text

use std::sync::Arc;

use crate::error::Result;
use crate::providers::CacheProvider;
use crate::types::TaskId;

/// Final artifact per task, backed by the key-value cache
#[derive(Clone)]
pub struct ResultCache {
    cache: Arc<dyn CacheProvider>,
}

impl ResultCache {
    pub fn new(cache: Arc<dyn CacheProvider>) -> Self {
        Self { cache }
    }

    /// Cache key of a task's result record
    pub fn key(task_id: &TaskId) -> String {
        format!("summary:{}", task_id)
    }

    /// Store the summary for a completed task
    pub async fn put(&self, task_id: &TaskId, summary: &str) -> Result<()> {
        self.cache.set(&Self::key(task_id), summary).await
    }

    /// Summary for a task, if one was written
    pub async fn get(&self, task_id: &TaskId) -> Result<Option<String>> {
        let summary = self.cache.get(&Self::key(task_id)).await?;
        match &summary {
            Some(_) => tracing::debug!("Result cache hit for {}", task_id),
            None => tracing::debug!("Result cache miss for {}", task_id),
        }
        Ok(summary)
    }
}
