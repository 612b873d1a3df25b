//! Status Query Service: read-side reconciliation of task records

use crate::error::Result;
use crate::store::{ResultCache, StatusStore};
use crate::types::{TaskId, TaskState, TaskStatus};

/// Answers status polls; never writes either store
#[derive(Clone)]
pub struct StatusQueryService {
    status: StatusStore,
    results: ResultCache,
}

impl StatusQueryService {
    pub fn new(status: StatusStore, results: ResultCache) -> Self {
        Self { status, results }
    }

    /// Parse `raw` and report the task's observable status.
    ///
    /// A result record wins over whatever the status record says.
    pub async fn get_status(&self, raw: &str) -> Result<(TaskId, TaskStatus)> {
        let task_id = TaskId::parse(raw)?;
        let status = self.lookup(&task_id).await?;
        Ok((task_id, status))
    }

    /// Status of an already-parsed id
    pub async fn lookup(&self, task_id: &TaskId) -> Result<TaskStatus> {
        if let Some(summary) = self.results.get(task_id).await? {
            return Ok(TaskStatus::Completed { summary });
        }

        let status = match self.status.get(task_id).await? {
            Some(TaskState::Processing) => TaskStatus::Processing,
            Some(TaskState::Failed) => TaskStatus::Failed,
            Some(TaskState::Completed) => {
                tracing::warn!("Task {} is completed but its result record is missing", task_id);
                TaskStatus::NotFound
            }
            None => TaskStatus::NotFound,
        };
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::memory::MemoryCache;
    use std::sync::Arc;

    fn service() -> (StatusQueryService, StatusStore, ResultCache) {
        let cache = Arc::new(MemoryCache::new());
        let status = StatusStore::new(cache.clone());
        let results = ResultCache::new(cache);
        (
            StatusQueryService::new(status.clone(), results.clone()),
            status,
            results,
        )
    }

    #[tokio::test]
    async fn test_malformed_id_is_invalid_input() {
        let (service, _, _) = service();
        assert!(matches!(
            service.get_status("not-a-uuid").await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (service, _, _) = service();
        let (_, status) = service.get_status(&TaskId::new().to_string()).await.unwrap();
        assert_eq!(status, TaskStatus::NotFound);
    }

    #[tokio::test]
    async fn test_result_takes_precedence() {
        let (service, status, results) = service();
        let id = TaskId::new();
        status.mark_processing(&id).await.unwrap();
        results.put(&id, "done").await.unwrap();

        let (_, reported) = service.get_status(&id.to_string()).await.unwrap();
        assert_eq!(
            reported,
            TaskStatus::Completed {
                summary: "done".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_processing_and_failed() {
        let (service, status, _) = service();
        let id = TaskId::new();

        status.mark_processing(&id).await.unwrap();
        assert_eq!(service.lookup(&id).await.unwrap(), TaskStatus::Processing);

        status.mark_failed(&id).await.unwrap();
        assert_eq!(service.lookup(&id).await.unwrap(), TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_completed_without_result_reads_as_not_found() {
        let (service, status, _) = service();
        let id = TaskId::new();
        status.mark_completed(&id).await.unwrap();
        assert_eq!(service.lookup(&id).await.unwrap(), TaskStatus::NotFound);
    }
}
