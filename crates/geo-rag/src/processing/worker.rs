//! Worker Pipeline: consumes task messages and drives each task to a
//! terminal state

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::providers::{
    BlobStoreProvider, EmbeddingProvider, QueueProvider, SummarizerProvider, VectorIndexProvider,
};
use crate::store::{ResultCache, StatusStore};
use crate::types::{TaskId, TaskMessage};

use super::describe::describe;
use super::retrieval::build_context;

/// Step of the pipeline, recorded on failure for operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    MarkProcessing,
    Fetch,
    Embed,
    Index,
    Query,
    Summarize,
    StoreResult,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::MarkProcessing => "mark_processing",
            PipelineStage::Fetch => "fetch",
            PipelineStage::Embed => "embed",
            PipelineStage::Index => "index",
            PipelineStage::Query => "query",
            PipelineStage::Summarize => "summarize",
            PipelineStage::StoreResult => "store_result",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single message was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Result written, task completed
    Completed,
    /// Task marked failed (or the failed write itself was attempted)
    Failed,
    /// Task was already terminal; nothing written
    Skipped,
}

/// Collaborators used by the pipeline
#[derive(Clone)]
pub struct PipelineDeps {
    pub blob_store: Arc<dyn BlobStoreProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_index: Arc<dyn VectorIndexProvider>,
    pub summarizer: Arc<dyn SummarizerProvider>,
    pub status: StatusStore,
    pub results: ResultCache,
}

/// Per-task processing state machine
pub struct TaskPipeline {
    deps: PipelineDeps,
    top_k: usize,
    task_timeout: Duration,
}

impl TaskPipeline {
    pub fn new(deps: PipelineDeps, top_k: usize, task_timeout: Duration) -> Self {
        Self {
            deps,
            top_k: top_k.max(1),
            task_timeout,
        }
    }

    /// Process one message to a terminal state.
    ///
    /// Never returns an error: every failure ends as a single `failed`
    /// status write, which is itself best-effort.
    pub async fn process(&self, message: &TaskMessage) -> TaskOutcome {
        let task_id = message.task_id;

        if self.is_terminal(&task_id).await {
            tracing::info!("Task {} already terminal, skipping redelivery", task_id);
            return TaskOutcome::Skipped;
        }

        let start = Instant::now();
        // The result write runs outside the deadline and is never cut short
        let result = match timeout(self.task_timeout, self.run_stages(message)).await {
            Ok(Ok(summary)) => self
                .deps
                .results
                .put(&task_id, &summary)
                .await
                .map_err(|e| e.at_stage(PipelineStage::StoreResult)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(self.task_timeout.as_secs())),
        };

        match result {
            Ok(()) => {
                // The result record is authoritative from here on; a lost
                // `completed` status write does not change what clients see.
                if let Err(e) = self.deps.status.mark_completed(&task_id).await {
                    tracing::warn!("Task {} completed but status write failed: {}", task_id, e);
                }
                tracing::info!(
                    "Task {} completed in {:.1}s",
                    task_id,
                    start.elapsed().as_secs_f64()
                );
                TaskOutcome::Completed
            }
            Err(e) => {
                tracing::error!(
                    "Task {} failed after {:.1}s: {}",
                    task_id,
                    start.elapsed().as_secs_f64(),
                    e
                );
                if let Err(write_err) = self.deps.status.mark_failed(&task_id).await {
                    tracing::error!(
                        "Could not record failure for task {}; it stays 'processing': {}",
                        task_id,
                        write_err
                    );
                }
                TaskOutcome::Failed
            }
        }
    }

    /// Whether a task already reached `completed` or `failed`
    async fn is_terminal(&self, task_id: &TaskId) -> bool {
        match self.deps.results.get(task_id).await {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(e) => tracing::warn!("Result lookup for {} failed: {}", task_id, e),
        }
        match self.deps.status.get(task_id).await {
            Ok(state) => state.map(|s| s.is_terminal()).unwrap_or(false),
            Err(e) => {
                tracing::warn!("Status lookup for {} failed: {}", task_id, e);
                false
            }
        }
    }

    /// Sequential steps up to the summary; the first error short-circuits
    /// the rest
    async fn run_stages(&self, message: &TaskMessage) -> Result<String> {
        let task_id = &message.task_id;
        let id = task_id.to_string();
        let deps = &self.deps;

        deps.status
            .mark_processing(task_id)
            .await
            .map_err(|e| e.at_stage(PipelineStage::MarkProcessing))?;
        tracing::info!(
            "Task {} processing {} (queued {}ms)",
            task_id,
            message.object_path,
            message.queued_for().num_milliseconds()
        );

        let payload = deps
            .blob_store
            .get(&message.object_path)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Fetch))?;

        let filename = message
            .object_path
            .rsplit('/')
            .next()
            .unwrap_or(&message.object_path);
        let description = describe(filename, &payload);

        let vector = deps
            .embedder
            .embed(&description)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Embed))?;
        if vector.is_empty() {
            return Err(Error::embedding("Embedder returned an empty vector")
                .at_stage(PipelineStage::Embed));
        }
        if vector.len() != deps.embedder.dimensions() {
            tracing::warn!(
                "{} returned {}-d vector, configured for {}",
                deps.embedder.name(),
                vector.len(),
                deps.embedder.dimensions()
            );
        }

        deps.vector_index
            .upsert(&id, &vector)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Index))?;

        let neighbors = deps
            .vector_index
            .query(&vector, self.top_k)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Query))?;
        tracing::debug!("Task {} retrieved {} neighbors", task_id, neighbors.len());

        let context = build_context(task_id, &description, &neighbors);
        let summary = deps
            .summarizer
            .summarize(&context)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Summarize))?;
        if summary.trim().is_empty() {
            return Err(Error::summarizer("Summarizer returned an empty summary")
                .at_stage(PipelineStage::Summarize));
        }

        Ok(summary)
    }
}

/// Independent consumer loops sharing one queue
pub struct WorkerPool {
    pipeline: Arc<TaskPipeline>,
    queue: Arc<dyn QueueProvider>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<TaskPipeline>, queue: Arc<dyn QueueProvider>) -> Self {
        Self {
            pipeline,
            queue,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops every slot once cancelled; in-flight tasks finish
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start `slots` consumer loops
    pub fn spawn(&self, slots: usize) -> Vec<JoinHandle<()>> {
        let slots = slots.max(1);
        tracing::info!("Starting {} worker slots on queue '{}'", slots, self.queue.name());

        (0..slots)
            .map(|slot| {
                let pipeline = self.pipeline.clone();
                let queue = self.queue.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(run_slot(slot, pipeline, queue, shutdown))
            })
            .collect()
    }
}

async fn run_slot(
    slot: usize,
    pipeline: Arc<TaskPipeline>,
    queue: Arc<dyn QueueProvider>,
    shutdown: CancellationToken,
) {
    tracing::debug!("Worker slot {} started", slot);

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = queue.receive() => next,
        };

        match next {
            Ok(Some(message)) => {
                let outcome = pipeline.process(&message).await;
                tracing::debug!("Slot {} finished task {}: {:?}", slot, message.task_id, outcome);
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Slot {} failed to receive from queue: {}", slot, e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }

    tracing::debug!("Worker slot {} stopped", slot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::local::{HashingEmbedder, LocalVectorIndex};
    use crate::providers::memory::{MemoryBlobStore, MemoryCache};
    use crate::providers::{CacheProvider, VectorMatch};
    use crate::types::TaskState;
    use async_trait::async_trait;

    struct EchoSummarizer;

    #[async_trait]
    impl SummarizerProvider for EchoSummarizer {
        async fn summarize(&self, context: &str) -> Result<String> {
            Ok(format!("Summary of {} chars", context.len()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    struct SlowSummarizer;

    #[async_trait]
    impl SummarizerProvider for SlowSummarizer {
        async fn summarize(&self, _context: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::embedding("model not loaded"))
        }

        fn dimensions(&self) -> usize {
            32
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing-embedder"
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndexProvider for FailingIndex {
        async fn upsert(&self, _id: &str, _vector: &[f32]) -> Result<()> {
            Err(Error::vector_index("index unavailable"))
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<VectorMatch>> {
            Err(Error::vector_index("index unavailable"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing-index"
        }
    }

    /// Stores summaries immediately but acknowledges them late
    struct SlowAckCache {
        inner: MemoryCache,
        delay: Duration,
    }

    #[async_trait]
    impl CacheProvider for SlowAckCache {
        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value).await?;
            if key.starts_with("summary:") {
                tokio::time::sleep(self.delay).await;
            }
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "slow-ack"
        }
    }

    /// Accepts the `processing` status write and rejects later ones
    struct TerminalWriteRejectingCache {
        inner: MemoryCache,
    }

    #[async_trait]
    impl CacheProvider for TerminalWriteRejectingCache {
        async fn set(&self, key: &str, value: &str) -> Result<()> {
            if key.starts_with("status:") && value != "processing" {
                return Err(Error::cache("connection reset"));
            }
            self.inner.set(key, value).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    fn deps_with(
        cache: Arc<dyn CacheProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndexProvider>,
        summarizer: Arc<dyn SummarizerProvider>,
    ) -> (PipelineDeps, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let deps = PipelineDeps {
            blob_store: blobs.clone(),
            embedder,
            vector_index,
            summarizer,
            status: StatusStore::new(cache.clone()),
            results: ResultCache::new(cache),
        };
        (deps, blobs)
    }

    fn pipeline_with(
        summarizer: Arc<dyn SummarizerProvider>,
        task_timeout: Duration,
    ) -> (TaskPipeline, Arc<MemoryBlobStore>, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let (deps, blobs) = deps_with(
            cache.clone(),
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(LocalVectorIndex::new()),
            summarizer,
        );
        (TaskPipeline::new(deps, 5, task_timeout), blobs, cache)
    }

    async fn stored_task(blobs: &MemoryBlobStore) -> TaskMessage {
        let id = TaskId::new();
        let path = format!("{}/x.tif", id);
        blobs.put(&path, b"II*\0bytes", "image/tiff").await.unwrap();
        TaskMessage::new(id, path)
    }

    #[tokio::test]
    async fn test_pipeline_completes() {
        let (pipeline, blobs, cache) =
            pipeline_with(Arc::new(EchoSummarizer), Duration::from_secs(5));
        let id = TaskId::new();
        let path = format!("{}/x.tif", id);
        blobs.put(&path, b"II*\0bytes", "image/tiff").await.unwrap();

        let outcome = pipeline.process(&TaskMessage::new(id, path)).await;
        assert_eq!(outcome, TaskOutcome::Completed);

        let status = StatusStore::new(cache.clone());
        let results = ResultCache::new(cache);
        assert_eq!(status.get(&id).await.unwrap(), Some(TaskState::Completed));
        assert!(results.get(&id).await.unwrap().unwrap().starts_with("Summary of"));
    }

    #[tokio::test]
    async fn test_missing_blob_fails_task() {
        let (pipeline, _blobs, cache) =
            pipeline_with(Arc::new(EchoSummarizer), Duration::from_secs(5));
        let id = TaskId::new();

        let outcome = pipeline
            .process(&TaskMessage::new(id, format!("{}/gone.tif", id)))
            .await;
        assert_eq!(outcome, TaskOutcome::Failed);
        assert_eq!(
            StatusStore::new(cache.clone()).get(&id).await.unwrap(),
            Some(TaskState::Failed)
        );
        assert_eq!(ResultCache::new(cache).get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_timeout_fails_task() {
        let (pipeline, blobs, cache) =
            pipeline_with(Arc::new(SlowSummarizer), Duration::from_millis(50));
        let id = TaskId::new();
        let path = format!("{}/x.tif", id);
        blobs.put(&path, b"data", "image/tiff").await.unwrap();

        let outcome = pipeline.process(&TaskMessage::new(id, path)).await;
        assert_eq!(outcome, TaskOutcome::Failed);
        assert_eq!(
            StatusStore::new(cache).get(&id).await.unwrap(),
            Some(TaskState::Failed)
        );
    }

    #[tokio::test]
    async fn test_redelivery_of_terminal_task_is_skipped() {
        let (pipeline, blobs, cache) =
            pipeline_with(Arc::new(EchoSummarizer), Duration::from_secs(5));
        let id = TaskId::new();
        let path = format!("{}/x.tif", id);
        blobs.put(&path, b"data", "image/tiff").await.unwrap();

        let status = StatusStore::new(cache.clone());
        status.mark_failed(&id).await.unwrap();

        let outcome = pipeline.process(&TaskMessage::new(id, path)).await;
        assert_eq!(outcome, TaskOutcome::Skipped);
        assert_eq!(status.get(&id).await.unwrap(), Some(TaskState::Failed));
        assert_eq!(ResultCache::new(cache).get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_slow_result_write_is_not_cut_by_deadline() {
        let cache = Arc::new(SlowAckCache {
            inner: MemoryCache::new(),
            delay: Duration::from_millis(300),
        });
        let (deps, blobs) = deps_with(
            cache.clone(),
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(LocalVectorIndex::new()),
            Arc::new(EchoSummarizer),
        );
        let pipeline = TaskPipeline::new(deps, 5, Duration::from_millis(100));
        let message = stored_task(&blobs).await;

        let outcome = pipeline.process(&message).await;
        assert_eq!(outcome, TaskOutcome::Completed);

        let status = StatusStore::new(cache.clone());
        let results = ResultCache::new(cache);
        assert_eq!(
            status.get(&message.task_id).await.unwrap(),
            Some(TaskState::Completed)
        );
        assert!(results.get(&message.task_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_task() {
        let cache = Arc::new(MemoryCache::new());
        let (deps, blobs) = deps_with(
            cache.clone(),
            Arc::new(FailingEmbedder),
            Arc::new(LocalVectorIndex::new()),
            Arc::new(EchoSummarizer),
        );
        let pipeline = TaskPipeline::new(deps, 5, Duration::from_secs(5));
        let message = stored_task(&blobs).await;

        assert_eq!(pipeline.process(&message).await, TaskOutcome::Failed);
        assert_eq!(
            StatusStore::new(cache.clone()).get(&message.task_id).await.unwrap(),
            Some(TaskState::Failed)
        );
        assert_eq!(ResultCache::new(cache).get(&message.task_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_index_failure_fails_task() {
        let cache = Arc::new(MemoryCache::new());
        let (deps, blobs) = deps_with(
            cache.clone(),
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(FailingIndex),
            Arc::new(EchoSummarizer),
        );
        let pipeline = TaskPipeline::new(deps, 5, Duration::from_secs(5));
        let message = stored_task(&blobs).await;

        assert_eq!(pipeline.process(&message).await, TaskOutcome::Failed);
        assert_eq!(
            StatusStore::new(cache.clone()).get(&message.task_id).await.unwrap(),
            Some(TaskState::Failed)
        );
        assert_eq!(ResultCache::new(cache).get(&message.task_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lost_failed_write_leaves_task_processing() {
        let cache = Arc::new(TerminalWriteRejectingCache {
            inner: MemoryCache::new(),
        });
        let (deps, blobs) = deps_with(
            cache.clone(),
            Arc::new(FailingEmbedder),
            Arc::new(LocalVectorIndex::new()),
            Arc::new(EchoSummarizer),
        );
        let pipeline = TaskPipeline::new(deps, 5, Duration::from_secs(5));
        let message = stored_task(&blobs).await;

        assert_eq!(pipeline.process(&message).await, TaskOutcome::Failed);
        assert_eq!(
            StatusStore::new(cache.clone()).get(&message.task_id).await.unwrap(),
            Some(TaskState::Processing)
        );
        assert_eq!(ResultCache::new(cache).get(&message.task_id).await.unwrap(), None);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::StoreResult.to_string(), "store_result");
        assert_eq!(PipelineStage::Embed.to_string(), "embed");
    }
}
