//! Backend selection: one handle per collaborator, chosen by configuration

use std::sync::Arc;

use crate::config::{
    BlobBackend, CacheBackend, EmbeddingBackend, GeoRagConfig, QueueBackend, SummarizerBackend,
    VectorIndexBackend,
};
use crate::error::{Error, Result};
use crate::processing::{PipelineDeps, TaskDispatcher, TaskPipeline};
use crate::query::StatusQueryService;
use crate::store::{ResultCache, StatusStore};

use super::local::{HashingEmbedder, LocalBlobStore, LocalVectorIndex};
use super::memory::{ChannelQueue, MemoryBlobStore, MemoryCache};
use super::ollama::{OllamaClient, OllamaEmbedder, OllamaSummarizer};
use super::openai::{OpenAiClient, OpenAiEmbedder, OpenAiSummarizer};
use super::pinecone::PineconeIndex;
use super::{
    BlobStoreProvider, CacheProvider, EmbeddingProvider, QueueProvider, SummarizerProvider,
    VectorIndexProvider,
};

/// Health of one collaborator
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComponentHealth {
    pub component: &'static str,
    pub provider: String,
    pub healthy: bool,
}

/// Collaborator handles injected into the dispatcher, pipeline and query
/// service
#[derive(Clone)]
pub struct ProviderSet {
    pub blob_store: Arc<dyn BlobStoreProvider>,
    pub queue: Arc<dyn QueueProvider>,
    pub cache: Arc<dyn CacheProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_index: Arc<dyn VectorIndexProvider>,
    pub summarizer: Arc<dyn SummarizerProvider>,
}

impl ProviderSet {
    /// Build every collaborator selected in `config`
    pub async fn from_config(config: &GeoRagConfig) -> Result<Self> {
        let blob_store: Arc<dyn BlobStoreProvider> = match config.storage.backend {
            BlobBackend::Local => Arc::new(LocalBlobStore::new(config.storage.root_dir.clone())?),
            BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
        };

        let queue: Arc<dyn QueueProvider> = match config.queue.backend {
            QueueBackend::Memory => Arc::new(ChannelQueue::new(config.queue.capacity)),
            QueueBackend::Redis => Self::redis_queue(config).await?,
        };

        let cache: Arc<dyn CacheProvider> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Redis => Self::redis_cache(config).await?,
        };

        let needs_ollama = config.embeddings.backend == EmbeddingBackend::Ollama
            || config.summarizer.backend == SummarizerBackend::Ollama;
        let ollama = if needs_ollama {
            Some(Arc::new(OllamaClient::new(&config.llm)?))
        } else {
            None
        };

        let needs_openai = config.embeddings.backend == EmbeddingBackend::OpenAi
            || config.summarizer.backend == SummarizerBackend::OpenAi;
        let openai = if needs_openai {
            Some(Arc::new(OpenAiClient::new(&config.openai)?))
        } else {
            None
        };

        let embedder: Arc<dyn EmbeddingProvider> = match (config.embeddings.backend, &ollama, &openai) {
            (EmbeddingBackend::Ollama, Some(client), _) => Arc::new(OllamaEmbedder::new(
                client.clone(),
                config.embeddings.model.clone(),
                config.embeddings.dimensions,
            )),
            (EmbeddingBackend::OpenAi, _, Some(client)) => Arc::new(OpenAiEmbedder::new(
                client.clone(),
                config.embeddings.model.clone(),
                config.embeddings.dimensions,
            )),
            (EmbeddingBackend::Hashing, _, _) => {
                Arc::new(HashingEmbedder::new(config.embeddings.dimensions))
            }
            _ => return Err(Error::Config("Embedding backend client unavailable".to_string())),
        };

        let vector_index: Arc<dyn VectorIndexProvider> = match config.vector_index.backend {
            VectorIndexBackend::Local => Arc::new(LocalVectorIndex::new()),
            VectorIndexBackend::Pinecone => Arc::new(PineconeIndex::new(
                &config.vector_index,
                config.openai.timeout_secs,
                config.openai.max_retries,
            )?),
        };

        let summarizer: Arc<dyn SummarizerProvider> = match (config.summarizer.backend, &ollama, &openai) {
            (SummarizerBackend::Ollama, Some(client), _) => Arc::new(OllamaSummarizer::new(
                client.clone(),
                config.summarizer.model.clone(),
                config.summarizer.temperature,
            )),
            (SummarizerBackend::OpenAi, _, Some(client)) => Arc::new(OpenAiSummarizer::new(
                client.clone(),
                config.summarizer.model.clone(),
                config.summarizer.temperature,
            )),
            _ => return Err(Error::Config("Summarizer backend client unavailable".to_string())),
        };

        tracing::info!(
            "Providers: blob={}, queue={}, cache={}, embedder={}, index={}, summarizer={} ({})",
            blob_store.name(),
            queue.name(),
            cache.name(),
            embedder.name(),
            vector_index.name(),
            summarizer.name(),
            summarizer.model()
        );

        Ok(Self {
            blob_store,
            queue,
            cache,
            embedder,
            vector_index,
            summarizer,
        })
    }

    #[cfg(feature = "redis")]
    async fn redis_queue(config: &GeoRagConfig) -> Result<Arc<dyn QueueProvider>> {
        let url = Self::redis_url(config)?;
        let queue = super::redis::RedisQueue::connect(
            url,
            &config.queue.name,
            config.queue.poll_timeout_secs,
        )
        .await?;
        Ok(Arc::new(queue))
    }

    #[cfg(not(feature = "redis"))]
    async fn redis_queue(_config: &GeoRagConfig) -> Result<Arc<dyn QueueProvider>> {
        Err(Error::Config("Redis queue requires the redis feature".to_string()))
    }

    #[cfg(feature = "redis")]
    async fn redis_cache(config: &GeoRagConfig) -> Result<Arc<dyn CacheProvider>> {
        let url = Self::redis_url(config)?;
        Ok(Arc::new(super::redis::RedisCache::connect(url).await?))
    }

    #[cfg(not(feature = "redis"))]
    async fn redis_cache(_config: &GeoRagConfig) -> Result<Arc<dyn CacheProvider>> {
        Err(Error::Config("Redis cache requires the redis feature".to_string()))
    }

    #[cfg(feature = "redis")]
    fn redis_url(config: &GeoRagConfig) -> Result<&str> {
        config
            .redis
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("REDIS_URL is not set".to_string()))
    }

    /// Submission side
    pub fn dispatcher(&self, allowed_content_types: Vec<String>) -> TaskDispatcher {
        TaskDispatcher::new(self.blob_store.clone(), self.queue.clone(), allowed_content_types)
    }

    /// Processing side
    pub fn pipeline(&self, config: &GeoRagConfig) -> TaskPipeline {
        let deps = PipelineDeps {
            blob_store: self.blob_store.clone(),
            embedder: self.embedder.clone(),
            vector_index: self.vector_index.clone(),
            summarizer: self.summarizer.clone(),
            status: StatusStore::new(self.cache.clone()),
            results: ResultCache::new(self.cache.clone()),
        };
        TaskPipeline::new(deps, config.worker.top_k, config.worker.task_timeout())
    }

    /// Read side
    pub fn query_service(&self) -> StatusQueryService {
        StatusQueryService::new(
            StatusStore::new(self.cache.clone()),
            ResultCache::new(self.cache.clone()),
        )
    }

    /// Health of every collaborator; a failing check counts as unhealthy
    pub async fn health(&self) -> Vec<ComponentHealth> {
        let (blob, queue, cache, embedder, index, summarizer) = tokio::join!(
            self.blob_store.health_check(),
            self.queue.health_check(),
            self.cache.health_check(),
            self.embedder.health_check(),
            self.vector_index.health_check(),
            self.summarizer.health_check(),
        );

        vec![
            ComponentHealth {
                component: "blob_store",
                provider: self.blob_store.name().to_string(),
                healthy: blob.unwrap_or(false),
            },
            ComponentHealth {
                component: "queue",
                provider: self.queue.name().to_string(),
                healthy: queue.unwrap_or(false),
            },
            ComponentHealth {
                component: "cache",
                provider: self.cache.name().to_string(),
                healthy: cache.unwrap_or(false),
            },
            ComponentHealth {
                component: "embedder",
                provider: self.embedder.name().to_string(),
                healthy: embedder.unwrap_or(false),
            },
            ComponentHealth {
                component: "vector_index",
                provider: self.vector_index.name().to_string(),
                healthy: index.unwrap_or(false),
            },
            ComponentHealth {
                component: "summarizer",
                provider: self.summarizer.name().to_string(),
                healthy: summarizer.unwrap_or(false),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_backends_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeoRagConfig::default();
        config.storage.root_dir = dir.path().to_path_buf();
        config.embeddings.backend = EmbeddingBackend::Hashing;

        let providers = ProviderSet::from_config(&config).await.unwrap();
        assert_eq!(providers.blob_store.name(), "local-filesystem");
        assert_eq!(providers.queue.name(), "channel");
        assert_eq!(providers.embedder.name(), "hashing");
        assert_eq!(providers.summarizer.name(), "ollama");
    }

    #[tokio::test]
    async fn test_openai_without_key_is_config_error() {
        let mut config = GeoRagConfig::default();
        config.storage.backend = BlobBackend::Memory;
        config.summarizer.backend = SummarizerBackend::OpenAi;

        assert!(matches!(
            ProviderSet::from_config(&config).await,
            Err(Error::Config(_))
        ));
    }
}
