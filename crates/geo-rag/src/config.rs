//! Configuration for the geospatial task pipeline
//!
//! Values come from `GeoRagConfig::default()`, optionally overlaid by a TOML
//! file, then by environment variables. Credentials are normally supplied
//! through the environment only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoRagConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Blob store configuration
    pub storage: StorageConfig,
    /// Queue configuration
    pub queue: QueueConfig,
    /// Key-value cache configuration (status and result records)
    pub cache: CacheConfig,
    /// Redis connection (shared by the redis queue and cache backends)
    pub redis: RedisConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector index configuration
    pub vector_index: VectorIndexConfig,
    /// Summarizer configuration
    pub summarizer: SummarizerConfig,
    /// Ollama configuration
    pub llm: LlmConfig,
    /// OpenAI configuration
    pub openai: OpenAiConfig,
    /// Worker pipeline configuration
    pub worker: WorkerConfig,
}

impl GeoRagConfig {
    /// Load configuration: defaults, then the TOML file (if given), then the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML text; missing sections and keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("GEO_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("GEO_RAG_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(root) = lookup("GEO_RAG_STORAGE_ROOT") {
            self.storage.root_dir = PathBuf::from(root);
        }
        if let Some(name) = lookup("GEO_RAG_QUEUE_NAME") {
            self.queue.name = name;
        }
        if let Some(slots) = lookup("GEO_RAG_WORKER_SLOTS").and_then(|s| s.parse().ok()) {
            self.worker.slots = slots;
        }

        // Redis: a full URL wins over host/port/password parts
        if let Some(url) = lookup("REDIS_URL") {
            self.redis.url = Some(url);
        } else if let Some(host) = lookup("REDIS_HOST") {
            let port = lookup("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
            self.redis.url = Some(match lookup("REDIS_PASSWORD") {
                Some(password) if !password.is_empty() => {
                    format!("redis://:{}@{}:{}", password, host, port)
                }
                _ => format!("redis://{}:{}", host, port),
            });
        }

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = base_url;
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.vector_index.api_key = Some(key);
        }
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.vector_index.host = Some(host);
        }
        if let Some(base_url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = base_url;
        }
    }

    /// Reject settings that cannot work together
    pub fn validate(&self) -> Result<()> {
        if self.worker.slots == 0 {
            return Err(Error::Config("worker.slots must be at least 1".to_string()));
        }
        if self.worker.top_k == 0 {
            return Err(Error::Config("worker.top_k must be at least 1".to_string()));
        }
        if self.server.allowed_content_types.is_empty() {
            return Err(Error::Config(
                "server.allowed_content_types must not be empty".to_string(),
            ));
        }

        let uses_openai = self.embeddings.backend == EmbeddingBackend::OpenAi
            || self.summarizer.backend == SummarizerBackend::OpenAi;
        if uses_openai && self.openai.api_key.is_none() {
            return Err(Error::Config(
                "OpenAI backend selected but OPENAI_API_KEY is not set".to_string(),
            ));
        }

        if self.vector_index.backend == VectorIndexBackend::Pinecone
            && (self.vector_index.host.is_none() || self.vector_index.api_key.is_none())
        {
            return Err(Error::Config(
                "Pinecone backend requires PINECONE_INDEX_HOST and PINECONE_API_KEY".to_string(),
            ));
        }

        let uses_redis = self.queue.backend == QueueBackend::Redis
            || self.cache.backend == CacheBackend::Redis;
        if uses_redis {
            if !cfg!(feature = "redis") {
                return Err(Error::Config(
                    "Redis backend selected but the redis feature is not enabled. \
                     Rebuild with --features redis"
                        .to_string(),
                ));
            }
            if self.redis.url.is_none() {
                return Err(Error::Config(
                    "Redis backend selected but REDIS_URL is not set".to_string(),
                ));
            }
        }

        match self.queue.backend {
            // Nothing outside this process can drain the in-process channel
            QueueBackend::Memory if !self.worker.embedded => {
                return Err(Error::Config(
                    "queue.backend = \"memory\" requires worker.embedded = true".to_string(),
                ));
            }
            // Standalone workers must share records and payloads with the API
            QueueBackend::Redis if self.cache.backend == CacheBackend::Memory => {
                return Err(Error::Config(
                    "queue.backend = \"redis\" requires cache.backend = \"redis\"".to_string(),
                ));
            }
            QueueBackend::Redis if self.storage.backend == BlobBackend::Memory => {
                return Err(Error::Config(
                    "queue.backend = \"redis\" requires a shared storage backend".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Content types accepted by the submit endpoint
    pub allowed_content_types: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            allowed_content_types: vec![
                "application/octet-stream".to_string(),
                "image/tiff".to_string(),
            ],
        }
    }
}

/// Blob store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Local filesystem
    #[default]
    Local,
    /// In-process memory (tests, demos)
    Memory,
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BlobBackend,
    /// Root directory for the local backend (the "container")
    pub root_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Local,
            root_dir: PathBuf::from("data/uploads"),
        }
    }
}

/// Queue backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-process channel; workers must run in the server process
    #[default]
    Memory,
    /// Redis list shared between processes
    Redis,
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    /// Queue name (redis list key)
    pub name: String,
    /// Channel capacity for the memory backend
    pub capacity: usize,
    /// Blocking receive timeout for the redis backend, in seconds
    pub poll_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::Memory,
            name: "geospatial-tasks".to_string(),
            capacity: 1000,
            poll_timeout_secs: 5,
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Key-value cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
}

/// Redis connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// `redis://[:<password>@]<host>:<port>[/<db>]`
    pub url: Option<String>,
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI embeddings API
    OpenAi,
    /// Deterministic feature hashing, no network
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Model name (ollama or openai)
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorIndexBackend {
    /// In-process cosine similarity index
    #[default]
    Local,
    /// Pinecone REST data plane
    Pinecone,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub backend: VectorIndexBackend,
    /// Index name (informational for pinecone, used in logs)
    pub index_name: String,
    /// Pinecone index host, e.g. `https://geospatial-embeddings-abc123.svc.us-east-1.pinecone.io`
    pub host: Option<String>,
    /// Pinecone API key
    pub api_key: Option<String>,
    /// Pinecone namespace
    pub namespace: Option<String>,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: VectorIndexBackend::Local,
            index_name: "geospatial-embeddings".to_string(),
            host: None,
            api_key: None,
            namespace: None,
        }
    }
}

/// Summarizer backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    #[default]
    Ollama,
    OpenAi,
}

/// Summarizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub backend: SummarizerBackend,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::Ollama,
            model: "phi3".to_string(),
            temperature: 0.3,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Worker pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Concurrent worker slots
    pub slots: usize,
    /// Deadline for one task's pipeline, in seconds (default: 300 = 5 minutes)
    pub task_timeout_secs: u64,
    /// Neighbors retrieved from the vector index
    pub top_k: usize,
    /// Run workers inside the server process
    pub embedded: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            slots: num_cpus::get().min(4), // Max 4 workers
            task_timeout_secs: 300,
            top_k: 5,
            embedded: true,
        }
    }
}

impl WorkerConfig {
    /// Per-task deadline
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}
