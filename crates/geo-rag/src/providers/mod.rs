//! Provider abstractions for the collaborators of the task pipeline
//!
//! Every external system (blob store, queue, cache, embedder, vector index,
//! summarizer) sits behind a trait so deployments can switch between local
//! and hosted backends, and tests can inject in-process doubles.

pub mod blob_store;
pub mod embedding;
pub mod kv_cache;
pub mod local;
pub mod memory;
pub mod ollama;
pub mod openai;
pub mod pinecone;
pub mod queue;
pub mod retry;
pub mod set;
pub mod summarizer;
pub mod vector_index;

#[cfg(feature = "redis")]
pub mod redis;

pub use blob_store::BlobStoreProvider;
pub use embedding::EmbeddingProvider;
pub use kv_cache::CacheProvider;
pub use queue::QueueProvider;
pub use set::{ComponentHealth, ProviderSet};
pub use summarizer::SummarizerProvider;
pub use vector_index::{VectorIndexProvider, VectorMatch};
