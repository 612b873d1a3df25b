//! Vector index provider trait for similarity retrieval

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;

/// One nearest-neighbor hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Id the vector was upserted under (a task id)
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorIndex`: In-process cosine similarity
/// - `PineconeIndex`: Pinecone REST data plane
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert or replace the vector stored under `id`
    async fn upsert(&self, id: &str, vector: &[f32]) -> Result<()>;

    /// Return up to `top_k` matches ordered by descending score
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
