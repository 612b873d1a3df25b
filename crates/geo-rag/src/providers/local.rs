//! Local provider implementations using the filesystem and in-process math
//!
//! No network access is needed for any of these.

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

use super::blob_store::{validate_object_path, BlobStoreProvider};
use super::embedding::EmbeddingProvider;
use super::vector_index::{VectorIndexProvider, VectorMatch};

/// Local blob store using the filesystem
pub struct LocalBlobStore {
    /// Root directory acting as the container
    root_dir: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct BlobMeta {
    path: String,
    content_type: String,
    size: u64,
}

impl LocalBlobStore {
    /// Create a new local blob store rooted at `root_dir`
    pub fn new(root_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Filesystem location of an object
    fn object_file(&self, path: &str) -> PathBuf {
        self.root_dir.join(path)
    }

    /// Sidecar metadata location of an object
    fn meta_file(&self, path: &str) -> PathBuf {
        self.root_dir.join(format!("{}.meta.json", path))
    }
}

#[async_trait]
impl BlobStoreProvider for LocalBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
        validate_object_path(path)?;
        let file = self.object_file(path);

        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        tokio::fs::write(&file, data)
            .await
            .map_err(|e| Error::storage(format!("Failed to write {}: {}", path, e)))?;

        let meta = BlobMeta {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;
        tokio::fs::write(self.meta_file(path), meta_json)
            .await
            .map_err(|e| Error::storage(format!("Failed to write metadata for {}: {}", path, e)))?;

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        validate_object_path(path)?;
        tokio::fs::read(self.object_file(path))
            .await
            .map_err(|e| Error::storage(format!("Failed to read {}: {}", path, e)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        validate_object_path(path)?;
        Ok(tokio::fs::try_exists(self.object_file(path)).await?)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.root_dir.exists())
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

/// In-process vector index with brute-force cosine similarity
#[derive(Default)]
pub struct LocalVectorIndex {
    vectors: RwLock<HashMap<String, Vec<f32>>>,
}

impl LocalVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }
}

/// Cosine similarity, 0.0 when either vector has zero norm
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndexProvider for LocalVectorIndex {
    async fn upsert(&self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::vector_index("Cannot upsert an empty vector"));
        }

        let mut vectors = self.vectors.write();
        if let Some(existing) = vectors.values().next() {
            if existing.len() != vector.len() {
                return Err(Error::vector_index(format!(
                    "Dimension mismatch: index holds {}-d vectors, got {}",
                    existing.len(),
                    vector.len()
                )));
            }
        }
        vectors.insert(id.to_string(), vector.to_vec());
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let vectors = self.vectors.read();
        let mut matches: Vec<VectorMatch> = vectors
            .iter()
            .filter(|(_, stored)| stored.len() == vector.len())
            .map(|(id, stored)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, stored),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-cosine"
    }
}

/// Deterministic embedder using signed feature hashing over tokens
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
