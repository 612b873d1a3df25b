//! Key-value cache provider trait backing status and result records

use async_trait::async_trait;
use crate::error::Result;

/// Trait for a string key-value cache
///
/// Writes to a single key are last-writer-wins and are not reordered.
///
/// Implementations:
/// - `MemoryCache`: In-process map
/// - `RedisCache`: Redis (feature `redis`)
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Set `key` to `value`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Get the value stored at `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
