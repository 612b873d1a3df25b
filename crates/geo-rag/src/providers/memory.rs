//! In-process provider implementations
//!
//! These keep everything in memory. They back the default single-process
//! deployment (server with embedded workers) and the test suite.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};
use crate::types::TaskMessage;

use super::blob_store::{validate_object_path, BlobStoreProvider};
use super::kv_cache::CacheProvider;
use super::queue::QueueProvider;

/// Stored object with its content type
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Blob store backed by a concurrent map
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, StoredBlob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Snapshot of a stored object including its content type
    pub fn object(&self, path: &str) -> Option<StoredBlob> {
        self.objects.get(path).map(|o| o.clone())
    }
}

#[async_trait]
impl BlobStoreProvider for MemoryBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
        validate_object_path(path)?;
        self.objects.insert(
            path.to_string(),
            StoredBlob {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        validate_object_path(path)?;
        self.objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::storage(format!("Object not found: {}", path)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.objects.contains_key(path))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory-blob"
    }
}

/// In-process queue on a bounded tokio channel.
///
/// The receiver sits behind a mutex so any number of worker slots can share
/// it; each message is taken by exactly one of them.
pub struct ChannelQueue {
    sender: mpsc::Sender<TaskMessage>,
    receiver: Mutex<mpsc::Receiver<TaskMessage>>,
}

impl ChannelQueue {
    /// Create a queue holding at most `capacity` undelivered messages
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Messages waiting for a consumer
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

#[async_trait]
impl QueueProvider for ChannelQueue {
    async fn send(&self, message: &TaskMessage) -> Result<()> {
        self.sender
            .send(message.clone())
            .await
            .map_err(|e| Error::dispatch(format!("Failed to enqueue task: {}", e)))
    }

    async fn receive(&self) -> Result<Option<TaskMessage>> {
        let mut receiver = self.receiver.lock().await;
        Ok(receiver.recv().await)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.sender.is_closed())
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Key-value cache backed by a concurrent map
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a key, simulating eviction or expiry
    pub fn evict(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

#[async_trait]
impl CacheProvider for MemoryCache {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory-cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    #[tokio::test]
    async fn test_blob_put_overwrites() {
        let store = MemoryBlobStore::new();
        store.put("t/a.tif", b"one", "image/tiff").await.unwrap();
        store.put("t/a.tif", b"two", "image/tiff").await.unwrap();
        assert_eq!(store.get("t/a.tif").await.unwrap(), b"two");
        assert_eq!(store.len(), 1);
        assert!(matches!(store.get("t/missing").await, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_channel_queue_delivers_each_message_once() {
        let queue = ChannelQueue::new(8);
        let first = TaskMessage::new(TaskId::new(), "a/x.tif");
        let second = TaskMessage::new(TaskId::new(), "b/y.tif");
        queue.send(&first).await.unwrap();
        queue.send(&second).await.unwrap();
        assert_eq!(queue.pending(), 2);

        assert_eq!(queue.receive().await.unwrap(), Some(first));
        assert_eq!(queue.receive().await.unwrap(), Some(second));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_cache_set_get_evict() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("status:x").await.unwrap(), None);
        cache.set("status:x", "processing").await.unwrap();
        assert_eq!(cache.get("status:x").await.unwrap().as_deref(), Some("processing"));
        assert!(cache.evict("status:x"));
        assert_eq!(cache.get("status:x").await.unwrap(), None);
    }
}
