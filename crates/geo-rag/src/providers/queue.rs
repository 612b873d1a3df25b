//! Queue provider trait decoupling submission from processing

use async_trait::async_trait;
use crate::error::Result;
use crate::types::TaskMessage;

/// Trait for the task message transport
///
/// Each message is delivered to exactly one consumer at a time; there is no
/// ordering guarantee across messages.
///
/// Implementations:
/// - `ChannelQueue`: In-process tokio channel
/// - `RedisQueue`: Redis list shared between processes (feature `redis`)
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Enqueue a message
    async fn send(&self, message: &TaskMessage) -> Result<()>;

    /// Wait for the next message.
    ///
    /// Returns `Ok(None)` when no message arrived within the backend's poll
    /// window; callers simply poll again.
    async fn receive(&self) -> Result<Option<TaskMessage>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
