//! Redis-backed queue and cache for multi-process deployments
//!
//! The queue is a Redis list: producers `LPUSH` JSON-encoded messages and
//! consumers `BRPOP` them, so each message goes to exactly one worker. The
//! cache is plain `SET`/`GET` on string keys.

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, AsyncConnectionConfig, Client};
use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::TaskMessage;

use super::kv_cache::CacheProvider;
use super::queue::QueueProvider;

async fn ping(conn: &mut MultiplexedConnection) -> bool {
    ::redis::cmd("PING")
        .query_async::<String>(conn)
        .await
        .map(|reply| reply == "PONG")
        .unwrap_or(false)
}

/// Status and result records in Redis
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connect to Redis at `url`, failing fast when unreachable
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::Config(format!("Invalid Redis URL: {}", e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::cache(format!("Failed to connect to Redis: {}", e)))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheProvider for RedisCache {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(ping(&mut self.conn.clone()).await)
    }

    fn name(&self) -> &str {
        "redis-cache"
    }
}

/// Task queue on a Redis list
pub struct RedisQueue {
    client: Client,
    conn: MultiplexedConnection,
    key: String,
    poll_timeout_secs: f64,
    blocking_config: AsyncConnectionConfig,
}

impl RedisQueue {
    /// Connect to Redis at `url` and use the list named `key`
    pub async fn connect(url: &str, key: &str, poll_timeout_secs: u64) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::Config(format!("Invalid Redis URL: {}", e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::dispatch(format!("Failed to connect to Redis: {}", e)))?;
        let poll_timeout_secs = poll_timeout_secs.max(1);
        let blocking_config = AsyncConnectionConfig::new()
            .set_response_timeout(Some(brpop_response_timeout(poll_timeout_secs)));
        Ok(Self {
            client,
            conn,
            key: key.to_string(),
            poll_timeout_secs: poll_timeout_secs as f64,
            blocking_config,
        })
    }
}

/// Client-side reply deadline for a `BRPOP` that blocks up to `poll_secs`.
///
/// Must outlast the server-side block, otherwise the client gives up on a
/// reply the server may still deliver and the popped message is lost.
fn brpop_response_timeout(poll_secs: u64) -> Duration {
    Duration::from_secs(poll_secs.max(1) + 5)
}

#[async_trait]
impl QueueProvider for RedisQueue {
    async fn send(&self, message: &TaskMessage) -> Result<()> {
        let body = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .lpush(&self.key, body)
            .await
            .map_err(|e| Error::dispatch(format!("LPUSH {} failed: {}", self.key, e)))?;
        Ok(())
    }

    async fn receive(&self) -> Result<Option<TaskMessage>> {
        // BRPOP blocks its connection, so each poll gets its own
        let mut conn = self
            .client
            .get_multiplexed_async_connection_with_config(&self.blocking_config)
            .await
            .map_err(|e| Error::dispatch(format!("Failed to connect to Redis: {}", e)))?;

        let popped: Option<(String, String)> = conn
            .brpop(&self.key, self.poll_timeout_secs)
            .await
            .map_err(|e| Error::dispatch(format!("BRPOP {} failed: {}", self.key, e)))?;

        match popped {
            Some((_, body)) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(ping(&mut self.conn.clone()).await)
    }

    fn name(&self) -> &str {
        "redis-list"
    }
}
