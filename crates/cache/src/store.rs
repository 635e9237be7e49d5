//! Keyed cache store over Redis.
//!
//! [`CacheStore`] wraps a [`ConnectionManager`] (multiplexed connection with
//! automatic reconnect) and exposes the handful of operations the rest of
//! the workspace needs: byte-level get/set-with-TTL, delete, SCAN-based
//! pattern delete, and a ping health check. Values here are hints, never
//! authoritative — Postgres is the source of truth, and every caller that
//! must degrade gracefully does so in the facade layer above.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Errors from the underlying key-value store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection failed: {0}")]
    Connect(#[source] redis::RedisError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("Cache value serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Shared handle to the key-value store. Cheap to clone.
#[derive(Clone)]
pub struct CacheStore {
    conn: ConnectionManager,
}

impl CacheStore {
    /// Connect to Redis at the given URL (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Owned by the process's composition root; pass clones to every
    /// component that needs store access.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(CacheError::Connect)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(CacheError::Connect)?;
        Ok(Self { conn })
    }

    /// Round-trip a PING to verify the store is reachable.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Fetch raw bytes for a key. `None` if absent or expired.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    /// Store raw bytes under a key with a TTL. Overwrites any existing value.
    pub async fn set_bytes(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let ttl_seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    /// Remove a key. Returns whether a value was actually removed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    /// Remove every key starting with `prefix`. Returns the number removed.
    ///
    /// Uses cursor-based SCAN rather than KEYS so large keyspaces never
    /// block the server. Keys are collected first, then deleted in one
    /// batch, since the scan iterator holds the connection.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, String> = conn.scan_match(&pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: i64 = conn.del(&keys).await?;
        Ok(removed as usize)
    }

    /// Borrow the underlying connection manager.
    ///
    /// The lock manager needs direct command access (SET NX EX, Lua
    /// scripts) that the byte-level API deliberately does not expose.
    pub(crate) fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}
