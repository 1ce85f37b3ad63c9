//! Key/value cache backends: local (DashMap) and Redis.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use tokio::time::Instant;

/// Errors raised by a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("cache backend error: {message}")]
    Backend { message: String },

    /// A cached value could not be encoded or decoded.
    #[error("cache serialization error: {message}")]
    Serialization { message: String },
}

impl CacheError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

/// Byte-level cache store with per-entry TTL.
///
/// `get` distinguishes a miss (`Ok(None)`) from a failure (`Err`).
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration)
    -> Result<(), CacheError>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Local
// =============================================================================

/// A cached entry with its expiry.
#[derive(Clone, Debug)]
struct CachedEntry {
    data: Arc<Vec<u8>>,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY: usize = 64;

/// Single-instance store backed by a `DashMap`.
///
/// Expired entries are dropped when read, and every 64 writes
/// the whole map is swept so keys that are never read again do not pile up.
#[derive(Clone, Debug, Default)]
pub struct LocalCacheStore {
    map: Arc<DashMap<String, CachedEntry>>,
    writes: Arc<AtomicUsize>,
}

impl LocalCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some(entry) = self.map.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.data.as_ref().clone()));
            }
            drop(entry);
            self.map.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.map.insert(key.to_string(), CachedEntry::new(value, ttl));

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY == 0 {
            let before = self.map.len();
            self.map.retain(|_, entry| !entry.is_expired());
            let removed = before.saturating_sub(self.map.len());
            tracing::debug!(removed, "local cache swept");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

// =============================================================================
// Redis
// =============================================================================

/// Shared store backed by Redis (`GET` / `SET EX`).
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("pool_size", &self.pool.status().size)
            .finish()
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to get Redis connection");
            CacheError::backend(e.to_string())
        })?;

        conn.get::<_, Option<Vec<u8>>>(key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis GET error");
            CacheError::backend(e.to_string())
        })
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to get Redis connection");
            CacheError::backend(e.to_string())
        })?;

        // SET EX takes whole seconds and rejects zero.
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Redis SET error");
                CacheError::backend(e.to_string())
            })?;

        tracing::debug!(key = %key, ttl_secs, "cache set (redis)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
