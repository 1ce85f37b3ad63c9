//! Identity cache: MessagePack user snapshots keyed by id.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gophersocial_storage::User;
use serde::Serialize;

use super::backend::{CacheError, CacheStore};

/// Hit/miss counters for the identity cache.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of the identity cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserCacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Read-through cache of [`User`] records.
///
/// Snapshots are written with a fixed TTL and never invalidated, so a reader
/// may see a record up to one TTL old.
#[derive(Clone)]
pub struct UserCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    counters: Arc<Counters>,
}

impl UserCache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            counters: Arc::default(),
        }
    }

    fn key(id: i64) -> String {
        format!("user-{id}")
    }

    /// Looks up a snapshot. `Ok(None)` is a miss.
    ///
    /// # Errors
    ///
    /// Backend failures and undecodable snapshots.
    pub async fn get(&self, id: i64) -> Result<Option<User>, CacheError> {
        let Some(bytes) = self.store.get(&Self::key(id)).await? else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(user_id = id, "identity cache miss");
            return Ok(None);
        };

        let user = rmp_serde::from_slice::<User>(&bytes)
            .map_err(|e| CacheError::serialization(e.to_string()))?;
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(user_id = id, "identity cache hit");
        Ok(Some(user))
    }

    /// Stores a snapshot of `user`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Backend failures and encoding errors.
    pub async fn set(&self, user: &User) -> Result<(), CacheError> {
        let bytes =
            rmp_serde::to_vec_named(user).map_err(|e| CacheError::serialization(e.to_string()))?;
        self.store
            .set_with_ttl(&Self::key(user.id), bytes, self.ttl)
            .await
    }

    #[must_use]
    pub fn stats(&self) -> UserCacheStats {
        UserCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }
}

impl std::fmt::Debug for UserCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCache")
            .field("backend", &self.store.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
