pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod observability;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

pub use cache::{CacheError, CacheStore, LocalCacheStore, RedisCacheStore, UserCache};
pub use config::{AppConfig, CacheBackendKind, CacheConfig, MailConfig, RedisConfig, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use mailer::{LoggingMailer, Mailer};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{AppState, GopherSocialServer, ServerBuilder, build_app};

/// Create the identity cache backend selected by `cache.backend`.
///
/// ## Backends
///
/// - **local**: in-process DashMap, one cache per instance
/// - **redis**: shared pool; the connection is tested before returning
///
/// Unlike a best-effort cache, a configured Redis that cannot be reached is a
/// startup error rather than a silent fallback to the local backend.
pub async fn create_cache_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.cache.backend {
        CacheBackendKind::Local => {
            tracing::info!("using local identity cache");
            Ok(Arc::new(LocalCacheStore::new()))
        }
        CacheBackendKind::Redis => {
            let redis = &config.redis;
            tracing::info!(url = %redis.url, "connecting to Redis");

            let timeout = Duration::from_millis(redis.timeout_ms);
            let mut redis_config = deadpool_redis::Config::from_url(&redis.url);
            let mut pool_config = deadpool_redis::PoolConfig::new(redis.pool_size);
            pool_config.timeouts.wait = Some(timeout);
            pool_config.timeouts.create = Some(timeout);
            pool_config.timeouts.recycle = Some(timeout);
            redis_config.pool = Some(pool_config);

            let pool = redis_config
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .map_err(|e| CacheError::backend(format!("failed to create Redis pool: {e}")))?;

            pool.get()
                .await
                .map_err(|e| CacheError::backend(format!("failed to connect to Redis: {e}")))?;
            tracing::info!("connected to Redis");

            Ok(Arc::new(RedisCacheStore::new(pool)))
        }
    }
}
