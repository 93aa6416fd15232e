pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod response;
pub mod server;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use hmdp_cache::{CacheStore, DynCacheStore, MemoryCacheStore, RedisCacheStore};

pub use config::{AppConfig, RedisConfig};
pub use error::ServiceError;
pub use response::ApiResponse;
pub use server::{HmdpServer, ServerBuilder, build_app};
pub use service::ShopService;

/// How often the in-process store reclaims expired keys.
const MEMORY_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Creates the cache store based on configuration.
///
/// If Redis is disabled, an in-process store is used.
///
/// ## Graceful Degradation
///
/// If the Redis pool cannot be created or the server does not answer, the
/// system falls back to the in-process store. A single instance keeps working;
/// multiple instances lose shared locks and shared entries until restarted
/// with Redis available.
pub async fn create_cache_store(config: &RedisConfig) -> DynCacheStore {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-process cache store");
        return memory_store();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(config.timeout());
    pool_config.timeouts.create = Some(config.timeout());
    pool_config.timeouts.recycle = Some(config.timeout());
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to in-process cache store."
            );
            return memory_store();
        }
    };

    let store = RedisCacheStore::new(pool);
    if store.is_available().await {
        tracing::info!("Connected to Redis successfully");
        Arc::new(store)
    } else {
        tracing::warn!(
            url = %config.url,
            "Redis unreachable. Falling back to in-process cache store."
        );
        memory_store()
    }
}

fn memory_store() -> DynCacheStore {
    let store = MemoryCacheStore::new();
    store.start_cleanup_task(MEMORY_CLEANUP_INTERVAL);
    Arc::new(store)
}
