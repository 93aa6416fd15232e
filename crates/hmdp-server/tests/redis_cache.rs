//! Integration tests for the Redis-backed cache store factory.
//!
//! Tests use testcontainers to spin up a real Redis instance.
//!
//! Run with: cargo test -p hmdp-server --test redis_cache -- --ignored

use hmdp_cache::CacheStore;
use hmdp_server::{RedisConfig, create_cache_store};
use std::time::Duration;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

#[tokio::test]
async fn test_disabled_redis_uses_memory_store() {
    let store = create_cache_store(&RedisConfig::default()).await;
    assert_eq!(store.backend_name(), "memory");
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_memory() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".into(),
        pool_size: 2,
        timeout_ms: 200,
    };
    let store = create_cache_store(&config).await;
    assert_eq!(store.backend_name(), "memory");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_store_connection() {
    let config = RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 5,
        timeout_ms: 5000,
    };

    let store = create_cache_store(&config).await;
    assert_eq!(store.backend_name(), "redis");

    store
        .set("server:probe", b"value", Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(
        store.get("server:probe").await.unwrap(),
        Some(b"value".to_vec())
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_instances_share_entries_through_redis() {
    let config = RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 5,
        timeout_ms: 5000,
    };

    // Two stores simulate two server instances.
    let first = create_cache_store(&config).await;
    let second = create_cache_store(&config).await;

    assert!(
        first
            .set_if_absent("server:lock", b"owner-a", Duration::from_secs(10))
            .await
            .unwrap()
    );
    assert!(
        !second
            .set_if_absent("server:lock", b"owner-b", Duration::from_secs(10))
            .await
            .unwrap()
    );
    assert!(second.delete_if_equals("server:lock", b"owner-a").await.unwrap());
}
