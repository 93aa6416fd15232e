//! Redis cache store.
//!
//! Uses a `deadpool-redis` connection pool. Commands are issued with
//! millisecond precision (`PX`, `PEXPIRE`, `PTTL`) so short TTLs used by
//! locks and tombstones are honoured exactly.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use tracing::debug;

use super::CacheStore;
use crate::error::CacheResult;

/// Deletes KEYS[1] only if it still holds ARGV[1].
const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Shared cache store for multi-instance deployments.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
    compare_and_delete: redis::Script,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("pool", &self.pool.status())
            .finish()
    }
}

impl RedisCacheStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            compare_and_delete: redis::Script::new(COMPARE_AND_DELETE),
        }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;

        if value.is_some() {
            debug!(key = %key, "cache hit");
        } else {
            debug!(key = %key, "cache miss");
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        let () = cmd.query_async(&mut conn).await?;

        debug!(key = %key, ttl_ms = ?ttl.map(millis), "cache set");
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        debug!(key = %key, "cache delete");
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let mut conn = self.pool.get().await?;
        // -2: missing, -1: no expiry
        let remaining: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(u64::try_from(remaining).ok().map(Duration::from_millis))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.pool.get().await?;
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn is_available(&self) -> bool {
        let Ok(mut conn) = self.pool.get().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        matches!(pong.as_deref(), Ok("PONG"))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_never_zero() {
        assert_eq!(millis(Duration::ZERO), 1);
        assert_eq!(millis(Duration::from_micros(10)), 1);
        assert_eq!(millis(Duration::from_secs(10)), 10_000);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let pool = deadpool_redis::Config::from_url("redis://127.0.0.1:1")
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .unwrap();
        let store = RedisCacheStore::new(pool);
        assert!(!store.is_available().await);
    }
}
