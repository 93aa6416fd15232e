//! Cache store abstraction.
//!
//! The cache layer never shares memory across requests: every coordination
//! primitive it needs (set-if-absent, conditional delete, counters) is a
//! [`CacheStore`] command, so the same code is correct across processes that
//! talk to one Redis instance.
//!
//! ## Backends
//!
//! - [`RedisCacheStore`]: shared store for multi-instance deployments
//! - [`MemoryCacheStore`]: in-process store for single instances and tests

mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

pub use self::memory::MemoryCacheStore;
pub use self::redis::RedisCacheStore;

/// Remote key-value store the cache layer is built on.
///
/// Implementations must be thread-safe (`Send + Sync`) and must make
/// [`CacheStore::set_if_absent`] and [`CacheStore::delete_if_equals`] atomic.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes a key, replacing any previous value and TTL.
    ///
    /// With `ttl == None` the key never expires.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()>;

    /// Writes a key only if it does not exist. Returns `true` iff this call
    /// created the key.
    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<bool>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Deletes a key only if it currently holds `expected`. Returns `true` iff
    /// the key was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> CacheResult<bool>;

    /// Refreshes the TTL of an existing key. Returns `false` if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Remaining TTL of a key. `None` if the key is missing or never expires.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Atomically increments an integer counter, creating it at 0 first.
    async fn incr(&self, key: &str) -> CacheResult<i64>;

    /// Whether the store answers right now. Used by health checks.
    async fn is_available(&self) -> bool;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared cache store trait object.
pub type DynCacheStore = Arc<dyn CacheStore>;
