//! Distributed per-key lock built on the cache store's set-if-absent.
//!
//! ## Protocol
//!
//! ```text
//! acquire:  SET lock:shop:42 <owner-token> NX PX <ttl>   → created? guard : None
//! release:  DEL lock:shop:42 only if value == <owner-token>
//! ```
//!
//! Each acquisition stores a fresh UUID v4 owner token, so a holder whose lock
//! expired and was re-acquired by someone else cannot delete the new holder's
//! lock. A crashed holder's lock disappears after `ttl`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CacheResult;
use crate::store::DynCacheStore;

/// Factory for per-key locks sharing one store and TTL.
#[derive(Clone)]
pub struct DistributedLock {
    store: DynCacheStore,
    ttl: Duration,
}

impl fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedLock")
            .field("backend", &self.store.backend_name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl DistributedLock {
    /// Creates a lock factory. `ttl` bounds how long a lost holder blocks others.
    pub fn new(store: DynCacheStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Safety TTL applied to every acquisition.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Attempts to take `key`. Returns `None` if another holder has it.
    ///
    /// At most one caller receives a guard for a given key within one TTL
    /// window.
    pub async fn try_acquire(&self, key: &str) -> CacheResult<Option<LockGuard>> {
        let token = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .set_if_absent(key, token.as_bytes(), self.ttl)
            .await?;

        if !acquired {
            debug!(lock = %key, "lock busy");
            return Ok(None);
        }

        debug!(lock = %key, ttl_ms = self.ttl.as_millis() as u64, "lock acquired");
        Ok(Some(LockGuard {
            store: Arc::clone(&self.store),
            key: key.to_string(),
            token,
            released: false,
        }))
    }
}

/// Proof of holding a lock.
///
/// Call [`LockGuard::release`] when done. A guard dropped without release
/// (early return, cancelled future, panic) schedules the same conditional
/// delete on the current Tokio runtime.
#[must_use = "dropping a lock guard releases it in the background"]
pub struct LockGuard {
    store: DynCacheStore,
    key: String,
    token: String,
    released: bool,
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl LockGuard {
    /// The lock key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the lock if this guard still owns it.
    ///
    /// Returns `false` when the lock had already expired (and possibly been
    /// taken by another holder); the other holder's lock is left untouched.
    pub async fn release(mut self) -> CacheResult<bool> {
        let result = self
            .store
            .delete_if_equals(&self.key, self.token.as_bytes())
            .await;
        self.released = true;

        match &result {
            Ok(true) => debug!(lock = %self.key, "lock released"),
            Ok(false) => warn!(lock = %self.key, "lock expired before release"),
            Err(e) => warn!(lock = %self.key, error = %e, "lock release failed"),
        }
        result
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(lock = %self.key, "lock guard dropped outside a runtime, waiting for TTL");
            return;
        };

        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        handle.spawn(async move {
            if let Err(e) = store.delete_if_equals(&key, token.as_bytes()).await {
                warn!(lock = %key, error = %e, "background lock release failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CacheStore, MemoryCacheStore};

    fn lock(ttl: Duration) -> (Arc<MemoryCacheStore>, DistributedLock) {
        let store = Arc::new(MemoryCacheStore::new());
        let lock = DistributedLock::new(store.clone(), ttl);
        (store, lock)
    }

    #[tokio::test]
    async fn test_single_holder() {
        let (_, lock) = lock(Duration::from_secs(10));
        let guard = lock.try_acquire("lock:shop:1").await.unwrap().unwrap();
        assert!(lock.try_acquire("lock:shop:1").await.unwrap().is_none());
        assert!(lock.try_acquire("lock:shop:2").await.unwrap().is_some());

        assert!(guard.release().await.unwrap());
        assert!(lock.try_acquire("lock:shop:1").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_holder_cannot_release_new_holder() {
        let (store, lock) = lock(Duration::from_secs(10));
        let stale = lock.try_acquire("lock:shop:1").await.unwrap().unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        let fresh = lock.try_acquire("lock:shop:1").await.unwrap().unwrap();

        assert!(!stale.release().await.unwrap());
        assert!(store.get("lock:shop:1").await.unwrap().is_some());
        assert!(fresh.release().await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_in_background() {
        let (store, lock) = lock(Duration::from_secs(10));
        drop(lock.try_acquire("lock:shop:1").await.unwrap().unwrap());

        for _ in 0..100 {
            if store.get("lock:shop:1").await.unwrap().is_none() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("dropped guard did not release the lock");
    }
}
