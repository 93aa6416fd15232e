//! In-process cache store backed by `DashMap`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::CacheStore;
use crate::error::{CacheError, CacheResult};

/// A stored value with optional deadline.
///
/// Deadlines use `tokio::time::Instant` so paused-clock tests can advance
/// past a TTL without sleeping.
#[derive(Clone, Debug)]
struct StoredBytes {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredBytes {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Single-instance cache store.
///
/// Expired keys are removed on the next access of the same key, or by
/// [`MemoryCacheStore::cleanup_expired`]. Cloning shares the underlying map.
#[derive(Clone, Debug, Default)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, StoredBytes>>,
}

impl MemoryCacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Returns `true` if no live key is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired key. Returns the number of keys removed.
    pub fn cleanup_expired(&self) -> usize {
        purge_expired(&self.entries)
    }

    /// Starts a background task that calls [`cleanup_expired`] every
    /// `interval`.
    ///
    /// The task only holds a weak reference to the map and exits once the
    /// last clone of this store is dropped.
    ///
    /// [`cleanup_expired`]: MemoryCacheStore::cleanup_expired
    pub fn start_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        tokio::spawn(cleanup_loop(entries, interval))
    }
}

fn purge_expired(entries: &DashMap<String, StoredBytes>) -> usize {
    let now = Instant::now();
    let mut removed = 0;
    entries.retain(|_, entry| {
        if entry.is_expired(now) {
            removed += 1;
            false
        } else {
            true
        }
    });
    removed
}

async fn cleanup_loop(entries: Weak<DashMap<String, StoredBytes>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(entries) = entries.upgrade() else {
            tracing::debug!("cache store dropped, stopping cleanup task");
            return;
        };
        let removed = purge_expired(&entries);
        if removed > 0 {
            tracing::debug!(removed, "expired cache keys reclaimed");
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.data.clone()));
            }
            drop(entry);
            self.entries.remove_if(key, |_, v| v.is_expired(now));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        self.entries
            .insert(key.to_string(), StoredBytes::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let created = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(StoredBytes::new(value.to_vec(), Some(ttl)));
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredBytes::new(value.to_vec(), Some(ttl)));
                true
            }
        };
        Ok(created)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> CacheResult<bool> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(key, |_, v| !v.is_expired(now) && v.data == expected);
        Ok(removed.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredBytes::new(b"0".to_vec(), None));
        if entry.is_expired(now) {
            *entry = StoredBytes::new(b"0".to_vec(), None);
        }
        let current: i64 = std::str::from_utf8(&entry.data)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CacheError::store(format!("value at {key} is not an integer")))?;
        let next = current + 1;
        entry.data = next.to_string().into_bytes();
        Ok(next)
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
