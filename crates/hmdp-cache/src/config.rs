use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables shared by every namespace served by one [`crate::CacheClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Safety TTL of rebuild locks, in seconds.
    /// Default: 10
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Sleep between lock attempts in the mutex strategy, in milliseconds.
    /// Default: 50
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Longest a mutex reader waits for a busy lock, in milliseconds.
    /// Default: the lock TTL
    #[serde(default)]
    pub max_lock_wait_ms: Option<u64>,

    /// Number of rebuild workers.
    /// Default: 10
    #[serde(default = "default_rebuild_workers")]
    pub rebuild_workers: usize,

    /// Rebuild tasks that may wait for a worker before new ones are dropped.
    /// Default: 1024
    #[serde(default = "default_rebuild_queue_capacity")]
    pub rebuild_queue_capacity: usize,
}

fn default_lock_ttl_secs() -> u64 {
    10
}

fn default_retry_interval_ms() -> u64 {
    50
}

fn default_rebuild_workers() -> usize {
    10
}

fn default_rebuild_queue_capacity() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_lock_ttl_secs(),
            retry_interval_ms: default_retry_interval_ms(),
            max_lock_wait_ms: None,
            rebuild_workers: default_rebuild_workers(),
            rebuild_queue_capacity: default_rebuild_queue_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_ttl_secs == 0 {
            return Err("cache.lock_ttl_secs must be > 0".into());
        }
        if self.retry_interval_ms == 0 {
            return Err("cache.retry_interval_ms must be > 0".into());
        }
        if self.rebuild_workers == 0 {
            return Err("cache.rebuild_workers must be > 0".into());
        }
        if self.rebuild_queue_capacity == 0 {
            return Err("cache.rebuild_queue_capacity must be > 0".into());
        }
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn max_lock_wait(&self) -> Duration {
        self.max_lock_wait_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.lock_ttl())
    }
}
