//! Globally unique, roughly time-ordered 64-bit ids backed by the cache store.
//!
//! ```text
//!  63                 32 31                  0
//! ┌─────────────────────┬─────────────────────┐
//! │ seconds since epoch │ per-day sequence    │
//! └─────────────────────┴─────────────────────┘
//! sequence = INCR icr:{prefix}:{yyyy:mm:dd}
//! ```

use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::{CacheError, CacheResult};
use crate::store::DynCacheStore;

/// 2022-01-01T00:00:00Z.
pub const ID_EPOCH_SECS: i64 = 1_640_995_200;

const SEQUENCE_BITS: u32 = 32;

/// Allocates ids from per-prefix, per-day counters.
#[derive(Clone)]
pub struct IdWorker {
    store: DynCacheStore,
}

impl std::fmt::Debug for IdWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdWorker")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl IdWorker {
    pub fn new(store: DynCacheStore) -> Self {
        Self { store }
    }

    /// Next id for `prefix` (e.g. `"order"`).
    pub async fn next_id(&self, prefix: &str) -> CacheResult<i64> {
        self.next_id_at(prefix, OffsetDateTime::now_utc()).await
    }

    async fn next_id_at(&self, prefix: &str, now: OffsetDateTime) -> CacheResult<i64> {
        let timestamp = now.unix_timestamp() - ID_EPOCH_SECS;
        let day = now
            .format(format_description!("[year]:[month]:[day]"))
            .map_err(|e| CacheError::codec(format!("id day key: {e}")))?;
        let sequence = self.store.incr(&format!("icr:{prefix}:{day}")).await?;
        Ok(compose(timestamp, sequence))
    }
}

fn compose(timestamp: i64, sequence: i64) -> i64 {
    (timestamp << SEQUENCE_BITS) | (sequence & 0xFFFF_FFFF)
}

/// Seconds since [`ID_EPOCH_SECS`] encoded in `id`.
pub fn timestamp_of(id: i64) -> i64 {
    id >> SEQUENCE_BITS
}
