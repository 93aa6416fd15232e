//! # hmdp-cache
//!
//! Read-through cache layer placed in front of a slower backing store.
//!
//! ## Overview
//!
//! [`CacheClient`] serves reads through one of three strategies:
//!
//! - **Pass-through**: cache-aside with negative caching. Ids the backing
//!   store does not have are remembered as tombstones for a short TTL, so
//!   repeated lookups of nonexistent ids never reach the backing store.
//! - **Mutex**: pass-through plus a [`DistributedLock`] per key. When a hot
//!   key expires, exactly one reader rebuilds it while the others retry.
//! - **Logical expiration**: entries live forever in the store and carry a
//!   logical deadline. Stale entries are served immediately while a
//!   [`RebuildDispatcher`] worker refreshes them in the background.
//!
//! Writes go through [`CacheClient::write_and_invalidate`]: persist first,
//! then evict the key.
//!
//! ## Example
//!
//! ```ignore
//! use hmdp_cache::prelude::*;
//!
//! let client = CacheClient::new(Arc::new(MemoryCacheStore::new()), CacheConfig::default());
//! let shops: Namespace<Shop> = Namespace::new("cache:shop:", "lock:shop:");
//!
//! let shop = client
//!     .query_with_mutex(&shops, 42, |id| async move { storage.get_shop(id).await })
//!     .await?;
//! ```
//!
//! ## Stores
//!
//! [`RedisCacheStore`] is the production backend. [`MemoryCacheStore`]
//! implements the same [`CacheStore`] contract in-process and is used for
//! tests and Redis-less deployments.

mod client;
mod config;
mod dispatcher;
mod entry;
mod error;
mod id_worker;
mod lock;
mod namespace;
pub mod store;
mod strategy;

pub use client::CacheClient;
pub use config::CacheConfig;
pub use dispatcher::{DispatcherStats, RebuildDispatcher, RebuildTask, Submission};
pub use entry::{
    CacheEntry, Codec, JsonCodec, Lookup, MsgPackCodec, TOMBSTONE, decode_lookup, encode_entry,
};
pub use error::{BoxError, CacheError, CacheResult, ErrorCategory};
pub use id_worker::{ID_EPOCH_SECS, IdWorker, timestamp_of};
pub use lock::{DistributedLock, LockGuard};
pub use namespace::{DEFAULT_NULL_TTL, DEFAULT_TTL, Namespace};
pub use store::{CacheStore, DynCacheStore, MemoryCacheStore, RedisCacheStore};
pub use strategy::ReadStrategy;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use hmdp_cache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::CacheClient;
    pub use crate::config::CacheConfig;
    pub use crate::entry::{Codec, JsonCodec, MsgPackCodec};
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::namespace::Namespace;
    pub use crate::store::{CacheStore, DynCacheStore, MemoryCacheStore, RedisCacheStore};
    pub use crate::strategy::ReadStrategy;
    pub use std::sync::Arc;
}
