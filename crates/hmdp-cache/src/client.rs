//! Cache client: owns the store, lock factory and rebuild dispatcher, and
//! exposes provisioning and write-invalidation. The read strategies live in
//! [`crate::strategy`].

use std::fmt::{self, Display};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::CacheConfig;
use crate::dispatcher::{DispatcherStats, RebuildDispatcher};
use crate::entry::{Codec, Lookup, decode_lookup, encode_entry};
use crate::error::{BoxError, CacheError, CacheResult};
use crate::lock::DistributedLock;
use crate::namespace::Namespace;
use crate::store::DynCacheStore;

/// Read-through cache in front of a backing store.
///
/// Cheap to share behind an `Arc`. Must be created inside a Tokio runtime
/// because it starts the rebuild workers.
pub struct CacheClient {
    pub(crate) store: DynCacheStore,
    pub(crate) lock: DistributedLock,
    pub(crate) dispatcher: RebuildDispatcher,
    pub(crate) config: CacheConfig,
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.store.backend_name())
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher.stats())
            .finish()
    }
}

impl CacheClient {
    /// Creates a client and starts its rebuild workers.
    pub fn new(store: DynCacheStore, config: CacheConfig) -> Self {
        let lock = DistributedLock::new(store.clone(), config.lock_ttl());
        let dispatcher =
            RebuildDispatcher::start(config.rebuild_workers, config.rebuild_queue_capacity);
        Self {
            store,
            lock,
            dispatcher,
            config,
        }
    }

    pub fn store(&self) -> &DynCacheStore {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn dispatcher_stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }

    /// Stops the rebuild workers after draining queued rebuilds.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }

    /// Writes `value` with the namespace's physical TTL.
    pub async fn put<V, C>(&self, ns: &Namespace<V, C>, id: impl Display, value: &V) -> CacheResult<()>
    where
        V: Serialize,
        C: Codec,
    {
        let key = ns.key(&id);
        let bytes = encode_entry(ns.codec(), value, None)?;
        self.store.set(&key, &bytes, Some(ns.ttl())).await
    }

    /// Writes `value` without physical TTL, logically fresh for the
    /// namespace's TTL. Used to warm up logical-expiration namespaces.
    pub async fn put_with_logical_expire<V, C>(
        &self,
        ns: &Namespace<V, C>,
        id: impl Display,
        value: &V,
    ) -> CacheResult<()>
    where
        V: Serialize,
        C: Codec,
    {
        let key = ns.key(&id);
        let expire_at = logical_deadline(ns.ttl());
        let bytes = encode_entry(ns.codec(), value, Some(expire_at))?;
        self.store.set(&key, &bytes, None).await?;
        debug!(key = %key, expire_at = %expire_at, "cache warmed");
        Ok(())
    }

    /// Deletes the cached entry for `id`.
    pub async fn invalidate<V, C>(&self, ns: &Namespace<V, C>, id: impl Display) -> CacheResult<()>
    where
        C: Codec,
    {
        let key = ns.key(&id);
        self.store.delete(&key).await?;
        debug!(key = %key, "cache invalidated");
        Ok(())
    }

    /// Persists a record, then evicts its cache entry.
    ///
    /// Nothing is written back: the next reader repopulates the key through
    /// whichever strategy serves it. If `persist` fails the cache is left
    /// untouched.
    pub async fn write_and_invalidate<V, C, ID, Fut, T, E>(
        &self,
        ns: &Namespace<V, C>,
        id: ID,
        persist: Fut,
    ) -> CacheResult<T>
    where
        C: Codec,
        ID: Display,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let written = persist.await.map_err(CacheError::backing_store)?;
        self.invalidate(ns, id).await?;
        Ok(written)
    }

    pub(crate) async fn lookup<V, C>(&self, ns: &Namespace<V, C>, key: &str) -> CacheResult<Lookup<V>>
    where
        V: DeserializeOwned,
        C: Codec,
    {
        let raw = self.store.get(key).await?;
        decode_lookup(ns.codec(), raw)
    }
}

pub(crate) fn logical_deadline(ttl: Duration) -> OffsetDateTime {
    OffsetDateTime::now_utc() + ttl
}
