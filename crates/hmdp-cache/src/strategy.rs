//! Read strategies.
//!
//! | strategy | miss | stale | protects against |
//! |----------|------|-------|------------------|
//! | [`CacheClient::query_with_pass_through`] | fetch, cache or tombstone | n/a (physical TTL) | penetration |
//! | [`CacheClient::query_with_mutex`] | one fetch per key, others wait | n/a (physical TTL) | penetration, breakdown |
//! | [`CacheClient::query_with_logical_expire`] | `None`, never fetches | return stale, rebuild in background | breakdown, avalanche |
//!
//! Cache writes that follow a successful fetch are best-effort: a failing
//! `SET` is logged and the fetched value is still returned.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{CacheClient, logical_deadline};
use crate::dispatcher::{RebuildTask, Submission};
use crate::entry::{Codec, Lookup, TOMBSTONE, encode_entry};
use crate::error::{BoxError, CacheError, CacheResult};
use crate::namespace::Namespace;
use crate::store::DynCacheStore;

/// Strategy selector for call sites that choose at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    PassThrough,
    #[default]
    Mutex,
    LogicalExpire,
}

impl CacheClient {
    /// Runs the selected strategy.
    pub async fn query<V, C, ID, F, Fut, E>(
        &self,
        strategy: ReadStrategy,
        ns: &Namespace<V, C>,
        id: ID,
        fetch: F,
    ) -> CacheResult<Option<V>>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        C: Codec,
        ID: Display + Send + 'static,
        F: FnOnce(ID) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<V>, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        match strategy {
            ReadStrategy::PassThrough => self.query_with_pass_through(ns, id, fetch).await,
            ReadStrategy::Mutex => self.query_with_mutex(ns, id, fetch).await,
            ReadStrategy::LogicalExpire => self.query_with_logical_expire(ns, id, fetch).await,
        }
    }

    /// Cache-aside read with negative caching.
    ///
    /// A tombstone answers `None` without touching the backing store. On a
    /// miss the fetch result is cached with the namespace TTL, or a tombstone
    /// with the null TTL if the record does not exist. Concurrent misses on
    /// one key all reach the backing store.
    ///
    /// # Errors
    ///
    /// `CacheError::BackingStore` if `fetch` fails, `Store`/`Codec` if the
    /// cached payload cannot be read.
    pub async fn query_with_pass_through<V, C, ID, F, Fut, E>(
        &self,
        ns: &Namespace<V, C>,
        id: ID,
        fetch: F,
    ) -> CacheResult<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        C: Codec,
        ID: Display,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: Into<BoxError>,
    {
        let key = ns.key(&id);
        match self.lookup(ns, &key).await? {
            Lookup::Hit(entry) => Ok(Some(entry.value)),
            Lookup::Absent => {
                debug!(key = %key, "tombstone hit");
                Ok(None)
            }
            Lookup::Miss => self.load_and_fill(ns, &key, id, fetch).await,
        }
    }

    /// Cache-aside read where only the lock holder may fetch a key.
    ///
    /// Readers that lose the lock race sleep `retry_interval` and start over,
    /// until the entry appears or `max_lock_wait` has elapsed.
    ///
    /// # Errors
    ///
    /// As [`CacheClient::query_with_pass_through`], plus
    /// `CacheError::LockTimeout` when the lock stays busy for longer than
    /// `max_lock_wait`.
    pub async fn query_with_mutex<V, C, ID, F, Fut, E>(
        &self,
        ns: &Namespace<V, C>,
        id: ID,
        fetch: F,
    ) -> CacheResult<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        C: Codec,
        ID: Display,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: Into<BoxError>,
    {
        let key = ns.key(&id);
        let lock_key = ns.lock_key(&id);
        let started = Instant::now();
        let max_wait = self.config.max_lock_wait();
        let mut attempts: u32 = 0;

        loop {
            match self.lookup(ns, &key).await? {
                Lookup::Hit(entry) => return Ok(Some(entry.value)),
                Lookup::Absent => return Ok(None),
                Lookup::Miss => {}
            }

            if let Some(guard) = self.lock.try_acquire(&lock_key).await? {
                // Re-check: the previous holder may have filled the key
                // between our miss and our acquisition.
                let result = match self.lookup(ns, &key).await {
                    Ok(Lookup::Hit(entry)) => Ok(Some(entry.value)),
                    Ok(Lookup::Absent) => Ok(None),
                    Ok(Lookup::Miss) => self.load_and_fill(ns, &key, id, fetch).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = guard.release().await {
                    debug!(lock = %lock_key, error = %e, "lock left to expire");
                }
                return result;
            }

            attempts += 1;
            let waited = started.elapsed();
            if waited >= max_wait {
                warn!(key = %key, attempts, waited_ms = waited.as_millis() as u64, "gave up waiting for rebuild lock");
                return Err(CacheError::lock_timeout(lock_key, waited));
            }
            debug!(key = %key, attempts, "rebuild lock busy, retrying");
            tokio::time::sleep(self.config.retry_interval()).await;
        }
    }

    /// Read that never blocks on the backing store.
    ///
    /// A bare miss returns `None`: the key has to be provisioned first, e.g.
    /// with [`CacheClient::put_with_logical_expire`]. A logically expired
    /// entry is returned as-is while at most one background rebuild per lock
    /// window refreshes it.
    ///
    /// # Errors
    ///
    /// `Store`/`Codec` if the cached payload cannot be read. Lock and
    /// dispatcher failures are logged, never returned.
    pub async fn query_with_logical_expire<V, C, ID, F, Fut, E>(
        &self,
        ns: &Namespace<V, C>,
        id: ID,
        fetch: F,
    ) -> CacheResult<Option<V>>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        C: Codec,
        ID: Display + Send + 'static,
        F: FnOnce(ID) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<V>, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let key = ns.key(&id);
        let entry = match self.lookup(ns, &key).await? {
            Lookup::Hit(entry) => entry,
            Lookup::Absent | Lookup::Miss => return Ok(None),
        };

        if !entry.is_expired(OffsetDateTime::now_utc()) {
            return Ok(Some(entry.value));
        }

        let lock_key = ns.lock_key(&id);
        match self.lock.try_acquire(&lock_key).await {
            Ok(Some(guard)) => {
                let refresh = rebuild_logical(
                    self.store.clone(),
                    ns.codec().clone(),
                    key.clone(),
                    ns.ttl(),
                    id,
                    fetch,
                );
                match self.dispatcher.submit(RebuildTask::new(key.clone(), guard, refresh)) {
                    Ok(Submission::Queued) => debug!(key = %key, "stale entry, rebuild queued"),
                    Ok(Submission::Dropped) => debug!(key = %key, "stale entry, rebuild dropped"),
                    Err(e) => warn!(key = %key, error = %e, "stale entry, rebuild rejected"),
                }
            }
            Ok(None) => debug!(key = %key, "stale entry, rebuild already in flight"),
            Err(e) => warn!(key = %key, error = %e, "stale entry, rebuild lock unavailable"),
        }

        Ok(Some(entry.value))
    }

    /// Fetches `id` and caches the value, or a tombstone if it does not exist.
    async fn load_and_fill<V, C, ID, F, Fut, E>(
        &self,
        ns: &Namespace<V, C>,
        key: &str,
        id: ID,
        fetch: F,
    ) -> CacheResult<Option<V>>
    where
        V: Serialize,
        C: Codec,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: Into<BoxError>,
    {
        let fetched = fetch(id).await.map_err(CacheError::backing_store)?;

        let Some(value) = fetched else {
            if let Err(e) = self.store.set(key, TOMBSTONE, Some(ns.null_ttl())).await {
                warn!(key = %key, error = %e, "failed to write tombstone");
            } else {
                debug!(key = %key, ttl_ms = ns.null_ttl().as_millis() as u64, "tombstone written");
            }
            return Ok(None);
        };

        let bytes = encode_entry(ns.codec(), &value, None)?;
        if let Err(e) = self.store.set(key, &bytes, Some(ns.ttl())).await {
            warn!(key = %key, error = %e, "failed to cache fetched value");
        }
        Ok(Some(value))
    }
}

/// Background refresh for a logically expired entry.
///
/// A record that vanished from the backing store keeps its stale entry;
/// write invalidation is what removes entries for deleted records.
async fn rebuild_logical<V, C, ID, F, Fut, E>(
    store: DynCacheStore,
    codec: C,
    key: String,
    window: std::time::Duration,
    id: ID,
    fetch: F,
) -> CacheResult<()>
where
    V: Serialize,
    C: Codec,
    F: FnOnce(ID) -> Fut,
    Fut: Future<Output = Result<Option<V>, E>>,
    E: Into<BoxError>,
{
    let Some(value) = fetch(id).await.map_err(CacheError::backing_store)? else {
        warn!(key = %key, "record missing during rebuild, keeping stale entry");
        return Ok(());
    };
    let bytes = encode_entry(&codec, &value, Some(logical_deadline(window)))?;
    store.set(&key, &bytes, None).await
}
