//! Shop use cases served through the cache layer.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use hmdp_cache::{CacheClient, CacheStore, IdWorker, Namespace, ReadStrategy};
use hmdp_storage::{DynShopStorage, Shop, ShopStorage, ShopType};
use tracing::{info, warn};

use crate::config::ShopCacheConfig;
use crate::error::ServiceError;

const SHOP_ID_PREFIX: &str = "shop";
const WARM_UP_CONCURRENCY: usize = 8;

/// Shop reads, writes and warm-up.
pub struct ShopService {
    cache: Arc<CacheClient>,
    storage: DynShopStorage,
    ids: IdWorker,
    shops: Namespace<Shop>,
    shop_types: Namespace<Vec<ShopType>>,
    strategy: ReadStrategy,
}

impl std::fmt::Debug for ShopService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopService")
            .field("storage", &self.storage.backend_name())
            .field("strategy", &self.strategy)
            .field("shops", &self.shops)
            .finish_non_exhaustive()
    }
}

impl ShopService {
    pub fn new(cache: Arc<CacheClient>, storage: DynShopStorage, config: &ShopCacheConfig) -> Self {
        let shops = Namespace::new(config.key_prefix.clone(), config.lock_prefix.clone())
            .with_ttl(config.ttl())
            .with_null_ttl(config.null_ttl());
        // The type list lives under one fixed key, so the id part is empty.
        let shop_types = Namespace::new(
            config.type_list_key.clone(),
            format!("lock:{}", config.type_list_key),
        )
        .with_ttl(config.type_list_ttl())
        .with_null_ttl(config.null_ttl());

        Self {
            ids: IdWorker::new(cache.store().clone()),
            cache,
            storage,
            shops,
            shop_types,
            strategy: config.strategy,
        }
    }

    pub fn strategy(&self) -> ReadStrategy {
        self.strategy
    }

    pub fn cache(&self) -> &Arc<CacheClient> {
        &self.cache
    }

    /// Reads a shop through the configured strategy.
    pub async fn query_by_id(&self, id: i64) -> Result<Shop, ServiceError> {
        let storage = Arc::clone(&self.storage);
        let shop = self
            .cache
            .query(self.strategy, &self.shops, id, move |id| async move {
                storage.get_shop(id).await
            })
            .await?;
        shop.ok_or_else(|| ServiceError::not_found("Shop", id))
    }

    /// Persists `shop`, then evicts its cache entry.
    ///
    /// Under logical expiration the entry is re-provisioned from the backing
    /// store, since that strategy never fills a bare miss.
    pub async fn update(&self, shop: Shop) -> Result<Shop, ServiceError> {
        let Some(id) = shop.id else {
            return Err(ServiceError::validation("shop id is required"));
        };
        let updated = self
            .cache
            .write_and_invalidate(&self.shops, id, self.storage.update_shop(&shop))
            .await?;

        if self.strategy == ReadStrategy::LogicalExpire {
            if let Err(e) = self.warm_up_one(id).await {
                warn!(shop_id = id, error = %e, "failed to re-provision updated shop");
            }
        }
        info!(shop_id = id, "shop updated");
        Ok(updated)
    }

    /// Persists a new shop under a fresh id.
    ///
    /// A tombstone left by an earlier lookup of the same id is evicted, and
    /// under logical expiration the new shop is provisioned right away since
    /// that strategy never fills a bare miss.
    pub async fn create(&self, mut shop: Shop) -> Result<Shop, ServiceError> {
        let id = self.ids.next_id(SHOP_ID_PREFIX).await?;
        shop.id = Some(id);

        let created = self
            .cache
            .write_and_invalidate(&self.shops, id, self.storage.create_shop(&shop))
            .await?;

        if self.strategy == ReadStrategy::LogicalExpire {
            if let Err(e) = self
                .cache
                .put_with_logical_expire(&self.shops, id, &created)
                .await
            {
                warn!(shop_id = id, error = %e, "failed to provision new shop");
            }
        }
        info!(shop_id = id, "shop created");
        Ok(created)
    }

    /// All shop types, sorted, cached under one key.
    pub async fn list_shop_types(&self) -> Result<Vec<ShopType>, ServiceError> {
        let storage = Arc::clone(&self.storage);
        let types = self
            .cache
            .query_with_pass_through(&self.shop_types, "", move |_| async move {
                storage.list_shop_types().await.map(Some)
            })
            .await?;
        Ok(types.unwrap_or_default())
    }

    /// Provisions `ids` as logically expiring entries. Returns how many were
    /// found in the backing store and written.
    pub async fn warm_up(&self, ids: &[i64]) -> Result<usize, ServiceError> {
        let results: Vec<Result<bool, ServiceError>> = stream::iter(ids.iter().copied())
            .map(|id| self.warm_up_one(id))
            .buffer_unordered(WARM_UP_CONCURRENCY)
            .collect()
            .await;

        let mut warmed = 0;
        for result in results {
            if result? {
                warmed += 1;
            }
        }
        info!(requested = ids.len(), warmed, "shop cache warmed");
        Ok(warmed)
    }

    async fn warm_up_one(&self, id: i64) -> Result<bool, ServiceError> {
        let Some(shop) = self.storage.get_shop(id).await? else {
            warn!(shop_id = id, "warm-up id not found in backing store");
            return Ok(false);
        };
        self.cache
            .put_with_logical_expire(&self.shops, id, &shop)
            .await?;
        Ok(true)
    }

    /// Backend name and whether the cache store answers.
    pub async fn cache_health(&self) -> (&'static str, bool) {
        let store = self.cache.store();
        let available = store.is_available().await;
        (store.backend_name(), available)
    }
}
