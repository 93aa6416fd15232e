//! In-memory backing store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::ShopStorage;
use crate::types::{Shop, ShopType};

/// In-memory shop storage backed by a `DashMap`.
///
/// An optional artificial latency makes cache misses observable in demos and
/// tests, and `shop_reads` counts every `get_shop` call.
#[derive(Debug, Default)]
pub struct InMemoryShopStorage {
    shops: Arc<DashMap<i64, Shop>>,
    shop_types: RwLock<Vec<ShopType>>,
    latency: Option<Duration>,
    shop_reads: AtomicU64,
    type_reads: AtomicU64,
}

impl InMemoryShopStorage {
    /// Creates an empty storage with no artificial latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every read by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inserts shops as-is, replacing any with the same id.
    #[must_use]
    pub fn with_shops(self, shops: impl IntoIterator<Item = Shop>) -> Self {
        for shop in shops {
            if let Some(id) = shop.id {
                self.shops.insert(id, shop);
            }
        }
        self
    }

    #[must_use]
    pub fn with_shop_types(mut self, types: impl IntoIterator<Item = ShopType>) -> Self {
        self.shop_types = RwLock::new(types.into_iter().collect());
        self
    }

    /// Number of `get_shop` calls served so far.
    pub fn shop_reads(&self) -> u64 {
        self.shop_reads.load(Ordering::Relaxed)
    }

    /// Number of `list_shop_types` calls served so far.
    pub fn type_reads(&self) -> u64 {
        self.type_reads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.shops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn require_id(shop: &Shop) -> Result<i64, StorageError> {
    shop.id
        .ok_or_else(|| StorageError::invalid_record("shop id is required"))
}

#[async_trait]
impl ShopStorage for InMemoryShopStorage {
    async fn get_shop(&self, id: i64) -> Result<Option<Shop>, StorageError> {
        self.shop_reads.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        let shop = self.shops.get(&id).map(|s| s.clone());
        debug!(shop_id = id, found = shop.is_some(), "shop read");
        Ok(shop)
    }

    async fn create_shop(&self, shop: &Shop) -> Result<Shop, StorageError> {
        let id = require_id(shop)?;
        match self.shops.entry(id) {
            Entry::Occupied(_) => Err(StorageError::already_exists("Shop", id)),
            Entry::Vacant(slot) => {
                let now = OffsetDateTime::now_utc();
                let mut stored = shop.clone();
                stored.create_time = Some(now);
                stored.update_time = Some(now);
                slot.insert(stored.clone());
                debug!(shop_id = id, "shop created");
                Ok(stored)
            }
        }
    }

    async fn update_shop(&self, shop: &Shop) -> Result<Shop, StorageError> {
        let id = require_id(shop)?;
        let Some(mut current) = self.shops.get_mut(&id) else {
            return Err(StorageError::not_found("Shop", id));
        };
        let mut stored = shop.clone();
        stored.create_time = current.create_time;
        stored.update_time = Some(OffsetDateTime::now_utc());
        *current = stored.clone();
        debug!(shop_id = id, "shop updated");
        Ok(stored)
    }

    async fn list_shop_types(&self) -> Result<Vec<ShopType>, StorageError> {
        self.type_reads.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        let mut types = self.shop_types.read().await.clone();
        types.sort_by_key(|t| t.sort);
        Ok(types)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
