use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use hmdp_cache::{CacheClient, DynCacheStore, ReadStrategy};
use hmdp_storage::{InMemoryShopStorage, Shop, ShopType};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    config::{AppConfig, StorageConfig},
    create_cache_store,
    handlers::{self, AppState},
    service::ShopService,
};

pub struct HmdpServer {
    addr: SocketAddr,
    app: Router,
    cache: Arc<CacheClient>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/shop/{id}", get(handlers::get_shop))
        .route(
            "/shop",
            post(handlers::create_shop).put(handlers::update_shop),
        )
        .route("/shop-type/list", get(handlers::list_shop_types))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

/// Seed file layout for the in-memory backing store.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedData {
    #[serde(default)]
    shops: Vec<Shop>,
    #[serde(default)]
    shop_types: Vec<ShopType>,
}

fn build_storage(cfg: &StorageConfig) -> anyhow::Result<InMemoryShopStorage> {
    let mut storage = InMemoryShopStorage::new();
    if cfg.read_latency_ms > 0 {
        storage = storage.with_latency(Duration::from_millis(cfg.read_latency_ms));
    }
    if let Some(path) = &cfg.seed_path {
        let raw = std::fs::read(path)?;
        let seed: SeedData = serde_json::from_slice(&raw)?;
        tracing::info!(
            path = %path,
            shops = seed.shops.len(),
            shop_types = seed.shop_types.len(),
            "Backing store seeded"
        );
        storage = storage
            .with_shops(seed.shops)
            .with_shop_types(seed.shop_types);
    }
    Ok(storage)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynCacheStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses `store` instead of building one from `redis` settings.
    pub fn with_cache_store(mut self, store: DynCacheStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> anyhow::Result<HmdpServer> {
        let store = match self.store {
            Some(store) => store,
            None => create_cache_store(&self.config.redis).await,
        };
        let cache = Arc::new(CacheClient::new(store, self.config.cache.clone()));
        let storage = Arc::new(build_storage(&self.config.storage)?);
        let shops = Arc::new(ShopService::new(
            Arc::clone(&cache),
            storage,
            &self.config.shop,
        ));

        if shops.strategy() == ReadStrategy::LogicalExpire && !self.config.shop.warm_up_ids.is_empty()
        {
            shops.warm_up(&self.config.shop.warm_up_ids).await?;
        }

        Ok(HmdpServer {
            addr: self.addr,
            app: build_app(AppState { shops }),
            cache,
        })
    }
}

impl HmdpServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        self.cache.shutdown().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
