//! Route-level tests over the in-memory cache store and backing store.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use hmdp_cache::{CacheStore, MemoryCacheStore, ReadStrategy};
use hmdp_server::{AppConfig, ServerBuilder};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const SEED: &str = r#"{
  "shops": [
    {"id": 1, "name": "103 Tea House", "typeId": 1, "address": "Jinhua Road 1", "x": 120.149, "y": 30.3, "avgPrice": 80, "score": 37},
    {"id": 2, "name": "Noodle Bar", "typeId": 1, "address": "Main St 5", "x": 120.1, "y": 30.2}
  ],
  "shopTypes": [
    {"id": 2, "name": "KTV", "icon": "/types/ktv.png", "sort": 2},
    {"id": 1, "name": "Food", "icon": "/types/food.png", "sort": 1}
  ]
}"#;

struct Harness {
    app: Router,
    store: Arc<MemoryCacheStore>,
    _dir: TempDir,
}

async fn harness(strategy: ReadStrategy, warm_up_ids: Vec<i64>) -> Harness {
    let dir = tempfile::tempdir().expect("tmp dir");
    let seed = dir.path().join("seed.json");
    std::fs::write(&seed, SEED).expect("write seed");

    let mut cfg = AppConfig::default();
    cfg.storage.seed_path = Some(seed.to_string_lossy().to_string());
    cfg.shop.strategy = strategy;
    cfg.shop.warm_up_ids = warm_up_ids;
    cfg.cache.retry_interval_ms = 5;

    let store = Arc::new(MemoryCacheStore::new());
    let server = ServerBuilder::new()
        .with_config(cfg)
        .with_cache_store(store.clone())
        .build()
        .await
        .expect("build server");

    Harness {
        app: server.router(),
        store,
        _dir: dir,
    }
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn get_shop_returns_envelope_and_fills_cache() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let (status, body) = call(&h.app, Method::GET, "/shop/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["name"], json!("103 Tea House"));
    assert_eq!(body["data"]["avgPrice"], json!(80));

    assert!(h.store.get("cache:shop:1").await.unwrap().is_some());
    assert!(h.store.ttl("cache:shop:1").await.unwrap().is_some());
}

#[tokio::test]
async fn missing_shop_is_tombstoned() {
    let h = harness(ReadStrategy::PassThrough, vec![]).await;

    let (status, body) = call(&h.app, Method::GET, "/shop/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(body["errorMsg"].as_str().unwrap().contains("not found"));

    assert_eq!(
        h.store.get("cache:shop:999").await.unwrap(),
        Some(Vec::new())
    );

    let (status, _) = call(&h.app, Method::GET, "/shop/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_without_id_is_rejected() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let shop = json!({"name": "No Id", "typeId": 1, "address": "Nowhere", "x": 0.0, "y": 0.0});
    let (status, body) = call(&h.app, Method::PUT, "/shop", Some(shop)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorMsg"], json!("shop id is required"));
}

#[tokio::test]
async fn update_invalidates_cached_shop() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let (_, before) = call(&h.app, Method::GET, "/shop/2", None).await;
    assert_eq!(before["data"]["name"], json!("Noodle Bar"));

    let mut shop = before["data"].clone();
    shop["name"] = json!("Noodle Bar Deluxe");
    let (status, body) = call(&h.app, Method::PUT, "/shop", Some(shop)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(h.store.get("cache:shop:2").await.unwrap().is_none());

    let (_, after) = call(&h.app, Method::GET, "/shop/2", None).await;
    assert_eq!(after["data"]["name"], json!("Noodle Bar Deluxe"));
}

#[tokio::test]
async fn update_unknown_shop_is_not_found() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let shop = json!({"id": 404, "name": "Ghost", "typeId": 1, "address": "x", "x": 0.0, "y": 0.0});
    let (status, body) = call(&h.app, Method::PUT, "/shop", Some(shop)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn create_assigns_id_and_is_readable() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let shop = json!({"name": "Dumpling King", "typeId": 1, "address": "West Lake 3", "x": 120.2, "y": 30.25});
    let (status, body) = call(&h.app, Method::POST, "/shop", Some(shop)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"].as_i64().expect("id");
    assert!(id > 0);

    let (status, body) = call(&h.app, Method::GET, &format!("/shop/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Dumpling King"));
    assert_eq!(body["data"]["id"], json!(id));
}

#[tokio::test]
async fn shop_types_are_sorted_and_cached() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let (status, body) = call(&h.app, Method::GET, "/shop-type/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["data"][0]["name"], json!("Food"));
    assert!(h.store.get("cache:shopType").await.unwrap().is_some());
}

#[tokio::test]
async fn logical_expire_serves_only_warmed_shops() {
    let h = harness(ReadStrategy::LogicalExpire, vec![1]).await;

    assert_eq!(h.store.ttl("cache:shop:1").await.unwrap(), None);
    let (status, body) = call(&h.app, Method::GET, "/shop/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("103 Tea House"));

    let (status, _) = call(&h.app, Method::GET, "/shop/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logical_expire_create_is_served_immediately() {
    let h = harness(ReadStrategy::LogicalExpire, vec![]).await;

    let shop = json!({"name": "Hotpot House", "typeId": 1, "address": "East Rd 8", "x": 120.3, "y": 30.1});
    let (_, body) = call(&h.app, Method::POST, "/shop", Some(shop)).await;
    let id = body["data"].as_i64().expect("id");

    let (status, body) = call(&h.app, Method::GET, &format!("/shop/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Hotpot House"));
}

#[tokio::test]
async fn logical_expire_update_is_readable() {
    let h = harness(ReadStrategy::LogicalExpire, vec![1]).await;

    let (status, before) = call(&h.app, Method::GET, "/shop/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let mut shop = before["data"].clone();
    shop["name"] = json!("Renamed Tea House");
    let (status, _) = call(&h.app, Method::PUT, "/shop", Some(shop)).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..3 {
        let (status, body) = call(&h.app, Method::GET, "/shop/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], json!("Renamed Tea House"));
    }
    assert_eq!(h.store.ttl("cache:shop:1").await.unwrap(), None);
}

#[tokio::test]
async fn healthz_reports_cache_backend() {
    let h = harness(ReadStrategy::Mutex, vec![]).await;

    let (status, body) = call(&h.app, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cacheBackend"], json!("memory"));
    assert_eq!(body["cacheAvailable"], json!(true));
}
