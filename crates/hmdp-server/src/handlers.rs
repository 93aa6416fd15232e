use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use hmdp_storage::{Shop, ShopType};
use serde::Serialize;

use crate::error::ServiceError;
use crate::response::ApiResponse;
use crate::service::ShopService;

#[derive(Clone)]
pub struct AppState {
    pub shops: Arc<ShopService>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    cache_backend: &'static str,
    cache_available: bool,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let (backend, available) = state.shops.cache_health().await;
    let status = if available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthResponse {
        status: if available { "ok" } else { "degraded" },
        cache_backend: backend,
        cache_available: available,
    };
    (status, Json(body))
}

pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Shop>>, ServiceError> {
    let shop = state.shops.query_by_id(id).await?;
    Ok(Json(ApiResponse::ok(shop)))
}

pub async fn update_shop(
    State(state): State<AppState>,
    Json(shop): Json<Shop>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.shops.update(shop).await?;
    Ok(Json(ApiResponse::empty()))
}

/// Returns the new shop's id.
pub async fn create_shop(
    State(state): State<AppState>,
    Json(shop): Json<Shop>,
) -> Result<(StatusCode, Json<ApiResponse<i64>>), ServiceError> {
    let created = state.shops.create(shop).await?;
    let id = created
        .id
        .ok_or_else(|| ServiceError::validation("created shop has no id"))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(id))))
}

pub async fn list_shop_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ShopType>>>, ServiceError> {
    let types = state.shops.list_shop_types().await?;
    let total = types.len() as u64;
    Ok(Json(ApiResponse::ok_list(types, total)))
}
