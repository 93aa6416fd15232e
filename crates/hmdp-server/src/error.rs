//! Service errors and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hmdp_cache::CacheError;
use hmdp_storage::StorageError;

use crate::response::ApiResponse;

/// Errors surfaced by [`crate::service::ShopService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request is malformed.
    #[error("{message}")]
    Validation { message: String },

    /// The record does not exist (confirmed by the backing store or a tombstone).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    /// The backing store failed or rejected the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The cache layer failed.
    #[error(transparent)]
    Cache(CacheError),
}

impl ServiceError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Storage(e) if e.is_already_exists() => StatusCode::CONFLICT,
            Self::Storage(e) if e.is_invalid_record() => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cache(e) if e.is_lock_timeout() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unwraps backing-store failures so storage errors keep their own mapping.
impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::BackingStore { source } => match source.downcast::<StorageError>() {
                Ok(storage) => Self::Storage(*storage),
                Err(source) => Self::Cache(CacheError::BackingStore { source }),
            },
            other => Self::Cache(other),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(ApiResponse::<()>::fail(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_storage_errors_survive_cache_wrapping() {
        let err: ServiceError = CacheError::backing_store(StorageError::not_found("Shop", 7)).into();
        assert!(matches!(err, ServiceError::Storage(ref e) if e.is_not_found()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::validation("shop id is required").status(),
            StatusCode::BAD_REQUEST
        );
        let timeout: ServiceError =
            CacheError::lock_timeout("lock:shop:1", Duration::from_secs(10)).into();
        assert_eq!(timeout.status(), StatusCode::SERVICE_UNAVAILABLE);
        let opaque: ServiceError = CacheError::backing_store("socket closed").into();
        assert_eq!(opaque.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
