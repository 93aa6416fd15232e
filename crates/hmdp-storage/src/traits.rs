//! Storage traits for the shop backing store.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{Shop, ShopType};

/// The authoritative store for shops and shop types.
///
/// Sits behind the cache layer: reads arrive here only on cache misses and
/// rebuilds, writes always land here first. Implementations must be
/// thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use hmdp_storage::{ShopStorage, StorageError, Shop};
///
/// async fn load(storage: &dyn ShopStorage, id: i64) -> Result<Shop, StorageError> {
///     storage
///         .get_shop(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Shop", id))
/// }
/// ```
#[async_trait]
pub trait ShopStorage: Send + Sync {
    /// Reads a shop by ID.
    ///
    /// Returns `None` if the shop does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing records.
    async fn get_shop(&self, id: i64) -> Result<Option<Shop>, StorageError>;

    /// Inserts a shop. `shop.id` must be set by the caller.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if the id is missing and
    /// `StorageError::AlreadyExists` if it is taken.
    async fn create_shop(&self, shop: &Shop) -> Result<Shop, StorageError>;

    /// Replaces an existing shop.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if the id is missing and
    /// `StorageError::NotFound` if no shop has that id.
    async fn update_shop(&self, shop: &Shop) -> Result<Shop, StorageError>;

    /// All shop types ordered by `sort` ascending.
    async fn list_shop_types(&self) -> Result<Vec<ShopType>, StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
