//! # hmdp-storage
//!
//! Backing-store abstraction for the shop directory.
//!
//! This crate defines the records and the [`ShopStorage`] trait the cache
//! layer reads through, plus an in-memory implementation used by the server
//! binary and tests.
//!
//! ## Example
//!
//! ```ignore
//! use hmdp_storage::{InMemoryShopStorage, Shop, ShopStorage};
//!
//! let storage = InMemoryShopStorage::new();
//! storage.create_shop(&Shop::new("Tea House", 1, "Main St 1").with_id(1)).await?;
//! let shop = storage.get_shop(1).await?;
//! ```

mod error;
mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use memory::InMemoryShopStorage;
pub use traits::ShopStorage;
pub use types::{Shop, ShopType};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynShopStorage = std::sync::Arc<dyn ShopStorage>;
