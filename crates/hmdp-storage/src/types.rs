//! Record types held by the backing store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A shop listing.
///
/// `id` is `None` only on records that have not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub type_id: i64,
    /// Comma-separated image URLs.
    #[serde(default)]
    pub images: String,
    #[serde(default)]
    pub area: Option<String>,
    pub address: String,
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
    /// Average spend per customer, in whole currency units.
    #[serde(default)]
    pub avg_price: Option<i64>,
    #[serde(default)]
    pub sold: i32,
    #[serde(default)]
    pub comments: i32,
    /// Rating times ten (1..=50).
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub open_hours: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub create_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub update_time: Option<OffsetDateTime>,
}

impl Shop {
    /// Creates an unsaved shop with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, type_id: i64, address: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            type_id,
            images: String::new(),
            area: None,
            address: address.into(),
            x: 0.0,
            y: 0.0,
            avg_price: None,
            sold: 0,
            comments: 0,
            score: 0,
            open_hours: None,
            create_time: None,
            update_time: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// A shop category, listed in `sort` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub sort: i32,
}

impl ShopType {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, icon: impl Into<String>, sort: i32) -> Self {
        Self {
            id,
            name: name.into(),
            icon: icon.into(),
            sort,
        }
    }
}
