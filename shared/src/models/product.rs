//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity, keyed externally by its article code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub article: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub category_id: i64,
    pub brand_id: Option<i64>,
    pub in_stock: bool,
    /// Base64 JPEG thumbnail (no padding)
    pub thumb: Option<String>,
    /// Media-relative path of the catalog listing image
    pub catalog_image: Option<String>,
    /// Media-relative path of the search suggestion image
    pub search_image: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub article: String,
    pub slug: Option<String>,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub category_id: i64,
    pub brand_id: Option<i64>,
    pub in_stock: bool,
}

/// Update product payload
///
/// `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub in_stock: Option<bool>,
}
