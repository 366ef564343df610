//! Product Image Model

use serde::{Deserialize, Serialize};

/// Derived image variant persisted for a product
///
/// `name` is `"{ROLE}_{source basename}"` and is unique per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub role: String,
    pub name: String,
    /// Media-relative path of the encoded file
    pub image: String,
    pub thumb: Option<String>,
    pub created_at: i64,
}
