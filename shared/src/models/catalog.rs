//! Reference and attribute models attached to products

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pricing region (reference dimension, never created by imports)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Region {
    pub id: i64,
    pub name: String,
}

/// Named product collection (reference dimension)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductGroup {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sort_order: i64,
}

/// Named product attribute
///
/// `scope_key` is the owning category id, or 0 for globally shared
/// characteristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Characteristic {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub category_id: Option<i64>,
    pub scope_key: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CharacteristicValue {
    pub id: i64,
    pub product_id: i64,
    pub characteristic_id: i64,
    pub value: String,
    pub slug: String,
}

/// Regional price with one step of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: i64,
    pub product_id: i64,
    pub region_id: i64,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub updated_at: i64,
}
