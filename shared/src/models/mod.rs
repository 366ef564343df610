//! Data models
//!
//! Shared between the catalog server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod catalog;
pub mod category;
pub mod import_task;
pub mod product;
pub mod product_image;

// Re-exports
pub use catalog::*;
pub use category::*;
pub use import_task::*;
pub use product::*;
pub use product_image::*;
