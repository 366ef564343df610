//! Shared types for the catalog services
//!
//! Error codes, API response envelopes and catalog entity models used by the
//! server and its clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
