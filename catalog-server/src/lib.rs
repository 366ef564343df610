//! catalog-server: catalog ingestion engine and its upload service
//!
//! - [`ingest`] turns tabular uploads into catalog entities
//! - [`images`] derives product imagery
//! - [`db`] owns the SQLite pool and repositories
//! - [`api`], [`auth`], [`core`] form the HTTP boundary

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod images;
pub mod ingest;
pub mod utils;

pub use core::{Config, ServerState};
pub use ingest::{IngestEngine, IngestError, IngestReport, PreparedRun};
