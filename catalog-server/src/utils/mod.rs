//! Utilities

pub mod logger;

pub use logger::{IMPORT_TARGET, init_logger};
