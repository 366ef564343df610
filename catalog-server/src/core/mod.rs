//! Core module: configuration, state and background imports

pub mod config;
pub mod hooks;
pub mod jobs;
pub mod state;

pub use config::Config;
pub use jobs::ImportJobs;
pub use state::ServerState;
