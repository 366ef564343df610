//! Shared server state

use super::Config;
use super::jobs::ImportJobs;
use crate::db::DbService;
use crate::images::ImagePipeline;
use crate::ingest::IngestEngine;
use shared::error::AppError;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Handles every request handler and background run needs
///
/// Cheap to clone; all fields are shared.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub engine: IngestEngine,
    pub jobs: ImportJobs,
    /// Client for image fetches and post-import hooks
    pub http: reqwest::Client,
}

impl ServerState {
    /// Open the database and wire the engine
    pub async fn initialize(config: Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_path).await?;
        Self::with_pool(config, db.pool)
    }

    pub fn with_pool(config: Config, pool: SqlitePool) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("catalog-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        std::fs::create_dir_all(&config.upload_dir)
            .map_err(|e| AppError::internal(format!("Failed to create upload dir: {e}")))?;

        let images = ImagePipeline::new(config.images.clone(), http.clone());
        let engine = IngestEngine::new(pool.clone(), config.ingest.clone(), images);

        Ok(Self {
            config: Arc::new(config),
            pool,
            engine,
            jobs: ImportJobs::new(),
            http,
        })
    }
}
