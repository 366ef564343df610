//! SQLite pool and schema migrations for the catalog

pub mod repository;

use shared::error::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Opens (creating if needed) the catalog file in WAL mode
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let options = parse_url(&format!("sqlite:{db_path}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .optimize_on_close(true, None);

        let service = Self::open(SqlitePoolOptions::new().max_connections(5), options).await?;
        tracing::info!(path = %db_path, "Catalog database ready");
        Ok(service)
    }

    /// Private in-memory catalog for tests
    ///
    /// One connection that never expires: the database lives exactly as long
    /// as the pool.
    pub async fn in_memory() -> Result<Self, AppError> {
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        Self::open(pool_options, parse_url("sqlite::memory:")?).await
    }

    async fn open(
        pool_options: SqlitePoolOptions,
        options: SqliteConnectOptions,
    ) -> Result<Self, AppError> {
        let pool = pool_options
            .connect_with(options.foreign_keys(true))
            .await
            .map_err(|e| AppError::database(format!("Cannot open catalog database: {e}")))?;

        sqlx::migrate!("./migrations")
            .set_ignore_missing(true)
            .run(&pool)
            .await
            .map_err(|e| AppError::database(format!("Catalog migration failed: {e}")))?;
        tracing::debug!("Catalog schema up to date");

        Ok(Self { pool })
    }
}

fn parse_url(url: &str) -> Result<SqliteConnectOptions, AppError> {
    SqliteConnectOptions::from_str(url)
        .map_err(|e| AppError::database(format!("Invalid database url {url}: {e}")))
}
