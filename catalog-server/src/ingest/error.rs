//! Ingestion error taxonomy
//!
//! Every failure the engine can hit is an [`IngestError`]. Its
//! [`Severity`] decides what the run does with it:
//!
//! | severity | effect                                                    |
//! |----------|-----------------------------------------------------------|
//! | `Fatal`  | nothing is processed; returned from `prepare`             |
//! | `Row`    | the row's transaction rolls back, the run continues       |
//! | `Field`  | logged with row/column context, the row keeps going       |

use crate::db::repository::RepoError;
use crate::images::ImageError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Row,
    Field,
}

#[derive(Debug, Error)]
pub enum IngestError {
    // ── Fatal ──
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse source file: {0}")]
    Parse(String),

    #[error("missing required column: {0}")]
    MissingRequiredColumn(String),

    #[error("failed to load reference data: {0}")]
    ReferenceData(#[source] RepoError),

    // ── Row-aborting ──
    #[error("malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("row has no article code")]
    MissingArticle,

    #[error("category path is empty")]
    EmptyCategoryPath,

    #[error("failed to create category '{name}': {source}")]
    CategoryCreate { name: String, source: RepoError },

    #[error("failed to persist product '{article}': {source}")]
    ProductCreate { article: String, source: RepoError },

    #[error("failed to persist brand '{name}': {source}")]
    BrandCreate { name: String, source: RepoError },

    #[error("row transaction failed: {0}")]
    Transaction(#[source] RepoError),

    // ── Field-local ──
    #[error("invalid price '{value}' in column '{column}'")]
    InvalidPrice { column: String, value: String },

    #[error("region not found: {0}")]
    RegionNotFound(String),

    #[error("price for region '{region}' not stored: {source}")]
    PriceStore { region: String, source: RepoError },

    #[error("characteristic '{column}' not stored: {source}")]
    Characteristic { column: String, source: RepoError },

    #[error("group '{group}' not linked: {source}")]
    GroupLink { group: String, source: RepoError },

    #[error("brand '{name}' not resolved: {source}")]
    Brand { name: String, source: RepoError },

    #[error("image '{origin}' skipped: {error}")]
    Image {
        origin: String,
        #[source]
        error: ImageError,
    },
}

impl IngestError {
    pub fn severity(&self) -> Severity {
        match self {
            IngestError::UnsupportedFormat(_)
            | IngestError::Io(_)
            | IngestError::Parse(_)
            | IngestError::MissingRequiredColumn(_)
            | IngestError::ReferenceData(_) => Severity::Fatal,

            IngestError::MalformedRecord { .. }
            | IngestError::MissingArticle
            | IngestError::EmptyCategoryPath
            | IngestError::CategoryCreate { .. }
            | IngestError::ProductCreate { .. }
            | IngestError::BrandCreate { .. }
            | IngestError::Transaction(_) => Severity::Row,

            IngestError::InvalidPrice { .. }
            | IngestError::RegionNotFound(_)
            | IngestError::PriceStore { .. }
            | IngestError::Characteristic { .. }
            | IngestError::GroupLink { .. }
            | IngestError::Brand { .. }
            | IngestError::Image { .. } => Severity::Field,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            IngestError::UnsupportedFormat(_) => ErrorCode::UnsupportedFileFormat,
            IngestError::Io(_) => ErrorCode::SourceReadFailed,
            IngestError::Parse(_) | IngestError::MalformedRecord { .. } => ErrorCode::InvalidFormat,
            IngestError::MissingRequiredColumn(_) => ErrorCode::MissingRequiredColumn,
            IngestError::ReferenceData(_) | IngestError::Transaction(_) => ErrorCode::DatabaseError,
            IngestError::MissingArticle => ErrorCode::ProductArticleRequired,
            IngestError::EmptyCategoryPath => ErrorCode::CategoryPathEmpty,
            IngestError::CategoryCreate { .. }
            | IngestError::ProductCreate { .. }
            | IngestError::BrandCreate { .. }
            | IngestError::PriceStore { .. }
            | IngestError::Characteristic { .. }
            | IngestError::GroupLink { .. }
            | IngestError::Brand { .. } => ErrorCode::DatabaseError,
            IngestError::InvalidPrice { .. } => ErrorCode::ProductInvalidPrice,
            IngestError::RegionNotFound(_) => ErrorCode::RegionNotFound,
            IngestError::Image { error, .. } => error.code(),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MissingRequiredColumn(column) => AppError::missing_column(column),
            other => AppError::with_message(other.code(), other.to_string()),
        }
    }
}
