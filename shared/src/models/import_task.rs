//! Import Task Model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadType {
    Products,
    Brands,
}

impl UploadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadType::Products => "PRODUCTS",
            UploadType::Brands => "BRANDS",
        }
    }
}

impl FromStr for UploadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRODUCTS" => Ok(UploadType::Products),
            "BRANDS" => Ok(UploadType::Brands),
            other => Err(format!("unknown upload type: {other}")),
        }
    }
}

impl std::fmt::Display for UploadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of an import task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "PENDING",
            ImportStatus::InProgress => "IN_PROGRESS",
            ImportStatus::Completed => "COMPLETED",
            ImportStatus::Failed => "FAILED",
            ImportStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::Failed | ImportStatus::Cancelled
        )
    }
}

impl FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ImportStatus::Pending),
            "IN_PROGRESS" => Ok(ImportStatus::InProgress),
            "COMPLETED" => Ok(ImportStatus::Completed),
            "FAILED" => Ok(ImportStatus::Failed),
            "CANCELLED" => Ok(ImportStatus::Cancelled),
            other => Err(format!("unknown import status: {other}")),
        }
    }
}

/// Import task record
///
/// `status` and `upload_type` are stored as their string forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ImportTask {
    pub id: i64,
    pub file_name: String,
    pub upload_type: String,
    pub status: String,
    pub rows_total: i64,
    pub rows_committed: i64,
    pub rows_aborted: i64,
    pub warnings: i64,
    pub comment: Option<String>,
    pub created_at: i64,
    pub finished_at: Option<i64>,
}

/// Final counters written when a task finishes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportTaskSummary {
    pub rows_total: i64,
    pub rows_committed: i64,
    pub rows_aborted: i64,
    pub warnings: i64,
    pub comment: Option<String>,
}
