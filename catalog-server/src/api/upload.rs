//! Catalog file upload
//!
//! Stores the uploaded file, validates it with the engine (format, required
//! columns) and hands the run to a background task. Fatal source problems
//! are answered synchronously.

use axum::Json;
use axum::extract::{Extension, Multipart, Path, Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::UploadType;
use std::path::PathBuf;
use uuid::Uuid;

use crate::auth::Operator;
use crate::core::ServerState;
use crate::db::repository::import_task;
use crate::ingest::reader::SourceFormat;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub task_id: i64,
    pub file_name: String,
    pub upload_type: UploadType,
}

/// Reject names that could escape the upload directory
fn validate_filename(filename: &str) -> Result<(), AppError> {
    if filename.trim().is_empty() {
        return Err(AppError::new(ErrorCode::NoFilename));
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(AppError::with_message(
            ErrorCode::InvalidRequest,
            format!("Invalid filename: {filename}"),
        ));
    }
    SourceFormat::from_path(std::path::Path::new(filename)).map_err(|_| {
        AppError::with_message(
            ErrorCode::InvalidFileExtension,
            format!("Unsupported file extension: {filename}"),
        )
    })?;
    Ok(())
}

fn parse_kind(query: &UploadQuery) -> Result<UploadType, AppError> {
    let raw = query.kind.as_deref().unwrap_or_default();
    raw.parse::<UploadType>().map_err(|_| {
        AppError::with_message(ErrorCode::UnknownUploadType, format!("Unknown upload type: '{raw}'"))
            .with_detail("type", raw)
    })
}

async fn read_file_field(multipart: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
        if data.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyFile));
        }
        if data.len() > max_bytes {
            return Err(AppError::with_message(
                ErrorCode::FileTooLarge,
                format!("File too large. Maximum size is {max_bytes} bytes"),
            ));
        }
        return Ok(data.to_vec());
    }
    Err(AppError::with_message(
        ErrorCode::NoFileProvided,
        "No 'file' field found. Field name must be 'file'",
    ))
}

/// `PUT /api/upload/{filename}?type=PRODUCTS|BRANDS`
pub async fn upload(
    State(state): State<ServerState>,
    Extension(operator): Extension<Operator>,
    Path(filename): Path<String>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadAccepted>>, AppError> {
    let kind = parse_kind(&query)?;
    validate_filename(&filename)?;
    let data = read_file_field(&mut multipart, state.config.max_upload_bytes).await?;

    let stored: PathBuf = state
        .config
        .upload_dir
        .join(format!("{}_{}", Uuid::new_v4(), filename));
    tokio::fs::write(&stored, &data).await.map_err(|e| {
        AppError::with_message(ErrorCode::FileStorageFailed, format!("Failed to save file: {e}"))
    })?;

    let run = match state.engine.prepare(&stored, kind).await {
        Ok(run) => run,
        Err(e) => {
            tracing::warn!(file = %filename, kind = kind.as_str(), error = %e, "Upload rejected");
            if let Err(rm) = tokio::fs::remove_file(&stored).await {
                tracing::warn!(path = %stored.display(), error = %rm, "Failed to remove rejected upload");
            }
            return Err(e.into());
        }
    };

    let task = match import_task::create(&state.pool, &filename, kind).await {
        Ok(task) => task,
        Err(e) => {
            let _ = tokio::fs::remove_file(&stored).await;
            return Err(e.into());
        }
    };
    tracing::info!(
        task_id = task.id,
        file = %filename,
        kind = kind.as_str(),
        size = data.len(),
        operator = %operator.id,
        "Import accepted"
    );
    state.jobs.spawn(state.clone(), task.id, run, stored);

    Ok(Json(ApiResponse::success(UploadAccepted {
        task_id: task.id,
        file_name: filename,
        upload_type: kind,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("goods.xlsx").is_ok());
        assert!(validate_filename("goods.csv").is_ok());
        assert_eq!(validate_filename("").unwrap_err().code, ErrorCode::NoFilename);
        assert_eq!(
            validate_filename("../etc/passwd.csv").unwrap_err().code,
            ErrorCode::InvalidRequest
        );
        assert_eq!(
            validate_filename("goods.pdf").unwrap_err().code,
            ErrorCode::InvalidFileExtension
        );
    }

    #[test]
    fn test_parse_kind() {
        let q = |k: Option<&str>| UploadQuery {
            kind: k.map(str::to_string),
        };
        assert_eq!(parse_kind(&q(Some("PRODUCTS"))).unwrap(), UploadType::Products);
        assert_eq!(parse_kind(&q(Some("brands"))).unwrap(), UploadType::Brands);
        assert_eq!(
            parse_kind(&q(Some("ORDERS"))).unwrap_err().code,
            ErrorCode::UnknownUploadType
        );
        assert_eq!(parse_kind(&q(None)).unwrap_err().code, ErrorCode::UnknownUploadType);
    }
}
