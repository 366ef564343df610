//! `AppError` and the response envelope

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error returned across the HTTP boundary
///
/// `details` carries machine-readable context such as the missing column or
/// the rejected upload type.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    /// An uploaded source lacks a required header
    pub fn missing_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::with_message(
            ErrorCode::MissingRequiredColumn,
            format!("missing required column: {column}"),
        )
        .with_detail("column", column)
    }
}

/// Response envelope: `code` is 0 on success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: None,
            details: None,
        }
    }

    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.http_status();
        if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error occurred");
        }
        (status, axum::Json(ApiResponse::<()>::error(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_defaults() {
        let err = AppError::new(ErrorCode::EmptyFile);
        assert_eq!(err.code, ErrorCode::EmptyFile);
        assert_eq!(err.message, ErrorCode::EmptyFile.message());
        assert!(err.details.is_none());
        assert_eq!(format!("{err}"), err.message);
    }

    #[test]
    fn test_app_error_details() {
        let err = AppError::with_message(ErrorCode::UnknownUploadType, "Unknown upload type: 'ORDERS'")
            .with_detail("type", "ORDERS");
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details.unwrap().get("type").unwrap(), "ORDERS");
    }

    #[test]
    fn test_missing_column() {
        let err = AppError::missing_column("SKU");
        assert_eq!(err.code, ErrorCode::MissingRequiredColumn);
        assert_eq!(err.message, "missing required column: SKU");
        assert_eq!(err.details.unwrap().get("column").unwrap(), "SKU");
    }

    #[test]
    fn test_auth_constructors() {
        assert_eq!(AppError::not_authenticated().http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::token_expired().code, ErrorCode::TokenExpired);
        assert_eq!(AppError::invalid_token("bad").code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_error_envelope() {
        let err = AppError::database("disk full").with_detail("task_id", 7);
        let response = ApiResponse::<()>::error(&err);
        assert_eq!(response.code, Some(ErrorCode::DatabaseError.code()));
        assert_eq!(response.message, "disk full");
        assert!(response.data.is_none());
        assert!(response.details.is_some());
    }

    #[test]
    fn test_success_envelope_serialization() {
        let json = serde_json::to_string(&ApiResponse::success(42)).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"OK","data":42}"#);

        let json = serde_json::to_string(&ApiResponse::<()>::ok()).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"OK"}"#);
    }
}
