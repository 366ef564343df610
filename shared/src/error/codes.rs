//! Numeric error codes
//!
//! | range | area    |
//! |-------|---------|
//! | 0xxx  | general |
//! | 1xxx  | auth    |
//! | 3xxx  | catalog |
//! | 4xxx  | import  |
//! | 5xxx  | media   |
//! | 9xxx  | system  |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialized as its bare number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // General
    Success = 0,
    ValidationFailed = 2,
    NotFound = 3,
    AlreadyExists = 4,
    InvalidRequest = 5,
    InvalidFormat = 6,

    // Auth
    NotAuthenticated = 1001,
    TokenExpired = 1003,
    TokenInvalid = 1004,

    // Catalog rows
    ProductArticleRequired = 3002,
    ProductInvalidPrice = 3003,
    CategoryPathEmpty = 3102,
    RegionNotFound = 3201,

    // Import
    UnknownUploadType = 4001,
    UnsupportedFileFormat = 4002,
    MissingRequiredColumn = 4003,
    SourceReadFailed = 4004,
    ImportTaskNotFound = 4005,
    ImportTaskNotRunning = 4006,
    FileTooLarge = 4101,
    NoFileProvided = 4102,
    EmptyFile = 4103,
    NoFilename = 4104,
    InvalidFileExtension = 4105,
    FileStorageFailed = 4106,

    // Media
    ImageFetchFailed = 5001,
    InvalidImageFile = 5002,
    ImageProcessingFailed = 5003,
    WatermarkUnavailable = 5004,

    // System
    InternalError = 9001,
    DatabaseError = 9002,
    TimeoutError = 9004,
}

/// Every code, in numeric order
const ALL: [ErrorCode; 32] = [
    ErrorCode::Success,
    ErrorCode::ValidationFailed,
    ErrorCode::NotFound,
    ErrorCode::AlreadyExists,
    ErrorCode::InvalidRequest,
    ErrorCode::InvalidFormat,
    ErrorCode::NotAuthenticated,
    ErrorCode::TokenExpired,
    ErrorCode::TokenInvalid,
    ErrorCode::ProductArticleRequired,
    ErrorCode::ProductInvalidPrice,
    ErrorCode::CategoryPathEmpty,
    ErrorCode::RegionNotFound,
    ErrorCode::UnknownUploadType,
    ErrorCode::UnsupportedFileFormat,
    ErrorCode::MissingRequiredColumn,
    ErrorCode::SourceReadFailed,
    ErrorCode::ImportTaskNotFound,
    ErrorCode::ImportTaskNotRunning,
    ErrorCode::FileTooLarge,
    ErrorCode::NoFileProvided,
    ErrorCode::EmptyFile,
    ErrorCode::NoFilename,
    ErrorCode::InvalidFileExtension,
    ErrorCode::FileStorageFailed,
    ErrorCode::ImageFetchFailed,
    ErrorCode::InvalidImageFile,
    ErrorCode::ImageProcessingFailed,
    ErrorCode::WatermarkUnavailable,
    ErrorCode::InternalError,
    ErrorCode::DatabaseError,
    ErrorCode::TimeoutError,
];

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",

            ErrorCode::NotAuthenticated => "Caller is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            ErrorCode::ProductArticleRequired => "Product article code is required",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::CategoryPathEmpty => "Category path is empty",
            ErrorCode::RegionNotFound => "Region not found",

            ErrorCode::UnknownUploadType => "Unknown upload type",
            ErrorCode::UnsupportedFileFormat => "Unsupported file format",
            ErrorCode::MissingRequiredColumn => "Required column is missing",
            ErrorCode::SourceReadFailed => "Source file could not be read",
            ErrorCode::ImportTaskNotFound => "Import task not found",
            ErrorCode::ImportTaskNotRunning => "Import task is not running",
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::NoFileProvided => "No file provided",
            ErrorCode::EmptyFile => "Empty file provided",
            ErrorCode::NoFilename => "No filename provided",
            ErrorCode::InvalidFileExtension => "Invalid file extension",
            ErrorCode::FileStorageFailed => "File storage failed",

            ErrorCode::ImageFetchFailed => "Image could not be fetched",
            ErrorCode::InvalidImageFile => "Invalid image file",
            ErrorCode::ImageProcessingFailed => "Image processing failed",
            ErrorCode::WatermarkUnavailable => "Watermark asset is unavailable",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ALL.binary_search_by_key(&value, |c| c.code())
            .map(|i| ALL[i])
            .map_err(|_| InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table_is_sorted() {
        assert!(ALL.windows(2).all(|w| w[0].code() < w[1].code()));
    }

    #[test]
    fn test_try_from_round_trips_every_code() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(1), Err(InvalidErrorCode(1)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::MissingRequiredColumn).unwrap(), "4003");
        let code: ErrorCode = serde_json::from_str("4001").unwrap();
        assert_eq!(code, ErrorCode::UnknownUploadType);
        assert!(serde_json::from_str::<ErrorCode>("999").is_err());
    }

    #[test]
    fn test_display_and_message() {
        assert_eq!(ErrorCode::ImportTaskNotFound.to_string(), "4005");
        assert_eq!(ErrorCode::UnsupportedFileFormat.message(), "Unsupported file format");
        assert_eq!(InvalidErrorCode(999).to_string(), "invalid error code: 999");
    }
}
