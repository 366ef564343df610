//! HTTP status per error code

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound | Self::ImportTaskNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists | Self::ImportTaskNotRunning => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            Self::UnsupportedFileFormat | Self::InvalidFileExtension => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }

            // Transient; the client may retry
            Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            Self::InternalError
            | Self::DatabaseError
            | Self::FileStorageFailed
            | Self::SourceReadFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // Row, media and upload validation problems
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
