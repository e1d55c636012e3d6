//! Error types for the library ledger server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    StorageFailure = 2,
    NoSuchData = 3,
    BookUnavailable = 4,
    DuplicateActiveLoan = 5,
    NotActiveLoan = 6,
    BadValue = 7,
    Contention = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book {book_id} has no available copies")]
    Unavailable { book_id: i32 },

    #[error("Member {member_id} already has an active loan of book {book_id}")]
    DuplicateActiveLoan { book_id: i32, member_id: i32 },

    #[error("Borrowing {borrowing_id} is not an active loan")]
    NotActiveLoan { borrowing_id: i32 },

    #[error("Contention: {0}")]
    Contention(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Only lock or transaction timeouts are worth retrying; everything else
    /// is either a terminal business outcome or a hard failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Contention(_))
    }

    fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Unavailable { .. } => ErrorCode::BookUnavailable,
            AppError::DuplicateActiveLoan { .. } => ErrorCode::DuplicateActiveLoan,
            AppError::NotActiveLoan { .. } => ErrorCode::NotActiveLoan,
            AppError::Contention(_) => ErrorCode::Contention,
            AppError::Storage(_) => ErrorCode::StorageFailure,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

// SQLSTATE lock_not_available, serialization_failure, deadlock_detected
const CONTENTION_SQLSTATES: [&str; 3] = ["55P03", "40001", "40P01"];

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut => AppError::Contention("Timed out waiting for a connection".to_string()),
            sqlx::Error::Database(db)
                if db
                    .code()
                    .is_some_and(|code| CONTENTION_SQLSTATES.contains(&code.as_ref())) =>
            {
                AppError::Contention(db.message().to_string())
            }
            _ => AppError::Storage(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Whether the client may retry the same request
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable { .. }
            | AppError::DuplicateActiveLoan { .. }
            | AppError::NotActiveLoan { .. } => StatusCode::CONFLICT,
            AppError::Contention(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Storage(msg) => {
                tracing::error!("Storage failure: {}", msg);
                "Storage failure".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let code = self.code();
        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            retryable: self.is_retryable(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
