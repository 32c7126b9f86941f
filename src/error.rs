//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::tokens::TokenError;

/// Stable numeric error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    Forbidden = 3,
    DbFailure = 4,
    NoSuchData = 5,
    Duplicate = 6,
    BadValue = 7,
    NoAvailableUnits = 8,
    BookAlreadyTaken = 9,
    BookIsNotTaken = 10,
}

/// Lending rule violations raised by the take/return state machine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingError {
    #[error("This book has not available copies")]
    NoAvailableUnits,

    #[error("This book is already taken")]
    BookAlreadyTaken,

    #[error("This book is not taken")]
    BookIsNotTaken,
}

impl LendingError {
    fn code(&self) -> ErrorCode {
        match self {
            LendingError::NoAvailableUnits => ErrorCode::NoAvailableUnits,
            LendingError::BookAlreadyTaken => ErrorCode::BookAlreadyTaken,
            LendingError::BookIsNotTaken => ErrorCode::BookIsNotTaken,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            LendingError::BookIsNotTaken => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Lending rule violation: {0}")]
    Lending(#[from] LendingError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::Token(TokenError::Signing(msg)) => {
                tracing::error!("Token signing failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Please try to login later".to_string(),
                )
            }
            AppError::Token(e) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, e.to_string()),
            AppError::Lending(e) => (e.status(), e.code(), e.to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        }
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
