//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::statements::StatementError;

/// Result type alias for read handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Errors raised by the read endpoints
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Statement error: {0}")]
    Statement(#[from] StatementError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn code(&self) -> u16 {
        match self {
            AppError::Database(_) => 101,
            AppError::Statement(_) => 108,
            AppError::BadRequest(_) => 113,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database error", "A database error occurred".to_string())
            },
            AppError::Statement(e) => {
                tracing::error!("Statement error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "statement error", e.to_string())
            },
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "validation error", message.clone()),
        };

        ErrorResponse::new(reason, self.code(), message, "api.read").with_status(status)
    }
}
