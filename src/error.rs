// =============================================================================
// Farmstead Backend - Error Types
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Location with supplied ID does not exist")]
    LocationNotFound,

    #[error("Livestock with supplied ID does not exist")]
    LivestockNotFound,

    #[error("Malformed birthdate in stored record: {0}")]
    MalformedDate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Incorrect username or password")
            }
            AppError::UserExists => (StatusCode::BAD_REQUEST, "User already exists"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AppError::LocationNotFound => (
                StatusCode::NOT_FOUND,
                "Location with supplied ID does not exist",
            ),
            AppError::LivestockNotFound => (
                StatusCode::NOT_FOUND,
                "Livestock with supplied ID does not exist",
            ),
            AppError::MalformedDate(value) => {
                tracing::error!("Unparseable birthdate in stored record: {}", value);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
