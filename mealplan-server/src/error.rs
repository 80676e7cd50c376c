//! Error types for mealplan-server
//!
//! Every handler returns [`ApiResult`]; failures render as `{"error": message}`
//! with the matching status code. Internal details are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid session, or wrong credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409) - e.g., a weekly plan already exists for that Monday
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// mealplan-common error
    #[error("Common error: {0}")]
    Common(#[from] mealplan_common::Error),
}

impl ApiError {
    /// HTTP status and client-facing message
    fn status_and_message(self) -> (StatusCode, String) {
        use mealplan_common::Error as Common;

        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Common(Common::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Common(Common::Unauthorized(msg)) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Common(Common::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            ApiError::Common(Common::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
