use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Conflict carrying a caller-visible machine reason code.
    #[error("{message}")]
    ConflictWithReason {
        reason: &'static str,
        message: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::ConflictWithReason { reason, message } => {
                (StatusCode::CONFLICT, *reason, message)
            }
            AppError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            AppError::StoreUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", msg)
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message,
            "reason": reason
        }));

        (status, body).into_response()
    }
}
