use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified application error.
///
/// Every layer (config, HTTP handlers) fails through this type so responses
/// stay predictable.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {error}: {message}")]
    Internal { error: String, message: String },
}

impl AppError {
    pub fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Internal {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method not allowed" }),
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            AppError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            AppError::Internal { error, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": error, "message": message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
