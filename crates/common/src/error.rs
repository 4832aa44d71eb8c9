use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::destination::ConfigError;

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Config(err) => err.to_string(),
            AppError::Validation(msg) => msg,
        };

        let body = json!({ "success": false, "message": message });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
