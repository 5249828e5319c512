//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use birth_trauma_core::logic::features::InputError;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// One or more features failed validation, schema order
    #[error("{}", first_message(.0))]
    Input(Vec<InputError>),

    // Malformed request body
    #[error("{0}")]
    BadRequest(String),

    // Stage not available for this model / configuration
    #[error("{0}")]
    Unavailable(String),

    // Generic errors
    #[error("{0}")]
    InternalError(String),
}

fn first_message(errors: &[InputError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "invalid input".to_string())
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::Input(vec![err])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        let (status, body) = match &self {
            AppError::Input(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": message,
                    "status": StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                    "feature": errors.first().map(|e| e.feature()),
                    "errors": errors,
                }),
            ),
            AppError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "status": StatusCode::BAD_REQUEST.as_u16() }),
            ),
            AppError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": message, "status": StatusCode::SERVICE_UNAVAILABLE.as_u16() }),
            ),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "status": 500 }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}
