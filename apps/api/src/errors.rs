use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file was uploaded in the 'file' form field")]
    MissingFile,

    #[error("File is empty or not a valid PDF: {0}")]
    InvalidDocument(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Completion service error: {0}")]
    Upstream(String),

    #[error("Could not decode model response: {0}")]
    Decode(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile | AppError::InvalidDocument(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Upstream(_) | AppError::Decode(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingFile => "MISSING_FILE",
            AppError::InvalidDocument(_) => "INVALID_DOCUMENT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Decode(_) => "DECODE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(_) | LlmError::EmptyContent => AppError::Decode(err.to_string()),
            _ => AppError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::MissingFile => self.to_string(),
            AppError::InvalidDocument(reason) => {
                tracing::warn!("Rejected upload: {reason}");
                "File is empty or not a valid PDF".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            // Upstream and decode failures pass the underlying message through.
            AppError::Upstream(msg) => {
                tracing::error!("Completion service error: {msg}");
                msg.clone()
            }
            AppError::Decode(msg) => {
                tracing::error!("Decode error: {msg}");
                msg.clone()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
