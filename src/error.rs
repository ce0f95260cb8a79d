use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use log::error;
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;

use crate::rag::rag::RagError;

/// Failures surfaced to HTTP clients. Anything not a lookup or validation
/// failure becomes a 500 carrying the underlying error text.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn session_not_found() -> Self {
        AppError::NotFound("Session not found".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Box<dyn StdError + Send + Sync>> for AppError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// `{status, message}` envelope used for errors and bare acknowledgements.
#[derive(Serialize, Debug)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: "success", message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error", message: message.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }
        (code, Json(StatusMessage::error(self.to_string()))).into_response()
    }
}
