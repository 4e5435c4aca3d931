use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type MatchingResult<T> = Result<T, MatchingError>;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("{0}")]
    Validation(String),

    #[error("matching {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl MatchingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            MatchingError::Validation(_) => "validation_error",
            MatchingError::NotFound(_) => "not_found",
            MatchingError::Forbidden(_) => "forbidden",
            MatchingError::Conflict(_) => "conflict",
            MatchingError::Storage(_) => "internal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            MatchingError::Validation(_) => StatusCode::BAD_REQUEST,
            MatchingError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchingError::Forbidden(_) => StatusCode::FORBIDDEN,
            MatchingError::Conflict(_) => StatusCode::CONFLICT,
            MatchingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for MatchingError {
    fn into_response(self) -> Response {
        let message = match &self {
            MatchingError::Storage(e) => {
                // Details stay in the logs
                tracing::error!(error = ?e, "Storage error occurred");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (self.status_code(), Json(ErrorResponse::new(self.kind(), message))).into_response()
    }
}
