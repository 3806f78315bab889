//! Error taxonomy for the whole service.
//! Validation errors reject at the component boundary; oracle failures
//! propagate untouched; parse degradation is absorbed into empty results
//! inside the parser and never surfaces here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::services::oracle::OracleError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("invalid mode '{0}': must be 'summary', 'flashcard', or 'quiz'")]
    InvalidMode(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("no quizzes found for this upload")]
    NoQuiz,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("unsupported file type '{0}'")]
    UnsupportedFile(String),

    #[error("invalid or expired credentials")]
    Unauthorized,

    #[error("incorrect password")]
    WrongPassword,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Oracle(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidMode(_)
            | ApiError::InvalidInput(_)
            | ApiError::NoQuiz
            | ApiError::DuplicateEmail
            | ApiError::UnsupportedFile(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::WrongPassword => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Serialize(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
