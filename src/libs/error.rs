//! Error types for the table editor

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    /// Request did not come from a loopback address.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("db error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        EditorError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        EditorError::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        EditorError::Unauthorized(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EditorError::Forbidden(_) => StatusCode::FORBIDDEN,
            EditorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EditorError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EditorError::NotFound(_) => StatusCode::NOT_FOUND,
            EditorError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            EditorError::Database(_) | EditorError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PathRejection> for EditorError {
    fn from(rejection: PathRejection) -> Self {
        EditorError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for EditorError {
    fn from(rejection: QueryRejection) -> Self {
        EditorError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for EditorError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
