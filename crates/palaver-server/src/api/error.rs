//! HTTP API errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use palaver_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned from an HTTP handler as `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    #[error("Authentication required")]
    Unauthorized,
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),
    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),
    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Capacity exhausted or shutting down.
    #[error("{0}")]
    Unavailable(String),
    /// Anything else; details are logged, not returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(detail = %detail, "request failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
