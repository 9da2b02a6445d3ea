//! API errors mapped to HTTP status codes.
//!
//! Every variant renders as a JSON body `{"error": "message"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::service::ServiceError;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or empty question (400).
    BadRequest(String),
    /// Resource not found (404).
    NotFound(String),
    /// Index missing, corrupt or still loading (503).
    ServiceUnavailable(String),
    /// Embedding or search failure (500).
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(_) | ServiceError::NotReady => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            ServiceError::InvalidQuestion => ApiError::BadRequest(err.to_string()),
            ServiceError::Embedding(_) | ServiceError::Search(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
