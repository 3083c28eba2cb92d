//! Mapping service failures onto HTTP responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use docsift_core::{ErrorKind, ServiceError};
use serde::{Deserialize, Serialize};

/// Error body returned by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("{0}")]
    BadRequest(String),
    #[error("document {0} not found")]
    NotFound(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Service(ServiceError::EmptyQuery) => (StatusCode::BAD_REQUEST, "MISSING_QUERY"),
            ApiError::Service(e) => match e.kind() {
                ErrorKind::Client => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD"),
                ErrorKind::NoData => (StatusCode::BAD_REQUEST, "NO_DATA"),
                ErrorKind::Extraction => (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_FAILED"),
                ErrorKind::Upstream => (StatusCode::BAD_GATEWAY, "EMBEDDING_FAILED"),
                ErrorKind::Timeout => (StatusCode::GATEWAY_TIMEOUT, "EMBEDDING_TIMEOUT"),
                ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            },
            ApiError::Multipart(e) => (e.status(), "INVALID_UPLOAD"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
