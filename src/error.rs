//! Error types for everything around the pipeline.
//!
//! The pipeline itself has no error type: malformed records are skipped.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Key-value persistence failures (thread store)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("trace too large to share ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },
    #[error("compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

/// Failures getting a trace into the pipeline, plus the two "nothing to show"
/// outcomes the caller is expected to surface.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read trace file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to fetch trace: {0}")]
    Http(#[from] reqwest::Error),
    #[error("trace URL returned {status}")]
    Status { status: u16 },
    #[error("No messages found in trace")]
    NoMessages,
    #[error("Trace contains {messages} messages but none could be displayed")]
    NoEvents { messages: usize },
}

/// JSON error body returned by the HTTP API
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),
    #[error("No trace file is being hosted")]
    NoHostedTrace,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Share(#[from] ShareError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ThreadNotFound(_) | ApiError::NoHostedTrace => StatusCode::NOT_FOUND,
            ApiError::Load(LoadError::NoMessages | LoadError::NoEvents { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Load(LoadError::Http(_) | LoadError::Status { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Load(LoadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Share(ShareError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Share(ShareError::Compress(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = ApiError::ThreadNotFound("t".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::from(LoadError::NoEvents { messages: 3 }).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = ApiError::from(ShareError::TooLarge { size: 9000, limit: 8192 }).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_no_content_messages() {
        assert_eq!(LoadError::NoMessages.to_string(), "No messages found in trace");
        assert_eq!(
            LoadError::NoEvents { messages: 2 }.to_string(),
            "Trace contains 2 messages but none could be displayed"
        );
    }
}
