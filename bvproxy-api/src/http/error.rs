// HTTP error handling

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bvproxy_core::RateLimitError;
use bvproxy_providers::BilibiliError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Convert resolver errors to HTTP errors
///
/// Upstream contract violations are logged with full detail but surface as a
/// generic 500.
impl From<BilibiliError> for AppError {
    fn from(err: BilibiliError) -> Self {
        match err {
            BilibiliError::InvalidId(_) => AppError::bad_request("Invalid BV number"),
            e @ (BilibiliError::Network(_)
            | BilibiliError::EmptyResponse(_)
            | BilibiliError::MissingField { .. }) => {
                tracing::error!("Video resolution failed: {}", e);
                AppError::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        let message = err.to_string();
        match err {
            RateLimitError::RateLimitExceeded {
                retry_after_seconds,
                ..
            } => AppError::too_many_requests(message, retry_after_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilibili_error_mapping() {
        let err: AppError = BilibiliError::InvalidId("BVx".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: AppError = BilibiliError::MissingField {
            api: "playurl",
            path: "data.durl[0]".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("durl"));
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let err: AppError = RateLimitError::RateLimitExceeded {
            max_requests: 10,
            window_seconds: 60,
            retry_after_seconds: 6,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "6");
    }
}
