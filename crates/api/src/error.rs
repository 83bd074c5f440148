//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engagement::EngagementError;
use thiserror::Error;
use tracing::error;

/// Server error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engagement(#[from] EngagementError),

    #[error("Invalid connection id: {0}")]
    InvalidConnectionId(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Metrics exporter unavailable")]
    MetricsUnavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engagement(EngagementError::UnknownSession(_)) => StatusCode::NOT_FOUND,
            ApiError::Engagement(EngagementError::DuplicateSession(_)) => StatusCode::CONFLICT,
            ApiError::Engagement(EngagementError::InsufficientData) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::InvalidConnectionId(_) => StatusCode::BAD_REQUEST,
            ApiError::MetricsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Engagement(EngagementError::UnknownSession(_)) => {
                "User data not found".to_string()
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, body).into_response()
    }
}
