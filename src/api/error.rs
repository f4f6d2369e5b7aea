//! Error envelope returned by every failing endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::UpstreamError;
use crate::stripe::Operation;

/// Message returned for failures that are not the provider's to explain.
pub const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// `{"error": {"message": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The wrapped error.
    pub error: ErrorMessage,
}

/// Inner object of [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Human-readable message.
    pub message: String,
}

impl ErrorEnvelope {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorMessage {
                message: message.into(),
            },
        }
    }
}

/// Handler failure, already classified for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400 with the provider's message.
    BadRequest(String),
    /// 500 with a generic message.
    Internal,
}

impl ApiError {
    /// Classify an upstream failure, logging the full cause.
    pub fn from_upstream(operation: Operation, err: UpstreamError) -> Self {
        match err {
            UpstreamError::Provider {
                message,
                code,
                status,
                ..
            } => {
                warn!(
                    operation = %operation,
                    code = code.as_deref().unwrap_or("none"),
                    upstream_status = status,
                    "Stripe error occurred: {}",
                    message
                );
                ApiError::BadRequest(message)
            }
            UpstreamError::Transport { cause } => {
                error!(operation = %operation, "Other error occurred: {}", cause);
                ApiError::Internal
            }
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the envelope.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(message) => message,
            ApiError::Internal => UNKNOWN_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorEnvelope::new(self.message()))).into_response()
    }
}
