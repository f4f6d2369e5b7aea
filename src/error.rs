//! Unified error types for the terminal backend.

use thiserror::Error;

/// Unified error type for the service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client construction error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid upstream base URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure of a single upstream payment API call.
///
/// Handlers switch on the variant: a `Provider` error is the provider telling
/// the caller what went wrong and is safe to surface, a `Transport` error is
/// anything else and stays server-side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The provider answered with a structured error object.
    #[error("{message}")]
    Provider {
        /// Human-readable message from the provider.
        message: String,
        /// Machine-usable error code (e.g. `resource_missing`).
        code: Option<String>,
        /// Error type (e.g. `invalid_request_error`).
        kind: Option<String>,
        /// HTTP status the provider answered with.
        status: u16,
    },

    /// Network failure, timeout, or a response that could not be decoded.
    #[error("transport error: {cause}")]
    Transport {
        /// Description of the underlying failure.
        cause: String,
    },
}

impl UpstreamError {
    /// Build a provider error with only a message, as stubs usually need.
    pub fn provider(message: impl Into<String>) -> Self {
        UpstreamError::Provider {
            message: message.into(),
            code: None,
            kind: None,
            status: 400,
        }
    }

    /// Build a transport error from anything displayable.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        UpstreamError::Transport {
            cause: cause.to_string(),
        }
    }

    /// Whether the provider itself produced this error.
    pub fn is_provider(&self) -> bool {
        matches!(self, UpstreamError::Provider { .. })
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::transport(err)
    }
}
