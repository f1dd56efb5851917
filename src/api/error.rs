//! Error types for backend calls.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the site backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server returned an HTTP error response.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body, or the reason phrase.
        message: String,
        /// Parsed error body.
        body: Value,
    },

    /// The request did not complete within its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// A network or transport error occurred.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Failed to deserialize a success response.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid configuration (e.g. malformed base URL).
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// Timeouts and 4xx answers are not transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => !(400..500).contains(status),
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// True when no HTTP answer was received at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Message the backend put in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => body_message(body),
            _ => None,
        }
    }
}

/// Backends disagree on the field name; `message` wins over `error`.
pub(crate) fn body_message(body: &Value) -> Option<&str> {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|msg| !msg.trim().is_empty())
}

/// Convenience type alias for backend results.
pub type ApiResult<T> = Result<T, ApiError>;
