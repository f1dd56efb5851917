use thiserror::Error;

use crate::api::ApiError;

/// Central error type for site client operations.
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input rejected before any network call. The message is user-facing.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for site results.
pub type SiteResult<T> = Result<T, SiteError>;
