//! Error types for dispatching.

use thiserror::Error;

/// Dispatch-specific errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The method name is not one the dispatcher routes.
    #[error("unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// Invalid path pattern.
    #[error("invalid path pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A required path parameter was not bound by the matched route.
    #[error("missing path parameter: {0}")]
    MissingParam(String),

    /// The request body could not be decoded as JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The query string or form body could not be decoded.
    #[error("invalid url-encoded data: {0}")]
    UrlEncoded(#[from] serde_urlencoded::de::Error),

    /// The transport-supplied deadline has passed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// A route manifest could not be loaded.
    #[error("invalid manifest: {0}")]
    Manifest(String),
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
