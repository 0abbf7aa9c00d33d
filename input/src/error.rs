//! Error types for payload decoding.

use thiserror::Error;

/// Failure to turn a request body or query string into a mapping.
#[derive(Debug, Error)]
pub enum InputError {
    /// The body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON body is valid but its top level is not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The content type is neither JSON nor form-encoded.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The body exceeds the configured size limit.
    #[error("body of {actual} bytes exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize, actual: usize },
}

/// Result type for decoding operations.
pub type Result<T> = std::result::Result<T, InputError>;
