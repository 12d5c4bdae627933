//! Scoping error types.

use thiserror::Error;

/// Result type for query scoping.
pub type Result<T> = std::result::Result<T, ScopingError>;

/// Errors surfaced to the caller of a scoper.
///
/// Authorization mismatches that are not listed here are silent: they
/// produce an empty result instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopingError {
    /// A query parameter was rejected.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The caller may not run this query.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },
}

/// Errors decoding the identity header.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("identity header is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("identity header is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("identity header has no user")]
    MissingUser,

    #[error("identity header has no account number")]
    MissingAccount,
}
