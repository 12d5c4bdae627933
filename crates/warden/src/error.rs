//! Error types for the Warden service layer.

use thiserror::Error;
use warden_config::ConfigError;
use warden_rbac::{HeaderError, ScopingError};
use warden_store::StoreError;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Errors surfaced by [`crate::Warden`] and [`crate::TenantHandle`].
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Validation or permission failure while scoping a listing.
    #[error(transparent)]
    Scoping(#[from] ScopingError),

    #[error("invalid identity header: {0}")]
    Header(#[from] HeaderError),
}
