//! Storage error types.

use thiserror::Error;
use warden_types::{GroupId, PolicyId, PrincipalId, RoleId, TenantId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while operating on a partition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The tenant has no provisioned partition.
    #[error("partition not found: {0}")]
    PartitionNotFound(TenantId),

    /// A partition context is already active on this thread.
    #[error("partition {active} is already active, cannot enter {requested}")]
    PartitionAlreadyActive {
        active: TenantId,
        requested: TenantId,
    },

    /// A principal with the same username already exists for the tenant.
    #[error("principal '{username}' already exists for tenant {tenant}")]
    DuplicatePrincipal { username: String, tenant: TenantId },

    #[error("principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("policy not found: {0}")]
    PolicyNotFound(PolicyId),

    #[error("role not found: {0}")]
    RoleNotFound(RoleId),

    /// A writer panicked while holding the partition lock.
    #[error("partition {0} lock poisoned")]
    Poisoned(TenantId),
}
