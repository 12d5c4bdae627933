//! # Warden
//!
//! Access scoping and principal reconciliation for a multi-tenant RBAC
//! service.
//!
//! - **Query scoping** - which groups, roles and policies a caller may see,
//!   driven by admin status, grant maps, the request verb and query
//!   parameters
//! - **Principal reconciliation** - fail-safe removal of principals the
//!   identity service no longer knows
//! - **Tenant partitions** - every read and write runs inside one tenant's
//!   isolated partition
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Warden                            │
//! │  ┌──────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//! │  │  Config  │   │ TenantHandle │ → │ QueryScoper (rbac)   │  │
//! │  └──────────┘   └──────┬───────┘   └──────────────────────┘  │
//! │                        ▼                                     │
//! │                 ┌─────────────┐   ┌───────────────────────┐  │
//! │                 │    Store    │ ← │ PrincipalReconciler   │  │
//! │                 │ (partitions)│   │  → IdentitySource     │  │
//! │                 └─────────────┘   └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use warden::{CallerIdentity, QueryParams, StaticIdentitySource, TenantId, Warden, WardenConfig};
//!
//! let warden = Warden::new(WardenConfig::default(), Arc::new(StaticIdentitySource::new()))?;
//! let tenant = TenantId::from_account("10001");
//! warden.provision_tenant(&tenant)?;
//!
//! let caller = CallerIdentity::new("test_user").admin();
//! let roles = warden.tenant(tenant).roles(&caller, &QueryParams::new())?;
//! assert!(roles.is_empty());
//! # Ok::<(), warden::WardenError>(())
//! ```

mod error;
pub mod telemetry;
mod tenant;
mod warden;

// Service layer
pub use error::{Result, WardenError};
pub use tenant::{RoleListing, TenantHandle};
pub use warden::Warden;

// Re-export configuration
pub use warden_config::{ConfigError, ConfigLoader, WardenConfig};

// Re-export core types
pub use warden_types::{
    Access as RoleAccess, Group, GroupId, Policy, PolicyId, Principal, PrincipalId, Role, RoleId,
    TenantId,
};

// Re-export storage
pub use warden_store::{Catalog, Partition, Store, StoreError};

// Re-export access control
pub use warden_rbac::{
    Access, AccessGrantMap, CallerIdentity, HeaderError, IDENTITY_HEADER, Identity, Method,
    Operation, QueryParams, QueryScoper, ResourceType, Scope, ScopingError, Selector,
    access_for_user, allowed,
};

// Re-export principal reconciliation
pub use warden_principal::{
    IdentityError, IdentityResponse, IdentitySource, PrincipalReconciler, ReconcileOutcome,
    ReconcileReport, SkipReason, StaticIdentitySource,
};

#[cfg(test)]
mod tests;
