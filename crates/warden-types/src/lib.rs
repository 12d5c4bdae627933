//! # warden-types: Core types for `Warden`
//!
//! This crate contains the shared types used across the `Warden` system:
//! - Tenant identity ([`TenantId`])
//! - Entity IDs ([`PrincipalId`], [`GroupId`], [`RoleId`], [`PolicyId`])
//! - Cached entities ([`Principal`], [`Group`], [`Role`], [`Policy`])
//! - Role permission entries ([`Access`])
//!
//! Every entity belongs to exactly one tenant. Relationships are stored as
//! id sets on the owning side: a [`Group`] holds its principal and policy
//! ids, a [`Policy`] holds its role ids.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Tenant
// ============================================================================

/// Name of the shared partition that every deployment carries.
pub const PUBLIC_PARTITION: &str = "public";

/// Identifier for a tenant, which is also the name of its storage partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the tenant that owns the partition for an account number.
    ///
    /// # Examples
    ///
    /// ```
    /// # use warden_types::TenantId;
    /// assert_eq!(TenantId::from_account("10001").as_str(), "acct10001");
    /// ```
    pub fn from_account(account: &str) -> Self {
        Self(format!("acct{account}"))
    }

    /// The shared/default partition.
    pub fn public() -> Self {
        Self(PUBLIC_PARTITION.to_string())
    }

    pub fn is_public(&self) -> bool {
        self.0 == PUBLIC_PARTITION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the account number for `acct`-prefixed tenants.
    pub fn account(&self) -> Option<&str> {
        self.0.strip_prefix("acct").filter(|rest| !rest.is_empty())
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Entity IDs - UUID newtypes
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a cached principal.
    PrincipalId
);
uuid_id!(
    /// Unique identifier for a group.
    GroupId
);
uuid_id!(
    /// Unique identifier for a role.
    RoleId
);
uuid_id!(
    /// Unique identifier for a policy.
    PolicyId
);

// ============================================================================
// Entities
// ============================================================================

/// An identity cached locally for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    /// Imported through a cross-tenant delegation; never reconciled away.
    pub cross_account: bool,
    pub tenant: TenantId,
}

impl Principal {
    pub fn new(username: impl Into<String>, tenant: TenantId) -> Self {
        Self {
            id: PrincipalId::generate(),
            username: username.into(),
            cross_account: false,
            tenant,
        }
    }

    /// Marks the principal as imported from a cross-account request.
    pub fn cross_account(mut self) -> Self {
        self.cross_account = true;
        self
    }
}

/// A named collection of principals and policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub tenant: TenantId,
    pub principals: BTreeSet<PrincipalId>,
    pub policies: BTreeSet<PolicyId>,
}

impl Group {
    pub fn new(name: impl Into<String>, tenant: TenantId) -> Self {
        Self {
            id: GroupId::generate(),
            name: name.into(),
            tenant,
            principals: BTreeSet::new(),
            policies: BTreeSet::new(),
        }
    }

    pub fn has_principal(&self, principal: PrincipalId) -> bool {
        self.principals.contains(&principal)
    }
}

/// A single permission granted by a role.
///
/// Permissions have the form `application:resource_type:verb`, for example
/// `rbac:role:read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Access {
    pub permission: String,
}

impl Access {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }

    pub fn application(&self) -> &str {
        self.part(0)
    }

    pub fn resource_type(&self) -> &str {
        self.part(1)
    }

    pub fn verb(&self) -> &str {
        self.part(2)
    }

    fn part(&self, index: usize) -> &str {
        self.permission.split(':').nth(index).unwrap_or_default()
    }
}

/// A named permission unit, referenced by policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub tenant: TenantId,
    pub access: Vec<Access>,
}

impl Role {
    pub fn new(name: impl Into<String>, tenant: TenantId) -> Self {
        Self {
            id: RoleId::generate(),
            name: name.into(),
            tenant,
            access: Vec::new(),
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access.push(access);
        self
    }
}

/// A named collection of roles, attached to groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    pub tenant: TenantId,
    pub roles: BTreeSet<RoleId>,
}

impl Policy {
    pub fn new(name: impl Into<String>, tenant: TenantId) -> Self {
        Self {
            id: PolicyId::generate(),
            name: name.into(),
            tenant,
            roles: BTreeSet::new(),
        }
    }

    pub fn includes(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}
