//! Tenant-scoped handle for listing access-control records.

use serde::Serialize;
use warden_rbac::{
    AccessGrantMap, CallerIdentity, QueryParams, QueryScoper, RoleView, access_for_user,
};
use warden_store::{Partition, Store};
use warden_types::{Group, Policy, Role, TenantId};

use crate::error::Result;

/// An owned role listing entry, serialized with camelCase counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleListing {
    #[serde(flatten)]
    pub role: Role,
    pub access_count: usize,
    pub policy_count: usize,
}

impl From<RoleView<'_>> for RoleListing {
    fn from(view: RoleView<'_>) -> Self {
        Self {
            role: view.role.clone(),
            access_count: view.access_count,
            policy_count: view.policy_count,
        }
    }
}

/// Handle for one tenant's records.
///
/// Each call enters the tenant partition for the duration of the listing
/// and returns owned copies.
#[derive(Debug, Clone)]
pub struct TenantHandle {
    store: Store,
    tenant: TenantId,
}

impl TenantHandle {
    pub(crate) fn new(store: Store, tenant: TenantId) -> Self {
        Self { store, tenant }
    }

    pub fn id(&self) -> &TenantId {
        &self.tenant
    }

    /// Groups visible to `caller`.
    pub fn groups(&self, caller: &CallerIdentity, params: &QueryParams) -> Result<Vec<Group>> {
        self.scoped(|p| {
            let groups = QueryScoper::new(p, caller, params).groups()?;
            Ok(groups.into_iter().cloned().collect())
        })
    }

    /// Roles visible to `caller`, with access and policy counts.
    pub fn roles(
        &self,
        caller: &CallerIdentity,
        params: &QueryParams,
    ) -> Result<Vec<RoleListing>> {
        self.scoped(|p| {
            let roles = QueryScoper::new(p, caller, params).roles()?;
            Ok(roles.into_iter().map(RoleListing::from).collect())
        })
    }

    /// Policies visible to `caller`.
    pub fn policies(&self, caller: &CallerIdentity, params: &QueryParams) -> Result<Vec<Policy>> {
        self.scoped(|p| {
            let policies = QueryScoper::new(p, caller, params).policies()?;
            Ok(policies.into_iter().cloned().collect())
        })
    }

    /// Grant map derived from `username`'s own group, policy and role
    /// memberships in this tenant.
    pub fn access_for_user(&self, username: &str) -> Result<AccessGrantMap> {
        self.scoped(|p| Ok(access_for_user(p, username)))
    }

    /// Runs `f` against the tenant's partition.
    pub fn with_partition<R>(&self, f: impl FnOnce(&mut Partition) -> R) -> Result<R> {
        Ok(self.store.with_partition(&self.tenant, f)?)
    }

    fn scoped<R>(&self, f: impl FnOnce(&Partition) -> Result<R>) -> Result<R> {
        self.store.with_partition(&self.tenant, |p| f(&*p))?
    }
}
