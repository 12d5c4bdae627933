//! A single tenant's isolated data partition.

use std::collections::BTreeMap;

use tracing::debug;
use warden_types::{
    Group, GroupId, Policy, PolicyId, Principal, PrincipalId, Role, RoleId, TenantId,
};

use crate::catalog::Catalog;
use crate::error::{Result, StoreError};

/// Rows stored in one partition.
///
/// A tenant partition only holds rows owned by that tenant. The shared
/// `public` partition may also hold principal rows that reference other
/// tenants (cross-account imports are mirrored there).
#[derive(Debug, Clone)]
pub struct Partition {
    name: TenantId,
    principals: BTreeMap<PrincipalId, Principal>,
    groups: BTreeMap<GroupId, Group>,
    roles: BTreeMap<RoleId, Role>,
    policies: BTreeMap<PolicyId, Policy>,
}

impl Partition {
    pub(crate) fn new(name: TenantId) -> Self {
        Self {
            name,
            principals: BTreeMap::new(),
            groups: BTreeMap::new(),
            roles: BTreeMap::new(),
            policies: BTreeMap::new(),
        }
    }

    /// Name of the partition (the tenant it belongs to, or `public`).
    pub fn name(&self) -> &TenantId {
        &self.name
    }

    // ------------------------------------------------------------------------
    // Principals
    // ------------------------------------------------------------------------

    /// Inserts a principal, enforcing unique usernames per owning tenant.
    pub fn insert_principal(&mut self, principal: Principal) -> Result<PrincipalId> {
        if self
            .find_principal(&principal.username, &principal.tenant)
            .is_some()
        {
            return Err(StoreError::DuplicatePrincipal {
                username: principal.username,
                tenant: principal.tenant,
            });
        }
        let id = principal.id;
        self.principals.insert(id, principal);
        Ok(id)
    }

    /// Returns the existing principal with the same username, tenant and
    /// cross-account flag, or inserts the given one.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicatePrincipal`] if the username is taken by a row
    /// whose cross-account flag differs.
    pub fn get_or_insert_principal(&mut self, principal: Principal) -> Result<&Principal> {
        let id = match self.find_principal(&principal.username, &principal.tenant) {
            Some(existing) if existing.cross_account == principal.cross_account => existing.id,
            Some(_) => {
                return Err(StoreError::DuplicatePrincipal {
                    username: principal.username,
                    tenant: principal.tenant,
                });
            }
            None => {
                let id = principal.id;
                self.principals.insert(id, principal);
                id
            }
        };
        Ok(&self.principals[&id])
    }

    /// Finds a principal by username among rows owned by `tenant`.
    pub fn find_principal(&self, username: &str, tenant: &TenantId) -> Option<&Principal> {
        self.principals
            .values()
            .find(|p| p.username == username && &p.tenant == tenant)
    }

    pub fn principal_count(&self) -> usize {
        self.principals.len()
    }

    /// Deletes every principal matching `predicate` and strips the deleted
    /// ids from group memberships. Returns the removed rows.
    pub fn delete_principals_where<F>(&mut self, predicate: F) -> Vec<Principal>
    where
        F: Fn(&Principal) -> bool,
    {
        let doomed: Vec<PrincipalId> = self
            .principals
            .values()
            .filter(|p| predicate(*p))
            .map(|p| p.id)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(principal) = self.principals.remove(&id) {
                for group in self.groups.values_mut() {
                    group.principals.remove(&id);
                }
                debug!(
                    partition = %self.name,
                    username = %principal.username,
                    "Principal deleted"
                );
                removed.push(principal);
            }
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Groups, roles, policies
    // ------------------------------------------------------------------------

    pub fn insert_group(&mut self, group: Group) -> GroupId {
        let id = group.id;
        self.groups.insert(id, group);
        id
    }

    pub fn insert_role(&mut self, role: Role) -> RoleId {
        let id = role.id;
        self.roles.insert(id, role);
        id
    }

    pub fn insert_policy(&mut self, policy: Policy) -> PolicyId {
        let id = policy.id;
        self.policies.insert(id, policy);
        id
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn add_principal_to_group(&mut self, group: GroupId, principal: PrincipalId) -> Result<()> {
        if !self.principals.contains_key(&principal) {
            return Err(StoreError::PrincipalNotFound(principal));
        }
        self.groups
            .get_mut(&group)
            .ok_or(StoreError::GroupNotFound(group))?
            .principals
            .insert(principal);
        Ok(())
    }

    pub fn add_policy_to_group(&mut self, group: GroupId, policy: PolicyId) -> Result<()> {
        if !self.policies.contains_key(&policy) {
            return Err(StoreError::PolicyNotFound(policy));
        }
        self.groups
            .get_mut(&group)
            .ok_or(StoreError::GroupNotFound(group))?
            .policies
            .insert(policy);
        Ok(())
    }

    pub fn add_role_to_policy(&mut self, policy: PolicyId, role: RoleId) -> Result<()> {
        if !self.roles.contains_key(&role) {
            return Err(StoreError::RoleNotFound(role));
        }
        self.policies
            .get_mut(&policy)
            .ok_or(StoreError::PolicyNotFound(policy))?
            .roles
            .insert(role);
        Ok(())
    }
}

impl Catalog for Partition {
    fn tenant(&self) -> &TenantId {
        &self.name
    }

    fn principals(&self) -> Box<dyn Iterator<Item = &Principal> + '_> {
        Box::new(self.principals.values())
    }

    fn groups(&self) -> Box<dyn Iterator<Item = &Group> + '_> {
        Box::new(self.groups.values())
    }

    fn roles(&self) -> Box<dyn Iterator<Item = &Role> + '_> {
        Box::new(self.roles.values())
    }

    fn policies(&self) -> Box<dyn Iterator<Item = &Policy> + '_> {
        Box::new(self.policies.values())
    }

    fn principal_by_username(&self, username: &str) -> Option<&Principal> {
        self.find_principal(username, &self.name)
    }

    fn policy(&self, id: PolicyId) -> Option<&Policy> {
        self.policies.get(&id)
    }
}
