//! Access-scoped listings of groups, roles and policies.
//!
//! A [`QueryScoper`] narrows a tenant's full collection down to what the
//! current caller may see. The rules per path:
//!
//! | Path   | Admin                  | Non-admin                        | `username` (non-admin)               |
//! |--------|------------------------|----------------------------------|--------------------------------------|
//! | Group  | all, or by `username`  | own groups                       | own → own groups, other → empty      |
//! | Role   | all, or by `username`  | grant map (`role`)               | own → PermissionDenied, other → empty |
//! | Policy | all                    | grant map (`policy`)             | n/a                                  |
//!
//! `scope=principal` forces the non-admin evaluation on every path; any
//! other `scope` value is rejected before the caller is considered.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, trace, warn};
use uuid::Uuid;
use warden_store::Catalog;
use warden_types::{Group, Policy, PolicyId, Role, RoleId};

use crate::caller::CallerIdentity;
use crate::error::{Result, ScopingError};
use crate::grants::{ResourceType, allowed};
use crate::query::{QueryParams, Scope};

/// A role annotated with its request-time counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView<'a> {
    #[serde(flatten)]
    pub role: &'a Role,
    /// Number of access entries on the role.
    pub access_count: usize,
    /// Number of policies that include the role.
    pub policy_count: usize,
}

/// Scopes listings of one tenant's records for one caller.
///
/// Scoping is read-only; scopers for different requests can run
/// concurrently against shared catalogs.
pub struct QueryScoper<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    caller: &'a CallerIdentity,
    params: &'a QueryParams,
}

impl<'a, C: Catalog + ?Sized> QueryScoper<'a, C> {
    pub fn new(catalog: &'a C, caller: &'a CallerIdentity, params: &'a QueryParams) -> Self {
        Self {
            catalog,
            caller,
            params,
        }
    }

    // ------------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------------

    /// Groups visible to the caller, ordered by name.
    pub fn groups(&self) -> Result<Vec<&'a Group>> {
        let scope = self.params.scope()?;
        let catalog = self.catalog;
        let bypass = self.caller.is_admin && scope == Scope::Account;

        let groups = match self.params.username.as_deref() {
            Some(username) if bypass => self.groups_for_username(username),
            Some(username) if username == self.caller.username => {
                self.groups_for_username(username)
            }
            Some(username) => {
                debug!(
                    tenant = %catalog.tenant(),
                    caller = %self.caller.username,
                    username = %username,
                    "Group listing for another principal hidden"
                );
                Vec::new()
            }
            None if bypass => catalog.groups().collect(),
            None => self.groups_for_username(&self.caller.username),
        };
        Ok(sorted_by_name(groups, |g| &g.name))
    }

    fn groups_for_username(&self, username: &str) -> Vec<&'a Group> {
        let catalog = self.catalog;
        match catalog.principal_by_username(username) {
            Some(principal) => catalog
                .groups()
                .filter(|group| group.has_principal(principal.id))
                .collect(),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------------

    /// Roles visible to the caller, annotated with counts, ordered by name.
    ///
    /// # Errors
    ///
    /// - [`ScopingError::Validation`] for an unsupported `scope`
    /// - [`ScopingError::PermissionDenied`] when a non-admin filters by their
    ///   own username (they must omit the filter to see their own scope)
    pub fn roles(&self) -> Result<Vec<RoleView<'a>>> {
        let scope = self.params.scope()?;

        let roles = if scope == Scope::Principal {
            self.roles_by_grants()
        } else if let Some(username) = self.params.username.as_deref() {
            if self.caller.is_admin {
                self.roles_for_username(username)
            } else if username == self.caller.username {
                warn!(
                    tenant = %self.catalog.tenant(),
                    caller = %self.caller.username,
                    "Role listing by own username denied"
                );
                return Err(ScopingError::PermissionDenied {
                    reason: "non-admin callers may not filter roles by their own username"
                        .to_string(),
                });
            } else {
                debug!(
                    tenant = %self.catalog.tenant(),
                    caller = %self.caller.username,
                    username = %username,
                    "Role listing for another principal hidden"
                );
                Vec::new()
            }
        } else if self.caller.is_admin {
            let catalog = self.catalog;
            catalog.roles().collect()
        } else {
            self.roles_by_grants()
        };

        Ok(self.annotate(sorted_by_name(roles, |r| &r.name)))
    }

    fn roles_by_grants(&self) -> Vec<&'a Role> {
        let catalog = self.catalog;
        let roles: Vec<&'a Role> = catalog.roles().collect();
        self.filter_by_grants(ResourceType::Role, roles, |role| role.id.as_uuid())
    }

    /// Roles reachable through Group → Policy → Role for a principal.
    fn roles_for_username(&self, username: &str) -> Vec<&'a Role> {
        let catalog = self.catalog;
        let policy_ids: BTreeSet<PolicyId> = self
            .groups_for_username(username)
            .into_iter()
            .flat_map(|group| group.policies.iter().copied())
            .collect();
        let role_ids: BTreeSet<RoleId> = policy_ids
            .into_iter()
            .filter_map(|id| catalog.policy(id))
            .flat_map(|policy| policy.roles.iter().copied())
            .collect();
        catalog
            .roles()
            .filter(|role| role_ids.contains(&role.id))
            .collect()
    }

    fn annotate(&self, roles: Vec<&'a Role>) -> Vec<RoleView<'a>> {
        let mut policy_counts: HashMap<RoleId, usize> = HashMap::new();
        for policy in self.catalog.policies() {
            for role in &policy.roles {
                *policy_counts.entry(*role).or_default() += 1;
            }
        }
        roles
            .into_iter()
            .map(|role| RoleView {
                role,
                access_count: role.access.len(),
                policy_count: policy_counts.get(&role.id).copied().unwrap_or_default(),
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Policies
    // ------------------------------------------------------------------------

    /// Policies visible to the caller, ordered by name.
    pub fn policies(&self) -> Result<Vec<&'a Policy>> {
        let scope = self.params.scope()?;
        let catalog = self.catalog;
        let policies: Vec<&'a Policy> = catalog.policies().collect();

        let policies = if self.caller.is_admin && scope == Scope::Account {
            policies
        } else {
            self.filter_by_grants(ResourceType::Policy, policies, |policy| {
                policy.id.as_uuid()
            })
        };
        Ok(sorted_by_name(policies, |p| &p.name))
    }

    // ------------------------------------------------------------------------
    // Shared
    // ------------------------------------------------------------------------

    fn filter_by_grants<T, F>(&self, resource: ResourceType, items: Vec<&'a T>, id: F) -> Vec<&'a T>
    where
        F: Fn(&T) -> Uuid,
    {
        let operation = self.caller.operation();
        let access = allowed(
            &self.caller.grants,
            resource,
            operation,
            items.iter().map(|item| id(*item)),
        );
        trace!(
            tenant = %self.catalog.tenant(),
            caller = %self.caller.username,
            resource = %resource,
            operation = %operation,
            access = ?access,
            "Grant map evaluated"
        );
        access.filter(items, |item| id(*item))
    }
}

fn sorted_by_name<T, F>(mut items: Vec<&T>, name: F) -> Vec<&T>
where
    F: Fn(&T) -> &String,
{
    items.sort_by(|a, b| name(*a).cmp(name(*b)));
    items
}
