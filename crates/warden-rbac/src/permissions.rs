//! Grant maps derived from a principal's own role permissions.
//!
//! A principal reaches roles through `Group → Policy → Role`. Each role
//! carries `application:resource_type:verb` permissions; those for this
//! application widen the derived map:
//!
//! | Permission          | Grants                                   |
//! |---------------------|------------------------------------------|
//! | `rbac:group:read`   | `group.read = *`                         |
//! | `rbac:group:write`  | `group.read = *`, `group.write = *`      |
//! | `rbac:group:*`      | same as `write`                          |
//! | `rbac:*:*`          | read and write on every resource type    |
//!
//! Every resource type starts out with an explicit empty selector for both
//! operations, so an unknown principal or one with no roles is denied
//! everything.

use tracing::{debug, trace};
use warden_store::Catalog;
use warden_types::{Access as Permission, PrincipalId, Role};

use crate::grants::{AccessGrantMap, Operation, ResourceType, Selector, WILDCARD};

/// Application prefix of the permissions this service understands.
pub const APPLICATION: &str = "rbac";

const RESOURCE_TYPES: [ResourceType; 4] = [
    ResourceType::Group,
    ResourceType::Role,
    ResourceType::Policy,
    ResourceType::Principal,
];

/// Builds the grant map for `username` from the catalog's memberships.
pub fn access_for_user<C: Catalog + ?Sized>(catalog: &C, username: &str) -> AccessGrantMap {
    let mut grants = RESOURCE_TYPES.iter().fold(AccessGrantMap::new(), |map, &resource| {
        map.grant(resource, Operation::Read, Selector::none())
            .grant(resource, Operation::Write, Selector::none())
    });

    let Some(principal) = catalog.principal_by_username(username) else {
        debug!(tenant = %catalog.tenant(), username = %username, "No principal, granting nothing");
        return grants;
    };

    for role in roles_of(catalog, principal.id) {
        for permission in &role.access {
            for (resource, operation) in expand(permission) {
                trace!(
                    role = %role.name,
                    permission = %permission.permission,
                    resource = %resource,
                    operation = %operation,
                    "Granting wildcard"
                );
                grants = grants.grant(resource, operation, Selector::All);
            }
        }
    }
    grants
}

/// Roles reachable from the principal through its groups' policies.
fn roles_of<C: Catalog + ?Sized>(catalog: &C, principal: PrincipalId) -> Vec<&Role> {
    let policies: Vec<_> = catalog
        .groups()
        .filter(|group| group.has_principal(principal))
        .flat_map(|group| group.policies.iter().copied())
        .filter_map(|id| catalog.policy(id))
        .collect();

    catalog
        .roles()
        .filter(|role| policies.iter().any(|policy| policy.includes(role.id)))
        .collect()
}

/// Resource/operation pairs a single permission grants.
fn expand(permission: &Permission) -> Vec<(ResourceType, Operation)> {
    let application = permission.application();
    if application != APPLICATION && application != WILDCARD {
        return Vec::new();
    }

    let operations: &[Operation] = match permission.verb() {
        "read" => &[Operation::Read],
        "write" | WILDCARD => &[Operation::Read, Operation::Write],
        other => {
            debug!(permission = %permission.permission, verb = %other, "Ignoring unknown verb");
            return Vec::new();
        }
    };

    let resources: Vec<ResourceType> = match permission.resource_type() {
        WILDCARD => RESOURCE_TYPES.to_vec(),
        other => match other.parse::<ResourceType>() {
            Ok(resource) => vec![resource],
            Err(()) => {
                debug!(permission = %permission.permission, "Ignoring unknown resource type");
                return Vec::new();
            }
        },
    };

    resources
        .into_iter()
        .flat_map(|resource| operations.iter().map(move |&operation| (resource, operation)))
        .collect()
}
