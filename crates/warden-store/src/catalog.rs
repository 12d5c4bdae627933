//! Read-only view of a tenant's records.

use warden_types::{Group, Policy, PolicyId, Principal, Role, TenantId};

/// Read access to the records of one tenant.
///
/// Query scoping only ever reads through this trait, so any storage engine
/// that can list a tenant's rows can back it.
pub trait Catalog {
    /// Tenant the records belong to.
    fn tenant(&self) -> &TenantId;

    fn principals(&self) -> Box<dyn Iterator<Item = &Principal> + '_>;

    fn groups(&self) -> Box<dyn Iterator<Item = &Group> + '_>;

    fn roles(&self) -> Box<dyn Iterator<Item = &Role> + '_>;

    fn policies(&self) -> Box<dyn Iterator<Item = &Policy> + '_>;

    /// Looks up a principal of this tenant by username.
    fn principal_by_username(&self, username: &str) -> Option<&Principal>;

    fn policy(&self, id: PolicyId) -> Option<&Policy>;
}
