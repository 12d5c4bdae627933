//! Principals created for cross-account access requests.

use tracing::info;
use warden_store::{Store, StoreError};
use warden_types::{Principal, TenantId};

/// Username of the principal standing in for `user_id` inside
/// `target_account`, e.g. `10001-1111111`.
pub fn cross_principal_name(target_account: &str, user_id: &str) -> String {
    format!("{target_account}-{user_id}")
}

/// Gets or creates the cross-account principal for `user_id` in
/// `target_account`.
///
/// The row is written to the target tenant's partition and mirrored into
/// the `public` partition, both owned by the target tenant. Idempotent.
///
/// # Errors
///
/// - [`StoreError::PartitionNotFound`] if the target tenant is not provisioned
/// - [`StoreError::DuplicatePrincipal`] if a regular principal already holds
///   the username
pub fn create_cross_principal(
    store: &Store,
    target_account: &str,
    user_id: &str,
) -> Result<Principal, StoreError> {
    create_cross_principal_in(store, &TenantId::public(), target_account, user_id)
}

/// Like [`create_cross_principal`], mirroring into `shared` instead of
/// `public`.
pub fn create_cross_principal_in(
    store: &Store,
    shared: &TenantId,
    target_account: &str,
    user_id: &str,
) -> Result<Principal, StoreError> {
    let username = cross_principal_name(target_account, user_id);
    let owner = TenantId::from_account(target_account);
    let row = || Principal::new(username.clone(), owner.clone()).cross_account();

    let principal =
        store.with_partition(&owner, |p| p.get_or_insert_principal(row()).cloned())??;
    store.with_partition(shared, |p| p.get_or_insert_principal(row()).map(|_| ()))??;

    info!(tenant = %owner, username = %principal.username, "Cross-account principal ready");
    Ok(principal)
}
