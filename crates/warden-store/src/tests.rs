//! Unit tests for warden-store

use std::panic::{AssertUnwindSafe, catch_unwind};

use warden_types::{Group, Policy, Principal, Role, TenantId};

use crate::{Catalog, Store, StoreError, active_partition};

fn tenant() -> TenantId {
    TenantId::from_account("10001")
}

fn provisioned() -> Store {
    let store = Store::new();
    store.provision(&tenant()).unwrap();
    store
}

// ============================================================================
// Partition context
// ============================================================================

#[test]
fn new_store_has_only_public_partition() {
    let store = Store::new();
    assert!(store.has_partition(&TenantId::public()));
    assert!(store.tenants().unwrap().is_empty());
}

#[test]
fn provision_is_idempotent() {
    let store = Store::new();
    assert!(store.provision(&tenant()).unwrap());
    assert!(!store.provision(&tenant()).unwrap());
    assert_eq!(store.tenants().unwrap(), vec![tenant()]);
}

#[test]
fn unknown_partition_is_an_error() {
    let store = Store::new();
    let result = store.with_partition(&tenant(), |_| ());
    assert_eq!(result, Err(StoreError::PartitionNotFound(tenant())));
    assert_eq!(active_partition(), None);
}

#[test]
fn context_is_active_only_inside_closure() {
    let store = provisioned();
    assert_eq!(active_partition(), None);

    let inside = store.with_partition(&tenant(), |_| active_partition()).unwrap();

    assert_eq!(inside, Some(tenant()));
    assert_eq!(active_partition(), None);
}

#[test]
fn nested_partitions_are_rejected() {
    let store = provisioned();

    let nested = store
        .with_partition(&tenant(), |_| {
            store.with_partition(&TenantId::public(), |_| ())
        })
        .unwrap();

    assert_eq!(
        nested,
        Err(StoreError::PartitionAlreadyActive {
            active: tenant(),
            requested: TenantId::public(),
        })
    );
    // Outer context still cleared afterwards.
    assert_eq!(active_partition(), None);
}

#[test]
fn context_is_restored_after_panic() {
    let store = provisioned();

    let result = catch_unwind(AssertUnwindSafe(|| {
        store
            .with_partition(&tenant(), |p| assert_eq!(p.principal_count(), 1, "boom"))
            .ok();
    }));

    assert!(result.is_err());
    assert_eq!(active_partition(), None);
    // The panicking writer poisoned the partition.
    assert_eq!(
        store.with_partition(&tenant(), |_| ()),
        Err(StoreError::Poisoned(tenant()))
    );
}

#[test]
fn partitions_are_isolated() {
    let store = provisioned();
    let other = TenantId::from_account("10002");
    store.provision(&other).unwrap();

    store
        .with_partition(&tenant(), |p| p.insert_principal(Principal::new("user1", tenant())))
        .unwrap()
        .unwrap();

    let other_count = store.with_partition(&other, |p| p.principal_count()).unwrap();
    assert_eq!(other_count, 0);
}

// ============================================================================
// Principals
// ============================================================================

#[test]
fn duplicate_username_per_tenant_is_rejected() {
    let store = provisioned();

    let result = store
        .with_partition(&tenant(), |p| {
            p.insert_principal(Principal::new("user1", tenant()))?;
            p.insert_principal(Principal::new("user1", tenant()))
        })
        .unwrap();

    assert!(matches!(result, Err(StoreError::DuplicatePrincipal { .. })));
}

#[test]
fn public_partition_holds_same_username_for_different_tenants() {
    let store = Store::new();
    let public = TenantId::public();

    store
        .with_partition(&public, |p| {
            p.insert_principal(Principal::new("user1", TenantId::from_account("1")))?;
            p.insert_principal(Principal::new("user1", TenantId::from_account("2")))
        })
        .unwrap()
        .unwrap();

    let count = store.with_partition(&public, |p| p.principal_count()).unwrap();
    assert_eq!(count, 2);
}

#[test]
fn get_or_insert_returns_existing_row() {
    let store = provisioned();

    let (first, second, count) = store
        .with_partition(&tenant(), |p| {
            let car = || Principal::new("car", tenant()).cross_account();
            let first = p.get_or_insert_principal(car()).unwrap().id;
            let second = p.get_or_insert_principal(car()).unwrap().id;
            (first, second, p.principal_count())
        })
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(count, 1);
}

#[test]
fn get_or_insert_rejects_row_with_other_cross_account_flag() {
    let store = provisioned();

    let (result, stored) = store
        .with_partition(&tenant(), |p| {
            p.insert_principal(Principal::new("car", tenant())).unwrap();
            let result = p
                .get_or_insert_principal(Principal::new("car", tenant()).cross_account())
                .cloned();
            let stored = p.find_principal("car", &tenant()).cloned();
            (result, stored)
        })
        .unwrap();

    assert_eq!(
        result,
        Err(StoreError::DuplicatePrincipal {
            username: "car".to_string(),
            tenant: tenant(),
        })
    );
    assert!(!stored.unwrap().cross_account);
}

#[test]
fn deleting_principal_removes_group_membership() {
    let store = provisioned();

    let group_id = store
        .with_partition(&tenant(), |p| {
            let principal = p.insert_principal(Principal::new("user1", tenant()))?;
            let group = p.insert_group(Group::new("groupA", tenant()));
            p.add_principal_to_group(group, principal)?;
            Ok::<_, StoreError>(group)
        })
        .unwrap()
        .unwrap();

    let removed = store
        .with_partition(&tenant(), |p| p.delete_principals_where(|pr| pr.username == "user1"))
        .unwrap();
    assert_eq!(removed.len(), 1);

    let members = store
        .with_partition(&tenant(), |p| p.group(group_id).map(|g| g.principals.len()))
        .unwrap();
    assert_eq!(members, Some(0));
}

#[test]
fn relationship_helpers_validate_ids() {
    let store = provisioned();

    store
        .with_partition(&tenant(), |p| {
            let role = Role::new("role1", tenant());
            let missing_role = role.id;
            let policy = p.insert_policy(Policy::new("policy1", tenant()));
            assert_eq!(
                p.add_role_to_policy(policy, missing_role),
                Err(StoreError::RoleNotFound(missing_role))
            );

            let role = p.insert_role(role);
            p.add_role_to_policy(policy, role).unwrap();
            assert!(p.policy(policy).unwrap().includes(role));

            let group = Group::new("group1", tenant());
            let missing_group = group.id;
            assert_eq!(
                p.add_policy_to_group(missing_group, policy),
                Err(StoreError::GroupNotFound(missing_group))
            );
        })
        .unwrap();
}

#[test]
fn catalog_lookup_is_scoped_to_partition_tenant() {
    let store = Store::new();
    let public = TenantId::public();

    let found = store
        .with_partition(&public, |p| {
            p.insert_principal(Principal::new("user1", tenant())).unwrap();
            p.principal_by_username("user1").is_some()
        })
        .unwrap();

    // Rows in the shared partition belong to other tenants.
    assert!(!found);
}
