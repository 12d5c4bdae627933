//! Service-level tests for the Warden facade

use std::sync::Arc;

use warden_rbac::identity::UserInfo;

use crate::{
    AccessGrantMap, CallerIdentity, Catalog, ConfigError, Group, Identity, Method, Operation,
    Policy, Principal, QueryParams, ReconcileOutcome, ResourceType, Role, RoleAccess,
    ScopingError, Selector, StaticIdentitySource, TenantId, Warden, WardenConfig, WardenError,
};

fn tenant() -> TenantId {
    TenantId::from_account("10001")
}

fn service() -> (Warden, Arc<StaticIdentitySource>) {
    let source = Arc::new(StaticIdentitySource::new());
    let warden = Warden::new(WardenConfig::default(), source.clone()).unwrap();
    warden.provision_tenant(&tenant()).unwrap();
    (warden, source)
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = WardenConfig::default();
    config.identity.timeout_ms = 0;

    let result = Warden::new(config, Arc::new(StaticIdentitySource::new()));

    assert!(matches!(
        result,
        Err(WardenError::Config(ConfigError::ValidationError(_)))
    ));
}

#[test]
fn custom_shared_partition_is_provisioned() {
    let mut config = WardenConfig::default();
    config.reconciler.shared_partition = "shared".to_string();

    let warden = Warden::new(config, Arc::new(StaticIdentitySource::new())).unwrap();

    assert!(warden.store().has_partition(&TenantId::new("shared")));
    assert_eq!(
        warden.reconciler().timeout(),
        warden.config().identity.timeout()
    );
}

#[test]
fn provisioning_twice_reports_existing_tenant() {
    let (warden, _) = service();
    assert!(!warden.provision_tenant(&tenant()).unwrap());
}

#[test]
fn caller_is_resolved_from_identity_header() {
    let (warden, _) = service();
    let header = Identity {
        account_number: Some("10001".to_string()),
        kind: Some("User".to_string()),
        user: Some(UserInfo {
            username: "test_user".to_string(),
            is_org_admin: true,
            ..UserInfo::default()
        }),
        ..Identity::default()
    }
    .encode()
    .unwrap();

    let (tenant_id, caller) = warden
        .caller_from_header(&header, AccessGrantMap::new(), "put".parse().unwrap())
        .unwrap();

    assert_eq!(tenant_id, tenant());
    assert_eq!(caller.username, "test_user");
    assert!(caller.is_admin);
    assert_eq!(caller.operation(), Operation::Write);
}

#[test]
fn malformed_identity_header_is_rejected() {
    let (warden, _) = service();

    let result = warden.caller_from_header("not base64!", AccessGrantMap::new(), Method::Get);

    assert!(matches!(result, Err(WardenError::Header(_))));
}

#[test]
fn tenant_handle_lists_scoped_roles() {
    let (warden, _) = service();
    let handle = warden.tenant(tenant());
    let viewer = handle
        .with_partition(|p| {
            p.insert_role(Role::new("editor", tenant()));
            p.insert_role(Role::new("viewer", tenant()).with_access(RoleAccess::new("app:*:read")))
        })
        .unwrap();
    let grants = AccessGrantMap::new().grant(
        ResourceType::Role,
        Operation::Read,
        Selector::ids([viewer.as_uuid()]),
    );

    let roles = handle
        .roles(&CallerIdentity::new("test_user").with_grants(grants), &QueryParams::new())
        .unwrap();

    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role.name, "viewer");
    let json = serde_json::to_value(&roles[0]).unwrap();
    assert_eq!(json["name"], "viewer");
    assert_eq!(json["accessCount"], 1);
    assert_eq!(json["policyCount"], 0);
}

#[test]
fn scoping_errors_surface_through_the_handle() {
    let (warden, _) = service();
    let handle = warden.tenant(tenant());
    let params = QueryParams::new().with_scope("bad");

    let result = handle.policies(&CallerIdentity::new("test_user"), &params);

    assert!(matches!(
        result,
        Err(WardenError::Scoping(ScopingError::Validation { .. }))
    ));
}

#[test]
fn unknown_tenant_is_a_store_error() {
    let (warden, _) = service();

    let result = warden
        .tenant(TenantId::from_account("99999"))
        .groups(&CallerIdentity::new("test_user").admin(), &QueryParams::new());

    assert!(matches!(result, Err(WardenError::Store(_))));
}

#[tokio::test]
async fn reconcile_all_keeps_cross_account_principals() {
    let (warden, source) = service();
    warden.create_cross_principal("10001", "1111111").unwrap();
    warden
        .tenant(tenant())
        .with_partition(|p| {
            p.insert_principal(Principal::new("user1", tenant())).unwrap();
            p.insert_principal(Principal::new("user2", tenant())).unwrap();
        })
        .unwrap();
    source.activate(&tenant(), ["user2"]);

    let results = warden.reconcile_all().await;

    assert_eq!(results.len(), 1);
    let (reconciled, outcome) = &results[0];
    assert_eq!(reconciled, &tenant());
    assert!(matches!(outcome, ReconcileOutcome::Reconciled(report) if report.deleted == 1));

    let mut remaining: Vec<String> = warden
        .tenant(tenant())
        .with_partition(|p| p.principals().map(|pr| pr.username.clone()).collect())
        .unwrap();
    remaining.sort();
    assert_eq!(remaining, ["10001-1111111", "user2"]);
}

#[tokio::test]
async fn reconcile_with_no_principals_is_a_no_op() {
    let (warden, source) = service();

    assert_eq!(warden.reconcile(&tenant()).await, ReconcileOutcome::NoCandidates);
    assert_eq!(source.calls(), 0);
}

fn header_for(username: &str, is_org_admin: bool) -> String {
    Identity {
        account_number: Some("10001".to_string()),
        user: Some(UserInfo {
            username: username.to_string(),
            is_org_admin,
            ..UserInfo::default()
        }),
        ..Identity::default()
    }
    .encode()
    .unwrap()
}

#[test]
fn authenticate_derives_grants_from_memberships() {
    let (warden, _) = service();
    let handle = warden.tenant(tenant());
    handle
        .with_partition(|p| {
            let user = p.insert_principal(Principal::new("test_user", tenant())).unwrap();
            let role = p.insert_role(
                Role::new("group admin", tenant()).with_access(RoleAccess::new("rbac:group:write")),
            );
            let policy = p.insert_policy(Policy::new("policy1", tenant()));
            p.add_role_to_policy(policy, role).unwrap();
            let group = p.insert_group(Group::new("group1", tenant()));
            p.add_principal_to_group(group, user).unwrap();
            p.add_policy_to_group(group, policy).unwrap();
        })
        .unwrap();

    let (_, caller) = warden
        .authenticate(&header_for("test_user", false), Method::Post)
        .unwrap();

    assert!(!caller.is_admin);
    assert_eq!(caller.grants, handle.access_for_user("test_user").unwrap());
    assert_eq!(
        caller.grants.selector(ResourceType::Group, Operation::Write),
        Some(&Selector::All)
    );
    assert_eq!(
        caller.grants.selector(ResourceType::Role, Operation::Read),
        Some(&Selector::none())
    );
    let groups = handle.groups(&caller, &QueryParams::new()).unwrap();
    assert_eq!(groups.len(), 1);
}

#[test]
fn authenticate_skips_grant_derivation_for_admins() {
    let (warden, _) = service();

    let (_, caller) = warden
        .authenticate(&header_for("admin_user", true), Method::Get)
        .unwrap();

    assert!(caller.is_admin);
    assert!(caller.grants.is_empty());
}

#[test]
fn authenticate_requires_a_provisioned_tenant() {
    let (warden, _) = service();
    let header = Identity {
        account_number: Some("99999".to_string()),
        user: Some(UserInfo {
            username: "test_user".to_string(),
            ..UserInfo::default()
        }),
        ..Identity::default()
    }
    .encode()
    .unwrap();

    let result = warden.authenticate(&header, Method::Get);

    assert!(matches!(result, Err(WardenError::Store(_))));
}
