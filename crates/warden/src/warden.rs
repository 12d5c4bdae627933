//! Top-level service wiring configuration, storage and the identity source.

use std::sync::Arc;

use tracing::{debug, info};
use warden_config::WardenConfig;
use warden_principal::{
    IdentitySource, PrincipalReconciler, ReconcileOutcome, create_cross_principal_in,
};
use warden_rbac::{AccessGrantMap, CallerIdentity, Identity, Method};
use warden_store::Store;
use warden_types::{Principal, TenantId};

use crate::error::Result;
use crate::telemetry;
use crate::tenant::TenantHandle;

/// The Warden service.
///
/// Cheap to clone; clones share storage and reconciliation state.
#[derive(Clone)]
pub struct Warden {
    config: WardenConfig,
    store: Store,
    shared_partition: TenantId,
    reconciler: PrincipalReconciler,
}

impl Warden {
    /// Creates a service over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: WardenConfig, source: Arc<dyn IdentitySource>) -> Result<Self> {
        Self::with_store(config, Store::new(), source)
    }

    /// Creates a service over an existing store, provisioning the
    /// configured shared partition if needed.
    pub fn with_store(
        config: WardenConfig,
        store: Store,
        source: Arc<dyn IdentitySource>,
    ) -> Result<Self> {
        config.validate()?;
        let shared_partition = TenantId::new(config.reconciler.shared_partition.trim());
        store.provision(&shared_partition)?;

        let reconciler = PrincipalReconciler::new(store.clone(), source)
            .with_timeout(config.identity.timeout())
            .with_max_concurrency(config.reconciler.max_concurrency)
            .with_shared_partition(shared_partition.clone());

        info!(
            shared_partition = %shared_partition,
            timeout_ms = config.identity.timeout_ms,
            max_concurrency = config.reconciler.max_concurrency,
            "Warden initialized"
        );
        Ok(Self {
            config,
            store,
            shared_partition,
            reconciler,
        })
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn reconciler(&self) -> &PrincipalReconciler {
        &self.reconciler
    }

    /// Installs the global tracing subscriber with the configured
    /// `logging.filter` as the default directive.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        telemetry::init_tracing(&self.config.logging.filter)
    }

    /// Creates the partition for a tenant. Returns `false` if it existed.
    pub fn provision_tenant(&self, tenant: &TenantId) -> Result<bool> {
        let created = self.store.provision(tenant)?;
        if created {
            info!(tenant = %tenant, "Tenant provisioned");
        }
        Ok(created)
    }

    /// Returns a handle scoped to one tenant.
    pub fn tenant(&self, tenant: TenantId) -> TenantHandle {
        TenantHandle::new(self.store.clone(), tenant)
    }

    /// Resolves the tenant and caller of a request from its identity header.
    ///
    /// # Errors
    ///
    /// Returns a header error if the value cannot be decoded or lacks a user
    /// or account number.
    pub fn caller_from_header(
        &self,
        header: &str,
        grants: AccessGrantMap,
        method: Method,
    ) -> Result<(TenantId, CallerIdentity)> {
        let identity = Identity::decode(header)?;
        let tenant = identity.tenant()?;
        let caller = CallerIdentity::from_identity(&identity, grants, method)?;
        Ok((tenant, caller))
    }

    /// Resolves the caller of a request, deriving their grant map from the
    /// tenant's records.
    ///
    /// Org admins bypass grant evaluation and get an empty map.
    ///
    /// # Errors
    ///
    /// Returns a header error for an unusable header, or a store error if
    /// the tenant is not provisioned.
    pub fn authenticate(
        &self,
        header: &str,
        method: Method,
    ) -> Result<(TenantId, CallerIdentity)> {
        let identity = Identity::decode(header)?;
        let tenant = identity.tenant()?;
        let user = identity.user()?;
        let grants = if user.is_org_admin {
            AccessGrantMap::new()
        } else {
            self.tenant(tenant.clone()).access_for_user(&user.username)?
        };
        let caller = CallerIdentity::from_identity(&identity, grants, method)?;
        debug!(
            tenant = %tenant,
            username = %caller.username,
            admin = caller.is_admin,
            "Caller authenticated"
        );
        Ok((tenant, caller))
    }

    /// Reconciles one tenant's principals. Never fails.
    pub async fn reconcile(&self, tenant: &TenantId) -> ReconcileOutcome {
        self.reconciler.reconcile(tenant).await
    }

    /// Reconciles every provisioned tenant.
    pub async fn reconcile_all(&self) -> Vec<(TenantId, ReconcileOutcome)> {
        self.reconciler.reconcile_all().await
    }

    /// Gets or creates the principal for a cross-account request.
    pub fn create_cross_principal(&self, target_account: &str, user_id: &str) -> Result<Principal> {
        Ok(create_cross_principal_in(
            &self.store,
            &self.shared_partition,
            target_account,
            user_id,
        )?)
    }
}
