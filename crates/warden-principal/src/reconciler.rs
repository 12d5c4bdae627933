//! Deletes cached principals the identity service no longer knows.
//!
//! One run per tenant walks `FETCH_LOCAL → QUERY_UPSTREAM → DELETE_STALE`.
//! Any upstream failure, including a local timeout, ends the run in `SKIP`
//! with nothing deleted. Cross-account principals are never candidates.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use warden_store::{Catalog, Store, StoreError};
use warden_types::{Principal, TenantId};

use crate::identity::{IdentityError, IdentitySource};

/// Default bound on one identity service lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of tenants reconciled at once by [`PrincipalReconciler::reconcile_all`].
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Why a run deleted nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("identity lookup failed: {0}")]
    Upstream(#[from] IdentityError),

    #[error("storage failed: {0}")]
    Storage(#[from] StoreError),
}

/// Counts from a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Distinct candidate usernames sent upstream.
    pub checked: usize,
    /// Usernames the identity service did not return.
    pub stale: BTreeSet<String>,
    /// Rows removed from the tenant partition.
    pub deleted: usize,
    /// Rows removed from the shared partition.
    pub deleted_shared: usize,
}

/// Result of reconciling one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The tenant had no candidate principals; upstream was not called.
    NoCandidates,
    /// The run stopped early. An upstream failure deletes nothing; a storage
    /// failure in the shared partition can follow deletions in the tenant
    /// partition, which are logged with their count.
    Skipped(SkipReason),
    Reconciled(ReconcileReport),
}

impl ReconcileOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ReconcileOutcome::Skipped(_))
    }

    /// Total rows removed by the run.
    pub fn deleted(&self) -> usize {
        match self {
            ReconcileOutcome::Reconciled(report) => report.deleted + report.deleted_shared,
            ReconcileOutcome::NoCandidates | ReconcileOutcome::Skipped(_) => 0,
        }
    }
}

/// Per-tenant async locks serializing runs of the same tenant.
#[derive(Debug, Default)]
struct TenantLocks {
    locks: Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TenantLocks {
    fn lock_for(&self, tenant: &TenantId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(tenant.clone()).or_default())
    }
}

/// Reconciles cached principals with the identity service.
///
/// Cheap to clone; clones share the store, the source and the tenant locks.
#[derive(Clone)]
pub struct PrincipalReconciler {
    store: Store,
    source: Arc<dyn IdentitySource>,
    timeout: Duration,
    max_concurrency: usize,
    shared_partition: TenantId,
    locks: Arc<TenantLocks>,
}

impl PrincipalReconciler {
    pub fn new(store: Store, source: Arc<dyn IdentitySource>) -> Self {
        Self {
            store,
            source,
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            shared_partition: TenantId::public(),
            locks: Arc::new(TenantLocks::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Caps parallel tenants in [`Self::reconcile_all`]; zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_shared_partition(mut self, shared_partition: TenantId) -> Self {
        self.shared_partition = shared_partition;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reconciles one tenant. Never fails; the outcome is also logged.
    pub async fn reconcile(&self, tenant: &TenantId) -> ReconcileOutcome {
        let lock = self.locks.lock_for(tenant);
        let _serialized = lock.lock().await;

        let outcome = match self.run(tenant).await {
            Ok(outcome) => outcome,
            Err(reason) => ReconcileOutcome::Skipped(reason),
        };

        match &outcome {
            ReconcileOutcome::NoCandidates => {
                info!(tenant = %tenant, "No principals to reconcile");
            }
            ReconcileOutcome::Skipped(SkipReason::Upstream(err)) => {
                warn!(tenant = %tenant, error = %err, "Reconciliation skipped, nothing deleted");
            }
            ReconcileOutcome::Skipped(SkipReason::Storage(err)) => {
                error!(tenant = %tenant, error = %err, "Reconciliation aborted on storage error");
            }
            ReconcileOutcome::Reconciled(report) => {
                info!(
                    tenant = %tenant,
                    checked = report.checked,
                    stale = report.stale.len(),
                    deleted = report.deleted,
                    deleted_shared = report.deleted_shared,
                    "Principals reconciled"
                );
            }
        }
        outcome
    }

    /// Reconciles every provisioned tenant except the shared partition, at
    /// most `max_concurrency` at a time. Results are ordered by tenant.
    pub async fn reconcile_all(&self) -> Vec<(TenantId, ReconcileOutcome)> {
        let tenants: Vec<TenantId> = match self.store.tenants() {
            Ok(tenants) => tenants
                .into_iter()
                .filter(|tenant| *tenant != self.shared_partition)
                .collect(),
            Err(err) => {
                error!(error = %err, "Could not list tenants for reconciliation");
                return Vec::new();
            }
        };
        info!(
            tenants = tenants.len(),
            max_concurrency = self.max_concurrency,
            "Reconciling all tenants"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<(TenantId, ReconcileOutcome)> = JoinSet::new();
        for tenant in tenants {
            let reconciler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring only waits.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = reconciler.reconcile(&tenant).await;
                (tenant, outcome)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => error!(error = %err, "Reconciliation task failed"),
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    async fn run(&self, tenant: &TenantId) -> Result<ReconcileOutcome, SkipReason> {
        // FETCH_LOCAL
        let candidates = self.fetch_local(tenant)?;
        if candidates.is_empty() {
            return Ok(ReconcileOutcome::NoCandidates);
        }
        let usernames: Vec<String> = candidates.into_iter().collect();
        debug!(tenant = %tenant, candidates = ?usernames, "Querying identity service");

        // QUERY_UPSTREAM
        let lookup = self.source.fetch_principals(tenant, &usernames);
        let authoritative = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(answer) => answer?,
            Err(_) => return Err(IdentityError::Timeout(self.timeout).into()),
        };

        // DELETE_STALE
        let stale: BTreeSet<String> = usernames
            .iter()
            .filter(|username| !authoritative.contains(*username))
            .cloned()
            .collect();
        let mut report = ReconcileReport {
            checked: usernames.len(),
            ..ReconcileReport::default()
        };
        if !stale.is_empty() {
            let is_stale = |p: &Principal| !p.cross_account && stale.contains(&p.username);
            report.deleted = self
                .store
                .with_partition(tenant, |p| p.delete_principals_where(is_stale).len())?;
            if self.uses_shared_partition(tenant) {
                let shared = self.store.with_partition(&self.shared_partition, |p| {
                    p.delete_principals_where(|row| row.tenant == *tenant && is_stale(row))
                        .len()
                });
                report.deleted_shared = shared.map_err(|err| {
                    error!(
                        tenant = %tenant,
                        shared_partition = %self.shared_partition,
                        deleted = report.deleted,
                        error = %err,
                        "Shared partition cleanup failed after tenant rows were deleted"
                    );
                    err
                })?;
            }
        }
        report.stale = stale;
        Ok(ReconcileOutcome::Reconciled(report))
    }

    /// Usernames of the tenant's own principals, from its partition and
    /// from the shared partition.
    fn fetch_local(&self, tenant: &TenantId) -> Result<BTreeSet<String>, StoreError> {
        let mut candidates: BTreeSet<String> = self.store.with_partition(tenant, |p| {
            p.principals()
                .filter(|principal| !principal.cross_account)
                .map(|principal| principal.username.clone())
                .collect()
        })?;

        if self.uses_shared_partition(tenant) {
            let shared: Vec<String> = self.store.with_partition(&self.shared_partition, |p| {
                p.principals()
                    .filter(|principal| !principal.cross_account && principal.tenant == *tenant)
                    .map(|principal| principal.username.clone())
                    .collect()
            })?;
            candidates.extend(shared);
        }
        Ok(candidates)
    }

    fn uses_shared_partition(&self, tenant: &TenantId) -> bool {
        *tenant != self.shared_partition && self.store.has_partition(&self.shared_partition)
    }
}
