//! # warden-store: Tenant-partitioned storage for `Warden`
//!
//! Every tenant owns an isolated [`Partition`]. All reads and writes go
//! through [`Store::with_partition`], which switches the active storage
//! context to one tenant for the duration of a closure and restores the
//! previous context on every exit path, including unwinding.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Store                                        │
//! │  ├─ public      (shared rows, any tenant)     │
//! │  ├─ acct10001   (rows owned by acct10001)     │
//! │  └─ acct10002   (rows owned by acct10002)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use warden_store::{Catalog, Store};
//! use warden_types::{Principal, TenantId};
//!
//! let store = Store::new();
//! let tenant = TenantId::from_account("10001");
//! store.provision(&tenant).unwrap();
//!
//! store
//!     .with_partition(&tenant, |p| p.insert_principal(Principal::new("user1", tenant.clone())))
//!     .unwrap()
//!     .unwrap();
//!
//! let count = store.with_partition(&tenant, |p| p.principals().count()).unwrap();
//! assert_eq!(count, 1);
//! ```
//!
//! A partition context is confined to the calling thread and the closure is
//! synchronous, so it can never be held across an `.await` or shared between
//! concurrent tasks. Entering a second partition while one is active fails
//! with [`StoreError::PartitionAlreadyActive`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::trace;
use warden_types::TenantId;

mod catalog;
mod error;
mod partition;

pub use catalog::Catalog;
pub use error::{Result, StoreError};
pub use partition::Partition;

thread_local! {
    static ACTIVE_PARTITION: RefCell<Option<TenantId>> = const { RefCell::new(None) };
}

/// Marks a partition as active on the current thread until dropped.
struct ActivePartition {
    previous: Option<TenantId>,
}

impl ActivePartition {
    fn enter(tenant: &TenantId) -> Result<Self> {
        ACTIVE_PARTITION.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(current) = active.as_ref() {
                return Err(StoreError::PartitionAlreadyActive {
                    active: current.clone(),
                    requested: tenant.clone(),
                });
            }
            let previous = active.replace(tenant.clone());
            Ok(Self { previous })
        })
    }
}

impl Drop for ActivePartition {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_PARTITION.with(|active| *active.borrow_mut() = previous);
    }
}

/// Returns the partition active on the current thread, if any.
pub fn active_partition() -> Option<TenantId> {
    ACTIVE_PARTITION.with(|active| active.borrow().clone())
}

/// In-memory, tenant-partitioned storage engine.
///
/// `Store` is cheap to clone; clones share the same partitions.
#[derive(Debug, Clone)]
pub struct Store {
    partitions: Arc<RwLock<HashMap<TenantId, Arc<Mutex<Partition>>>>>,
}

impl Store {
    /// Creates a store holding only the shared `public` partition.
    pub fn new() -> Self {
        let public = TenantId::public();
        let mut partitions = HashMap::new();
        partitions.insert(
            public.clone(),
            Arc::new(Mutex::new(Partition::new(public))),
        );
        Self {
            partitions: Arc::new(RwLock::new(partitions)),
        }
    }

    /// Creates an empty partition for `tenant`.
    ///
    /// Returns `false` if the partition already existed.
    pub fn provision(&self, tenant: &TenantId) -> Result<bool> {
        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| StoreError::Poisoned(tenant.clone()))?;
        if partitions.contains_key(tenant) {
            return Ok(false);
        }
        partitions.insert(
            tenant.clone(),
            Arc::new(Mutex::new(Partition::new(tenant.clone()))),
        );
        Ok(true)
    }

    pub fn has_partition(&self, tenant: &TenantId) -> bool {
        self.partitions
            .read()
            .is_ok_and(|partitions| partitions.contains_key(tenant))
    }

    /// Lists provisioned tenants, excluding the shared partition, in name order.
    pub fn tenants(&self) -> Result<Vec<TenantId>> {
        let partitions = self
            .partitions
            .read()
            .map_err(|_| StoreError::Poisoned(TenantId::public()))?;
        let mut tenants: Vec<TenantId> = partitions
            .keys()
            .filter(|tenant| !tenant.is_public())
            .cloned()
            .collect();
        tenants.sort();
        Ok(tenants)
    }

    /// Runs `f` with the storage context switched to `tenant`'s partition.
    ///
    /// The partition is locked exclusively for the duration of `f`. The
    /// thread's previous context is restored when `f` returns or unwinds.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PartitionAlreadyActive`] if this thread already holds a partition
    /// - [`StoreError::PartitionNotFound`] if `tenant` is not provisioned
    /// - [`StoreError::Poisoned`] if a previous writer panicked
    pub fn with_partition<R, F>(&self, tenant: &TenantId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Partition) -> R,
    {
        let _active = ActivePartition::enter(tenant)?;

        let partition = {
            let partitions = self
                .partitions
                .read()
                .map_err(|_| StoreError::Poisoned(tenant.clone()))?;
            partitions
                .get(tenant)
                .cloned()
                .ok_or_else(|| StoreError::PartitionNotFound(tenant.clone()))?
        };

        let mut guard = partition
            .lock()
            .map_err(|_| StoreError::Poisoned(tenant.clone()))?;
        trace!(partition = %tenant, "Entered partition");
        Ok(f(&mut *guard))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
