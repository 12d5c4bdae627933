//! # warden-principal: Principal lifecycle for `Warden`
//!
//! Keeps each tenant's cached principals in line with the identity service:
//!
//! - [`IdentitySource`]: async contract to the identity-of-record service
//! - [`PrincipalReconciler`]: removes principals the service no longer
//!   returns, skipping the tenant on any ambiguous answer
//! - [`create_cross_principal`]: principals imported through cross-account
//!   requests, which reconciliation never removes
//!
//! ```text
//!   FETCH_LOCAL ──(no candidates)──────────────▶ NoCandidates
//!        │
//!        ▼
//!   QUERY_UPSTREAM ──(error or timeout)────────▶ Skipped
//!        │
//!        ▼
//!   DELETE_STALE (tenant, then shared) ────────▶ Reconciled
//! ```

pub mod cross_account;
pub mod identity;
pub mod reconciler;

pub use cross_account::{create_cross_principal, create_cross_principal_in, cross_principal_name};
pub use identity::{
    IdentityError, IdentityResponse, IdentitySource, PrincipalRecord, StaticIdentitySource,
};
pub use reconciler::{PrincipalReconciler, ReconcileOutcome, ReconcileReport, SkipReason};
