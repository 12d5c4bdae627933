//! # warden-rbac: Grant evaluation and query scoping
//!
//! Decides which groups, roles and policies of a tenant a caller may list:
//! - **Access grant evaluation** (per resource type and operation)
//! - **Query scoping** for the Group, Role and Policy listing paths
//! - **Caller identity** decoding from the gateway header
//! - **Derived grants** from a principal's `Group → Policy → Role` permissions
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Request (identity header, verb, query)      │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  CallerIdentity + QueryParams                │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  QueryScoper (over a tenant Catalog)         │
//! │  ├─ scope validation                         │
//! │  ├─ admin bypass / username narrowing        │
//! │  └─ grant map evaluation (allowed)           │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Visible records, ordered by name            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Grant evaluation
//!
//! | Selector        | Result                                   |
//! |-----------------|------------------------------------------|
//! | missing         | `Access::None`                           |
//! | `[]`            | `Access::None`                           |
//! | `["*"]`         | `Access::All`                            |
//! | `[id, ...]`     | `Access::Subset` (or `None` if disjoint) |
//!
//! `GET`, `HEAD` and `OPTIONS` evaluate the `read` operation, every other
//! verb evaluates `write`.
//!
//! ## Example
//!
//! ```
//! use warden_rbac::{AccessGrantMap, CallerIdentity, Operation, QueryParams, QueryScoper, ResourceType, Selector};
//! use warden_store::Store;
//! use warden_types::{Role, TenantId};
//!
//! let store = Store::new();
//! let tenant = TenantId::from_account("10001");
//! store.provision(&tenant).unwrap();
//!
//! let role_id = store
//!     .with_partition(&tenant, |p| p.insert_role(Role::new("viewer", tenant.clone())))
//!     .unwrap();
//!
//! let grants = AccessGrantMap::new().grant(
//!     ResourceType::Role,
//!     Operation::Read,
//!     Selector::ids([role_id.as_uuid()]),
//! );
//! let caller = CallerIdentity::new("test_user").with_grants(grants);
//! let params = QueryParams::new();
//!
//! let names = store
//!     .with_partition(&tenant, |p| {
//!         let roles = QueryScoper::new(&*p, &caller, &params).roles()?;
//!         Ok::<_, warden_rbac::ScopingError>(
//!             roles.iter().map(|view| view.role.name.clone()).collect::<Vec<_>>(),
//!         )
//!     })
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(names, ["viewer"]);
//! ```

pub mod caller;
pub mod grants;
pub mod identity;
pub mod permissions;
pub mod query;
pub mod scoping;

mod error;

// Re-export commonly used types
pub use caller::{CallerIdentity, Method};
pub use error::{HeaderError, Result, ScopingError};
pub use grants::{Access, AccessGrantMap, Operation, RawGrantMap, ResourceType, Selector, allowed};
pub use identity::{IDENTITY_HEADER, Identity};
pub use permissions::access_for_user;
pub use query::{QueryParams, Scope};
pub use scoping::{QueryScoper, RoleView};
