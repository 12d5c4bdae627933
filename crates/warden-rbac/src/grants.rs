//! Access grant maps and their evaluation.
//!
//! A caller's grant map answers, per resource type and operation, which
//! records the caller may touch. Selectors are a tagged union rather than a
//! raw nested mapping so that evaluation is exhaustive:
//!
//! | Selector          | Evaluates to                 |
//! |-------------------|------------------------------|
//! | missing           | [`Access::None`]             |
//! | [`Selector::All`] | [`Access::All`]              |
//! | `Ids(∅)`          | [`Access::None`]             |
//! | `Ids(S)`          | `Subset(S ∩ candidates)`     |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Selector entry granting every record of a resource type.
pub const WILDCARD: &str = "*";

/// Resource types that carry grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Group,
    Role,
    Policy,
    Principal,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Group => "group",
            ResourceType::Role => "role",
            ResourceType::Policy => "policy",
            ResourceType::Principal => "principal",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(ResourceType::Group),
            "role" => Ok(ResourceType::Role),
            "policy" => Ok(ResourceType::Policy),
            "principal" => Ok(ResourceType::Principal),
            _ => Err(()),
        }
    }
}

/// Operation a request performs on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which records of a resource type a grant covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every record, present and future.
    All,
    /// Exactly these records. An empty set grants nothing.
    Ids(BTreeSet<Uuid>),
}

impl Selector {
    /// Builds a selector from raw grant entries.
    ///
    /// Any [`WILDCARD`] entry wins. Entries that are not UUIDs are dropped
    /// since they can never match a record.
    pub fn from_raw<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.as_ref();
            if entry == WILDCARD {
                return Selector::All;
            }
            match Uuid::parse_str(entry) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => debug!(entry = %entry, "Ignoring non-UUID grant entry"),
            }
        }
        Selector::Ids(ids)
    }

    pub fn ids<I: IntoIterator<Item = Uuid>>(ids: I) -> Self {
        Selector::Ids(ids.into_iter().collect())
    }

    pub fn none() -> Self {
        Selector::Ids(BTreeSet::new())
    }
}

/// Read and write selectors for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGrants {
    pub read: Option<Selector>,
    pub write: Option<Selector>,
}

impl ResourceGrants {
    pub fn selector(&self, operation: Operation) -> Option<&Selector> {
        match operation {
            Operation::Read => self.read.as_ref(),
            Operation::Write => self.write.as_ref(),
        }
    }
}

/// Raw wire form: `{"role": {"read": ["*"], "write": ["<uuid>"]}}`.
pub type RawGrantMap = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Per-caller grants, keyed by resource type and operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawGrantMap")]
pub struct AccessGrantMap {
    resources: BTreeMap<ResourceType, ResourceGrants>,
}

impl AccessGrantMap {
    /// A map granting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the selector for `resource`/`operation`.
    pub fn grant(
        mut self,
        resource: ResourceType,
        operation: Operation,
        selector: Selector,
    ) -> Self {
        let grants = self.resources.entry(resource).or_default();
        match operation {
            Operation::Read => grants.read = Some(selector),
            Operation::Write => grants.write = Some(selector),
        }
        self
    }

    pub fn selector(&self, resource: ResourceType, operation: Operation) -> Option<&Selector> {
        self.resources
            .get(&resource)
            .and_then(|grants| grants.selector(operation))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl From<RawGrantMap> for AccessGrantMap {
    fn from(raw: RawGrantMap) -> Self {
        let mut map = AccessGrantMap::new();
        for (resource, operations) in raw {
            let Ok(resource_type) = resource.parse::<ResourceType>() else {
                debug!(resource = %resource, "Ignoring grants for unknown resource type");
                continue;
            };
            for (operation, entries) in operations {
                let operation = match operation.as_str() {
                    "read" => Operation::Read,
                    "write" => Operation::Write,
                    other => {
                        debug!(
                            resource = %resource,
                            operation = %other,
                            "Ignoring unknown grant operation"
                        );
                        continue;
                    }
                };
                map = map.grant(resource_type, operation, Selector::from_raw(entries));
            }
        }
        map
    }
}

/// Result of evaluating a grant against a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No identifier filtering.
    All,
    /// Nothing is accessible.
    None,
    /// Only these identifiers are accessible (never empty).
    Subset(BTreeSet<Uuid>),
}

impl Access {
    pub fn permits(&self, id: Uuid) -> bool {
        match self {
            Access::All => true,
            Access::None => false,
            Access::Subset(ids) => ids.contains(&id),
        }
    }

    /// Accessible identifiers among `candidates`.
    pub fn resolve<I: IntoIterator<Item = Uuid>>(&self, candidates: I) -> BTreeSet<Uuid> {
        candidates.into_iter().filter(|id| self.permits(*id)).collect()
    }

    /// Keeps the items whose id is accessible.
    pub fn filter<T, F>(&self, items: Vec<T>, id: F) -> Vec<T>
    where
        F: Fn(&T) -> Uuid,
    {
        match self {
            Access::All => items,
            Access::None => Vec::new(),
            Access::Subset(ids) => items
                .into_iter()
                .filter(|item| ids.contains(&id(item)))
                .collect(),
        }
    }
}

/// Evaluates `grants` for `resource`/`operation` against `candidates`.
///
/// Total for every grant map: a missing entry or an empty selector denies,
/// the wildcard allows everything, and an explicit set is intersected with
/// the candidates.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use warden_rbac::grants::{Access, AccessGrantMap, Operation, ResourceType, Selector, allowed};
///
/// let id = Uuid::new_v4();
/// let grants =
///     AccessGrantMap::new().grant(ResourceType::Role, Operation::Read, Selector::ids([id]));
///
/// let access = allowed(&grants, ResourceType::Role, Operation::Read, [id, Uuid::new_v4()]);
/// assert_eq!(access, Access::Subset([id].into()));
///
/// let access = allowed(&grants, ResourceType::Role, Operation::Write, [id]);
/// assert_eq!(access, Access::None);
/// ```
pub fn allowed<I>(
    grants: &AccessGrantMap,
    resource: ResourceType,
    operation: Operation,
    candidates: I,
) -> Access
where
    I: IntoIterator<Item = Uuid>,
{
    match grants.selector(resource, operation) {
        None => Access::None,
        Some(Selector::All) => Access::All,
        Some(Selector::Ids(ids)) => {
            let subset: BTreeSet<Uuid> = candidates
                .into_iter()
                .filter(|candidate| ids.contains(candidate))
                .collect();
            if subset.is_empty() {
                Access::None
            } else {
                Access::Subset(subset)
            }
        }
    }
}
