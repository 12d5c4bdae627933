//! Query parameters that narrow a scoped listing.

use serde::Deserialize;

use crate::error::{Result, ScopingError};

/// Query parameter selecting the evaluation scope.
pub const SCOPE_KEY: &str = "scope";

/// Query parameter narrowing results to one principal.
pub const USERNAME_KEY: &str = "username";

/// The only value accepted for [`SCOPE_KEY`].
pub const PRINCIPAL_SCOPE: &str = "principal";

/// How a query is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// No override: admin bypass and username narrowing apply.
    #[default]
    Account,
    /// Principal-level view: always evaluate the caller's own grants.
    Principal,
}

/// Parameters recognized by the scopers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the recognized parameters from `key=value` pairs.
    ///
    /// Unrecognized keys are ignored; a repeated key keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            match key.as_ref() {
                USERNAME_KEY => params.username = Some(value.into()),
                SCOPE_KEY => params.scope = Some(value.into()),
                _ => {}
            }
        }
        params
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Parses the scope parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ScopingError::Validation`] for any present value other than
    /// `principal`.
    pub fn scope(&self) -> Result<Scope> {
        match self.scope.as_deref() {
            None => Ok(Scope::Account),
            Some(PRINCIPAL_SCOPE) => Ok(Scope::Principal),
            Some(other) => Err(ScopingError::Validation {
                field: SCOPE_KEY,
                message: format!("unsupported value '{other}', expected '{PRINCIPAL_SCOPE}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_defaults_to_account() {
        assert_eq!(QueryParams::new().scope(), Ok(Scope::Account));
    }

    #[test]
    fn principal_scope_is_accepted() {
        let params = QueryParams::new().with_scope("principal");
        assert_eq!(params.scope(), Ok(Scope::Principal));
    }

    #[test]
    fn other_scope_values_are_rejected() {
        for value in ["bad", "", "PRINCIPAL", "account"] {
            let params = QueryParams::new().with_scope(value);
            assert!(
                matches!(params.scope(), Err(ScopingError::Validation { field: "scope", .. })),
                "scope={value:?} should be rejected"
            );
        }
    }

    #[test]
    fn pairs_pick_known_keys() {
        let params = QueryParams::from_pairs([
            ("username", "test_user"),
            ("limit", "10"),
            ("scope", "principal"),
        ]);
        assert_eq!(params.username.as_deref(), Some("test_user"));
        assert_eq!(params.scope.as_deref(), Some("principal"));
    }
}
