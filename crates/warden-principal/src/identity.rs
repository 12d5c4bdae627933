//! Contract to the external identity-of-record service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;
use warden_types::TenantId;

/// Status code of a successful identity service answer.
pub const STATUS_OK: u16 = 200;

/// Status code the gateway returns when the identity service is too slow.
pub const STATUS_GATEWAY_TIMEOUT: u16 = 504;

/// Errors from the identity service.
///
/// Every variant is treated as an ambiguous answer: reconciliation skips the
/// tenant instead of deleting anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity service returned status {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("identity service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("identity service unreachable: {0}")]
    Transport(String),

    #[error("invalid identity service response: {0}")]
    InvalidResponse(String),
}

/// The authoritative source of active usernames.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Returns which of `usernames` are still active for `tenant`.
    ///
    /// Usernames missing from the answer are no longer active.
    ///
    /// # Errors
    ///
    /// Any [`IdentityError`]; callers must not infer anything about the
    /// usernames from a failed lookup.
    async fn fetch_principals(
        &self,
        tenant: &TenantId,
        usernames: &[String],
    ) -> Result<BTreeSet<String>, IdentityError>;
}

// ============================================================================
// Wire envelope
// ============================================================================

/// One entry of [`IdentityResponse::data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub username: String,
}

/// Envelope returned by identity service transports:
/// `{"status_code": 200, "data": [{"username": "user1"}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<PrincipalRecord>>,
}

impl IdentityResponse {
    /// A successful answer listing `usernames` as active.
    pub fn ok<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status_code: STATUS_OK,
            data: Some(
                usernames
                    .into_iter()
                    .map(|username| PrincipalRecord {
                        username: username.into(),
                    })
                    .collect(),
            ),
        }
    }

    /// A failed answer with no data.
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            data: None,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, IdentityError> {
        serde_json::from_slice(bytes).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }

    /// Extracts the active usernames.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::Status`] for any status other than 200
    /// - [`IdentityError::InvalidResponse`] for a 200 without `data`
    pub fn into_usernames(self) -> Result<BTreeSet<String>, IdentityError> {
        if self.status_code != STATUS_OK {
            return Err(IdentityError::Status {
                code: self.status_code,
                detail: "unexpected status from identity service".to_string(),
            });
        }
        let data = self
            .data
            .ok_or_else(|| IdentityError::InvalidResponse("missing data".to_string()))?;
        Ok(data.into_iter().map(|record| record.username).collect())
    }
}

// ============================================================================
// In-memory source
// ============================================================================

#[derive(Debug, Clone)]
enum Canned {
    Response(IdentityResponse),
    Error(IdentityError),
}

/// Identity source backed by an in-memory directory.
///
/// Answers with the requested usernames that are active for the tenant. A
/// canned response or error can replace the directory lookup, and an
/// artificial delay can be set to exercise timeouts.
#[derive(Debug, Default)]
pub struct StaticIdentitySource {
    directory: Mutex<BTreeMap<TenantId, BTreeSet<String>>>,
    canned: Mutex<Option<Canned>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticIdentitySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every answer by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Marks `usernames` as active for `tenant`.
    pub fn activate<I, S>(&self, tenant: &TenantId, usernames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut directory = self.directory.lock().unwrap_or_else(PoisonError::into_inner);
        directory
            .entry(tenant.clone())
            .or_default()
            .extend(usernames.into_iter().map(Into::into));
    }

    pub fn deactivate(&self, tenant: &TenantId, username: &str) {
        let mut directory = self.directory.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = directory.get_mut(tenant) {
            active.remove(username);
        }
    }

    /// Answers every lookup with `response` until [`Self::reset`].
    pub fn respond_with(&self, response: IdentityResponse) {
        *self.canned.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Canned::Response(response));
    }

    /// Fails every lookup with `error` until [`Self::reset`].
    pub fn fail_with(&self, error: IdentityError) {
        *self.canned.lock().unwrap_or_else(PoisonError::into_inner) = Some(Canned::Error(error));
    }

    /// Goes back to answering from the directory.
    pub fn reset(&self) {
        *self.canned.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentitySource for StaticIdentitySource {
    async fn fetch_principals(
        &self,
        tenant: &TenantId,
        usernames: &[String],
    ) -> Result<BTreeSet<String>, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        trace!(tenant = %tenant, requested = usernames.len(), "Identity lookup");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let canned = self
            .canned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match canned {
            Some(Canned::Error(error)) => Err(error),
            Some(Canned::Response(response)) => response.into_usernames(),
            None => {
                let directory = self.directory.lock().unwrap_or_else(PoisonError::into_inner);
                let active = directory.get(tenant);
                Ok(usernames
                    .iter()
                    .filter(|username| active.is_some_and(|set| set.contains(*username)))
                    .cloned()
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_envelope() {
        let response =
            IdentityResponse::from_json(br#"{"status_code": 200, "data": [{"username": "user1"}]}"#)
                .unwrap();
        let usernames = response.into_usernames().unwrap();
        assert_eq!(usernames, BTreeSet::from(["user1".to_string()]));
    }

    #[test]
    fn non_ok_status_is_an_error() {
        let response = IdentityResponse::from_json(br#"{"status_code": 504}"#).unwrap();
        assert_eq!(
            response.into_usernames(),
            Err(IdentityError::Status {
                code: STATUS_GATEWAY_TIMEOUT,
                detail: "unexpected status from identity service".to_string(),
            })
        );
    }

    #[test]
    fn ok_without_data_is_invalid() {
        let response = IdentityResponse::status(STATUS_OK);
        assert!(matches!(
            response.into_usernames(),
            Err(IdentityError::InvalidResponse(_))
        ));
        assert!(matches!(
            IdentityResponse::from_json(b"[]"),
            Err(IdentityError::InvalidResponse(_))
        ));
    }

    #[test]
    fn empty_data_means_nobody_is_active() {
        let response = IdentityResponse::ok(Vec::<String>::new());
        assert!(response.into_usernames().unwrap().is_empty());
    }

    #[tokio::test]
    async fn static_source_answers_requested_active_usernames() {
        let tenant = TenantId::from_account("10001");
        let source = StaticIdentitySource::new();
        source.activate(&tenant, ["user1", "user3"]);

        let requested = vec!["user1".to_string(), "user2".to_string()];
        let active = source.fetch_principals(&tenant, &requested).await.unwrap();

        assert_eq!(active, BTreeSet::from(["user1".to_string()]));
        assert_eq!(source.calls(), 1);

        source.deactivate(&tenant, "user1");
        let active = source.fetch_principals(&tenant, &requested).await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn canned_answers_override_the_directory() {
        let tenant = TenantId::from_account("10001");
        let source = StaticIdentitySource::new();
        source.activate(&tenant, ["user1"]);
        let requested = vec!["user1".to_string()];

        source.respond_with(IdentityResponse::status(STATUS_GATEWAY_TIMEOUT));
        assert!(matches!(
            source.fetch_principals(&tenant, &requested).await,
            Err(IdentityError::Status { code: 504, .. })
        ));

        source.fail_with(IdentityError::Transport("connection refused".to_string()));
        assert!(matches!(
            source.fetch_principals(&tenant, &requested).await,
            Err(IdentityError::Transport(_))
        ));

        source.reset();
        assert_eq!(
            source.fetch_principals(&tenant, &requested).await.unwrap().len(),
            1
        );
    }
}
