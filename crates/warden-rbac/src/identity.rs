//! Decoding of the base64 JSON identity header set by the gateway.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use warden_types::TenantId;

use crate::error::HeaderError;

/// Name of the header carrying the encoded identity.
pub const IDENTITY_HEADER: &str = "x-rh-identity";

#[derive(Debug, Deserialize, Serialize)]
struct Envelope {
    identity: Identity,
}

/// Identity asserted by the gateway for a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Identity {
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub internal: Option<InternalInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_org_admin: bool,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct InternalInfo {
    #[serde(default)]
    pub cross_access: bool,
}

impl Identity {
    /// Decodes a header value.
    pub fn decode(header: &str) -> Result<Self, HeaderError> {
        let bytes = STANDARD.decode(header.trim())?;
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        Ok(envelope.identity)
    }

    /// Encodes the identity as a header value.
    pub fn encode(&self) -> Result<String, HeaderError> {
        let json = serde_json::to_vec(&Envelope {
            identity: self.clone(),
        })?;
        Ok(STANDARD.encode(json))
    }

    pub fn user(&self) -> Result<&UserInfo, HeaderError> {
        self.user.as_ref().ok_or(HeaderError::MissingUser)
    }

    /// The tenant owning the identity's account.
    pub fn tenant(&self) -> Result<TenantId, HeaderError> {
        self.account_number
            .as_deref()
            .filter(|account| !account.is_empty())
            .map(TenantId::from_account)
            .ok_or(HeaderError::MissingAccount)
    }

    /// Whether the request arrives through a cross-account delegation.
    pub fn is_cross_access(&self) -> bool {
        self.internal.as_ref().is_some_and(|i| i.cross_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(json: &str) -> String {
        STANDARD.encode(json)
    }

    #[test]
    fn decodes_user_identity() {
        let header = encoded(
            r#"{"identity": {"account_number": "10001", "type": "User",
                "user": {"username": "test_user", "email": "t@example.com",
                         "is_org_admin": true, "user_id": "1111111"}}}"#,
        );

        let identity = Identity::decode(&header).unwrap();

        assert_eq!(identity.tenant().unwrap(), TenantId::from_account("10001"));
        let user = identity.user().unwrap();
        assert_eq!(user.username, "test_user");
        assert!(user.is_org_admin);
        assert!(!user.is_internal);
        assert!(!identity.is_cross_access());
    }

    #[test]
    fn decodes_cross_access_flag() {
        let header = encoded(
            r#"{"identity": {"account_number": "10001", "type": "Associate",
                "user": {"username": "assoc", "is_internal": true},
                "internal": {"cross_access": true}}}"#,
        );
        let identity = Identity::decode(&header).unwrap();
        assert!(identity.is_cross_access());
        assert_eq!(identity.kind.as_deref(), Some("Associate"));
    }

    #[test]
    fn missing_user_and_account_are_reported() {
        let identity = Identity::decode(&encoded(r#"{"identity": {}}"#)).unwrap();
        assert!(matches!(identity.user(), Err(HeaderError::MissingUser)));
        assert!(matches!(identity.tenant(), Err(HeaderError::MissingAccount)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Identity::decode("%%%"), Err(HeaderError::Base64(_))));
        assert!(matches!(
            Identity::decode(&encoded("not json")),
            Err(HeaderError::Json(_))
        ));
    }

    #[test]
    fn encode_roundtrips() {
        let identity = Identity {
            account_number: Some("42".to_string()),
            user: Some(UserInfo {
                username: "u".to_string(),
                ..UserInfo::default()
            }),
            ..Identity::default()
        };
        let decoded = Identity::decode(&identity.encode().unwrap()).unwrap();
        assert_eq!(decoded, identity);
    }
}
