//! The identity of the caller a query is scoped for.

use std::convert::Infallible;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::HeaderError;
use crate::grants::{AccessGrantMap, Operation};
use crate::identity::Identity;

/// HTTP method of the incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
    /// Any other verb; treated as mutating.
    Other(String),
}

impl Method {
    /// Returns whether the method only fetches or lists.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Options)
    }

    /// The grant operation a request with this method needs.
    pub fn operation(&self) -> Operation {
        if self.is_read_only() {
            Operation::Read
        } else {
            Operation::Write
        }
    }
}

impl FromStr for Method {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        })
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Head => f.write_str("HEAD"),
            Method::Options => f.write_str("OPTIONS"),
            Method::Post => f.write_str("POST"),
            Method::Put => f.write_str("PUT"),
            Method::Patch => f.write_str("PATCH"),
            Method::Delete => f.write_str("DELETE"),
            Method::Other(verb) => f.write_str(verb),
        }
    }
}

/// Who is asking, passed explicitly into every scoper call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub username: String,
    pub is_admin: bool,
    pub grants: AccessGrantMap,
    pub method: Method,
}

impl CallerIdentity {
    /// A non-admin `GET` caller with no grants.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_admin: false,
            grants: AccessGrantMap::new(),
            method: Method::Get,
        }
    }

    /// Builds the caller from a decoded identity header.
    ///
    /// Org admins become admin callers. The grant map is supplied by the
    /// authentication layer, it is not part of the header.
    pub fn from_identity(
        identity: &Identity,
        grants: AccessGrantMap,
        method: Method,
    ) -> Result<Self, HeaderError> {
        let user = identity.user()?;
        Ok(Self {
            username: user.username.clone(),
            is_admin: user.is_org_admin,
            grants,
            method,
        })
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn with_grants(mut self, grants: AccessGrantMap) -> Self {
        self.grants = grants;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn operation(&self) -> Operation {
        self.method.operation()
    }
}
