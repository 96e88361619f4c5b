//! Resource identity and the five actions every resource exposes.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Version assumed when a caller does not name one.
pub const DEFAULT_VERSION: u32 = 1;

/// Query/filter parameters passed alongside an action.
pub type Query = BTreeMap<String, String>;

/// A named, versioned resource, e.g. `Purchase` v1.
///
/// Equality is exact: name and version must both match. No default-version
/// coercion happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Canonical resource name
    pub resource: String,

    /// Resource version, 1 or greater
    pub version: u32,
}

impl ResourceKey {
    /// Create a key, trimming surrounding whitespace from the name.
    pub fn new(resource: impl AsRef<str>, version: u32) -> Self {
        Self {
            resource: resource.as_ref().trim().to_string(),
            version,
        }
    }

    /// Create a key after checking the name is non-empty and the version
    /// positive.
    pub fn parse(resource: impl AsRef<str>, version: u32) -> Result<Self> {
        let key = Self::new(resource, version);
        if key.resource.is_empty() {
            return Err(ProtocolError::EmptyResource);
        }
        if key.version == 0 {
            return Err(ProtocolError::InvalidVersion {
                resource: key.resource,
                version,
            });
        }
        Ok(key)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.resource, self.version)
    }
}

/// One of the five uniform resource actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Fetch a collection
    List,
    /// Fetch one item by identifier
    Show,
    /// Create an item from a body
    Create,
    /// Update an item by identifier from a body
    Update,
    /// Delete an item by identifier
    Delete,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 5] = [
        Action::List,
        Action::Show,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    /// Lowercase action name.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Show => "show",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// HTTP method conventionally used for this action.
    pub fn http_method(self) -> &'static str {
        match self {
            Action::List | Action::Show => "GET",
            Action::Create => "POST",
            Action::Update => "PATCH",
            Action::Delete => "DELETE",
        }
    }

    /// Whether the action addresses a single item by identifier.
    pub fn requires_ident(self) -> bool {
        matches!(self, Action::Show | Action::Update | Action::Delete)
    }

    /// Whether the action sends a request body.
    pub fn carries_body(self) -> bool {
        matches!(self, Action::Create | Action::Update)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_string()))
    }
}
