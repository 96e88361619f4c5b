//! Caller sessions
//!
//! A [`Session`] records who is calling and what they may do. Sessions are
//! persisted in the [`TransientStore`] under `session_<id>` and can be
//! augmented into a derived session, with a fresh id and widened or narrowed
//! permissions, for the length of one inter-resource call.

use crate::transient_store::{StoreError, TransientStore};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ferrule_protocol::{Action, PermissionDecision, Permissions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Store key prefix for sessions
pub const SESSION_KEY_PREFIX: &str = "session_";

/// Session persistence failures
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store refused the session
    #[error("could not persist session {id}: {source}")]
    Persist {
        /// Session id
        id: String,
        /// Underlying failure
        #[source]
        source: StoreError,
    },

    /// The session TTL does not fit a timestamp
    #[error("session lifetime out of range: {0:?}")]
    InvalidTtl(Duration),
}

/// An authenticated caller and its permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque 32-character hex token
    pub id: String,

    /// Calling client identifier
    pub caller_id: String,

    /// Calling client version
    pub caller_version: String,

    /// Who the caller is acting as (participant, outlet, roles...)
    #[serde(default)]
    pub identity: BTreeMap<String, Value>,

    /// Restrictions on which data the caller may see
    #[serde(default)]
    pub scoping: BTreeMap<String, Value>,

    /// Permission tree
    #[serde(default)]
    pub permissions: Permissions,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Expiry time
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// New session valid for `ttl`.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTtl`] when `ttl` overflows a timestamp.
    pub fn new(
        caller_id: impl Into<String>,
        caller_version: impl Into<String>,
        permissions: Permissions,
        ttl: Duration,
    ) -> Result<Self, SessionError> {
        let created_at = Utc::now();
        let expires_at = ChronoDuration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or(SessionError::InvalidTtl(ttl))?;
        Ok(Self {
            id: generate_id(),
            caller_id: caller_id.into(),
            caller_version: caller_version.into(),
            identity: BTreeMap::new(),
            scoping: BTreeMap::new(),
            permissions,
            created_at,
            expires_at,
        })
    }

    /// Add an identity attribute
    pub fn with_identity(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.identity.insert(name.into(), value.into());
        self
    }

    /// Add a scoping attribute
    pub fn with_scoping(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.scoping.insert(name.into(), value.into());
        self
    }

    /// Permission decision for `action` on `resource`.
    pub fn permitted(&self, resource: &str, action: Action) -> PermissionDecision {
        self.permissions.permitted(resource, action)
    }

    /// Whether the session has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Key under which the session is stored.
    pub fn store_key(&self) -> String {
        store_key(&self.id)
    }

    /// Persist the session until it expires.
    ///
    /// # Errors
    ///
    /// Store failures are hard: a session that was not saved cannot be used.
    pub async fn save_to_store(&self, store: &TransientStore) -> Result<(), SessionError> {
        store
            .set_json(&self.store_key(), self, Some(self.remaining_ttl()))
            .await
            .map_err(|source| SessionError::Persist {
                id: self.id.clone(),
                source,
            })
    }

    /// Load session `id`; missing, undecodable and expired sessions are `None`.
    pub async fn load_from_store(store: &TransientStore, id: &str) -> Option<Session> {
        let session: Session = store.get_json(&store_key(id)).await?;
        (!session.is_expired()).then_some(session)
    }

    /// Remove the session from the store; returns whether it was present.
    pub async fn delete_from_store(&self, store: &TransientStore) -> bool {
        store.delete(&self.store_key()).await
    }

    /// A copy with a fresh id whose permissions are this session's overlaid
    /// with `additional`. Attributes and expiry are kept.
    pub fn augment_with(&self, additional: &Permissions) -> Session {
        Session {
            id: generate_id(),
            permissions: self.permissions.merge(additional),
            ..self.clone()
        }
    }
}

fn store_key(id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{id}")
}

fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
