use async_trait::async_trait;
use ferrule_core::error_boundary;
use ferrule_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Failures an engine may report.
///
/// Engines raise only these; anything else is a bug in the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or answered badly
    #[error("store transport error: {0}")]
    Transport(String),

    /// A value could not be encoded for storage
    #[error("store encoding error: {0}")]
    Encoding(String),
}

error_boundary!(serde_json::Error => StoreError, |e| {
    StoreError::Encoding(e.to_string())
});

error_boundary!(std::io::Error => StoreError, |e| {
    StoreError::Transport(e.to_string())
});

error_boundary!(TransportError => StoreError, |e| {
    StoreError::Transport(e.to_string())
});

/// A storage engine: TTL key/value operations over some backend.
///
/// Keys arrive already namespaced.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreEngine: Send + Sync {
    /// Store `payload` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch the payload under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete `key`, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Release connections.
    async fn close(&self) -> Result<(), StoreError>;
}
