//! Transient key/value storage
//!
//! Sessions and other short-lived data live in a [`TransientStore`], a thin
//! front-end over a pluggable [`StoreEngine`]. Engines are created by name
//! through a [`StoreRegistry`]. Built in are `memory`, an LRU-bounded TTL
//! cache; `memcached`, a memcached text-protocol client; and `mirror`, which
//! dual-writes to two other engines.
//!
//! Failure policy: `get` and `delete` treat engine failures as a miss, `set`
//! propagates them.

mod engine;
mod memcached;
mod memory;
mod mirror;
mod registry;

pub use engine::{StoreEngine, StoreError};
pub use memcached::{DEFAULT_MEMCACHED_ADDRESS, MemcachedEngine};
pub use memory::MemoryEngine;
pub use mirror::{MirrorEngine, MirrorReadPolicy};
pub use registry::{EngineFactory, EngineOptions, RegistryError, StoreRegistry};

#[cfg(test)]
pub(crate) use engine::MockStoreEngine;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Namespaced front-end over a storage engine.
#[derive(Clone)]
pub struct TransientStore {
    engine: Arc<dyn StoreEngine>,
    namespace: String,
    default_ttl: Duration,
}

impl TransientStore {
    /// Wrap `engine`, prefixing every key with `namespace`.
    pub fn new(engine: Arc<dyn StoreEngine>, namespace: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            engine,
            namespace: namespace.into(),
            default_ttl,
        }
    }

    /// The key prefix
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Store `payload` under `key` for `ttl` (or the default TTL).
    ///
    /// # Errors
    ///
    /// Engine failures are returned; an unpersisted value is a hard failure.
    pub async fn set(&self, key: &str, payload: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.engine
            .set(&self.namespaced(key), payload, ttl.unwrap_or(self.default_ttl))
            .await
    }

    /// Fetch `key`; engine failures count as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.engine.get(&self.namespaced(key)).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "transient store get failed, treating as miss");
                None
            }
        }
    }

    /// Delete `key`; returns whether something was deleted. Engine failures
    /// count as nothing deleted.
    pub async fn delete(&self, key: &str) -> bool {
        match self.engine.delete(&self.namespaced(key)).await {
            Ok(deleted) => deleted,
            Err(err) => {
                warn!(key, error = %err, "transient store delete failed");
                false
            }
        }
    }

    /// Serialize `value` as JSON and store it.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value)?;
        self.set(key, &payload, ttl).await
    }

    /// Fetch and deserialize a JSON value; undecodable values count as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.get(key).await?;
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "undecodable transient store value, treating as miss");
                None
            }
        }
    }

    /// Close the engine.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.engine.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn keys_are_namespaced() {
        let mut engine = MockStoreEngine::new();
        engine
            .expect_set()
            .withf(|key, payload, ttl| {
                key == "ns_session_1" && payload == "{}" && *ttl == Duration::from_secs(60)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let store = TransientStore::new(Arc::new(engine), "ns_", Duration::from_secs(60));
        store.set("session_1", "{}", None).await.unwrap();
    }

    #[tokio::test]
    async fn get_and_delete_failures_are_soft() {
        let mut engine = MockStoreEngine::new();
        engine
            .expect_get()
            .with(eq("ns_k"))
            .returning(|_| Err(StoreError::Transport("connection refused".into())));
        engine
            .expect_delete()
            .returning(|_| Err(StoreError::Transport("connection refused".into())));

        let store = TransientStore::new(Arc::new(engine), "ns_", Duration::from_secs(60));
        assert_eq!(store.get("k").await, None);
        assert!(!store.delete("k").await);
    }

    #[tokio::test]
    async fn set_failures_are_hard() {
        let mut engine = MockStoreEngine::new();
        engine
            .expect_set()
            .returning(|_, _, _| Err(StoreError::Transport("connection refused".into())));

        let store = TransientStore::new(Arc::new(engine), "ns_", Duration::from_secs(60));
        assert!(matches!(
            store.set("k", "v", None).await,
            Err(StoreError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn json_round_trip_through_memory_engine() {
        let store = TransientStore::new(Arc::new(MemoryEngine::new(16)), "ns_", Duration::from_secs(60));
        store
            .set_json("k", &serde_json::json!({"a": 1}), None)
            .await
            .unwrap();
        let value: serde_json::Value = store.get_json("k").await.unwrap();
        assert_eq!(value["a"], 1);

        store.set("bad", "{not json", None).await.unwrap();
        assert_eq!(store.get_json::<serde_json::Value>("bad").await, None);
    }
}
