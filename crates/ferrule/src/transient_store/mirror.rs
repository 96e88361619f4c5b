use super::{StoreEngine, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Which backends a mirrored `get` consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MirrorReadPolicy {
    /// Value must be present in both; a mismatch is a miss and the stale
    /// copy is deleted
    #[default]
    Both,
    /// Read the primary only
    Primary,
    /// Read the secondary only
    Secondary,
}

/// Dual-writing engine over two backends.
///
/// With [`MirrorReadPolicy::Both`], a `get` that races a concurrent `set` on
/// the same key can observe the key in one backend only. It then reports a
/// miss and deletes the copy it saw, which may be the value just written.
/// The following `set` repairs this; callers needing read-your-write across
/// threads should use `Primary`.
pub struct MirrorEngine {
    primary: Arc<dyn StoreEngine>,
    secondary: Arc<dyn StoreEngine>,
    policy: MirrorReadPolicy,
}

impl MirrorEngine {
    /// Mirror `primary` and `secondary`.
    pub fn new(primary: Arc<dyn StoreEngine>, secondary: Arc<dyn StoreEngine>, policy: MirrorReadPolicy) -> Self {
        Self {
            primary,
            secondary,
            policy,
        }
    }

    /// Read policy in force
    pub fn policy(&self) -> MirrorReadPolicy {
        self.policy
    }
}

#[async_trait]
impl StoreEngine for MirrorEngine {
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), StoreError> {
        let (primary, secondary) = tokio::join!(
            self.primary.set(key, payload, ttl),
            self.secondary.set(key, payload, ttl)
        );
        primary.and(secondary)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.policy {
            MirrorReadPolicy::Primary => self.primary.get(key).await,
            MirrorReadPolicy::Secondary => self.secondary.get(key).await,
            MirrorReadPolicy::Both => {
                let (primary, secondary) = tokio::join!(self.primary.get(key), self.secondary.get(key));
                match (primary?, secondary?) {
                    (Some(value), Some(_)) => Ok(Some(value)),
                    (None, None) => Ok(None),
                    (Some(_), None) => {
                        warn!(key, "mirror divergence, removing stale primary copy");
                        self.primary.delete(key).await?;
                        Ok(None)
                    }
                    (None, Some(_)) => {
                        warn!(key, "mirror divergence, removing stale secondary copy");
                        self.secondary.delete(key).await?;
                        Ok(None)
                    }
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let (primary, secondary) = tokio::join!(self.primary.delete(key), self.secondary.delete(key));
        Ok(primary? | secondary?)
    }

    async fn close(&self) -> Result<(), StoreError> {
        let (primary, secondary) = tokio::join!(self.primary.close(), self.secondary.close());
        primary.and(secondary)
    }
}
