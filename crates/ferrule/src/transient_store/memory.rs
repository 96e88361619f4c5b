use super::{StoreEngine, StoreError};
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// In-process LRU cache with per-entry expiry.
///
/// Once `capacity` entries are held, the least recently used entry is
/// evicted. Expired entries are removed lazily when read.
pub struct MemoryEngine {
    entries: Mutex<LruCache<String, Entry>>,
}

struct Entry {
    payload: String,
    expires_at: Instant,
}

impl MemoryEngine {
    /// Engine holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StoreEngine for MemoryEngine {
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            payload: payload.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().put(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Ok(Some(entry.payload.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().pop(key).is_some())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.entries.lock().clear();
        Ok(())
    }
}
