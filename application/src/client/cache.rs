//! TTL cache of successful read responses.
//!
//! Entries expire lazily: an expired entry is removed by the `get` that finds
//! it. Only the owning [`ResilientClient`](super::resilient::ResilientClient)
//! writes to the cache.

use parley_domain::RequestKey;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Keyed response cache with a fixed TTL
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<RequestKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &RequestKey) -> Option<Value> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;

        // Lazy deletion
        if entry.stored_at.elapsed() >= self.ttl {
            entries.remove(key);
            debug!("Cache entry {} expired", key);
            return None;
        }

        debug!("Cache hit for {}", key);
        Some(entry.value.clone())
    }

    pub fn set(&self, key: RequestKey, value: Value) {
        self.lock().insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove every entry whose key starts with `prefix`, or everything when
    /// `prefix` is `None`. Returns the number of entries removed.
    pub fn invalidate(&self, prefix: Option<&str>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        match prefix {
            Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Invalidated {} cache entries (prefix: {:?})", removed, prefix);
        }
        removed
    }

    /// Number of stored entries, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
