//! TTL cache of completed pipeline results.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

struct CacheEntry<V> {
    stored_at: Instant,
    value: V,
}

/// Results keyed by normalized URL.
///
/// Expiry is lazy: stale entries are ignored on read and replaced on the
/// next store, never swept.
pub struct ResultCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ResultCache<V> {
    /// A zero `ttl` disables caching entirely.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Live entry for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: String, value: V) {
        if !self.is_enabled() {
            return;
        }
        let entry = CacheEntry {
            stored_at: Instant::now(),
            value,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
