use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

/// TTL cache for upstream market-data responses.
pub struct ResponseCache {
    cache: DashMap<String, CachedResponse>,
}

struct CachedResponse {
    body: Value,
    timestamp: Instant,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    pub fn insert(&self, key: String, body: Value, ttl: Duration) {
        self.cache.insert(key, CachedResponse {
            body,
            timestamp: Instant::now(),
            ttl,
        });
    }

    /// Get response if not expired (evict on read)
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.cache.get(key)?;
        if entry.timestamp.elapsed() > entry.ttl {
            drop(entry); // Drop the read lock
            self.cache.remove(key);
            None
        } else {
            Some(entry.body.clone())
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
