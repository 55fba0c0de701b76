//! Generic TTL cache, trimmed from the teacher's `core/caching.rs`
//! `Cache<K, V>` down to the single eviction policy this crate needs
//! (time-based freshness, not LRU/LFU/FIFO capacity eviction).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// A keyed store of values that expire after a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct Cache<K, V> {
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
}

impl<K, V> Default for Cache<K, V>
where
    K: std::hash::Hash + Eq,
{
    fn default() -> Self {
        Cache { entries: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl<K, V> Cache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value if present and still inside its freshness
    /// window, regardless of whether the window has lapsed.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| e.is_fresh()).map(|e| e.value.clone())
    }

    /// Returns the cached value even if stale, for degraded-mode fallback.
    pub async fn get_stale(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries.get(key).map(|e| e.value.clone())
    }

    pub async fn put(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry { value, created_at: Instant::now(), ttl });
    }

    pub async fn is_fresh(&self, key: &K) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).map(|e| e.is_fresh()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_entry_is_returned() {
        let cache: Cache<String, u32> = Cache::new();
        cache.put("skyrimse".to_string(), 7, Duration::from_secs(60)).await;
        assert_eq!(cache.get(&"skyrimse".to_string()).await, Some(7));
    }

    #[tokio::test]
    async fn expired_entry_is_not_fresh_but_still_readable_as_stale() {
        let cache: Cache<String, u32> = Cache::new();
        cache.put("skyrimse".to_string(), 7, Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&"skyrimse".to_string()).await, None);
        assert_eq!(cache.get_stale(&"skyrimse".to_string()).await, Some(7));
    }
}
