//! Time-bounded in-memory cache
//!
//! Owned by whoever creates it and passed by reference to the services that
//! use it, so each session (and each test) gets its own.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Key/value store whose entries expire after a fixed lifetime
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached value, if present and not expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Store a value; expired entries are dropped on the way
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &K) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("kano", 3).await;
        assert_eq!(cache.get(&"kano").await, Some(3));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get(&"kano").await, None);
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_drops_expired_entries() {
        let cache = TtlCache::new(Duration::from_secs(10));
        for query in ["am", "ami", "amin"] {
            cache.insert(query.to_string(), 1).await;
        }
        assert_eq!(cache.len().await, 3);

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert("amina".to_string(), 1).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"amina".to_string()).await, Some(1));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1u32, "a".to_string()).await;
        cache.insert(2u32, "b".to_string()).await;

        assert!(cache.invalidate(&1).await);
        assert!(!cache.invalidate(&1).await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
