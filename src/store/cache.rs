use std::time::{Duration, Instant};

use dashmap::DashMap;

/// String-keyed cache with per-entry TTL.
pub trait CacheStore<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Duration);
    fn delete(&self, key: &str);
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

pub struct MemoryCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }

        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CacheStore, MemoryCache};

    #[test]
    fn returns_value_within_ttl() {
        let cache = MemoryCache::new();
        cache.set("hub:1", 42_u32, Duration::from_secs(60));
        assert_eq!(cache.get("hub:1"), Some(42));
        assert_eq!(cache.get("hub:2"), None);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = MemoryCache::new();
        cache.set("hub:1", 42_u32, Duration::ZERO);
        assert_eq!(cache.get("hub:1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn delete_removes_entry() {
        let cache = MemoryCache::new();
        cache.set("hub:1", "zones".to_string(), Duration::from_secs(60));
        cache.delete("hub:1");
        assert_eq!(cache.get("hub:1"), None);
    }
}
