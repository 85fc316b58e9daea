//! Bounded least-recently-used cache.
//!
//! Entries are kept in an [`IndexMap`] ordered from least to most recently
//! used: a hit moves the entry to the back, and inserting past capacity evicts
//! the entry at the front. The cache is a plain single-owner structure with no
//! internal synchronization.

use indexmap::IndexMap;

/// Default capacity used by the storage engine.
pub const DEFAULT_CACHE_CAPACITY: usize = 200;

/// String-keyed LRU cache with a fixed capacity.
#[derive(Debug, Clone)]
pub struct LruCache<V> {
    entries: IndexMap<String, V>,
    capacity: usize,
}

impl<V: Clone> LruCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.entries.shift_remove(key)?;
        self.entries.insert(key.to_string(), value.clone());
        Some(value)
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Insert or replace `key`, evicting the least recently used entry when
    /// the capacity is exceeded.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);
        if self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    /// Whether `key` is cached. Does not affect recency.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V: Clone> Default for LruCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut cache = LruCache::new(3);
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get("a");
        cache.set("c", 3);

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
    }

    #[test]
    fn test_update_existing_key_promotes_without_growing() {
        let mut cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        cache.set("c", 3);

        assert_eq!(cache.peek("a"), Some(&10));
        assert!(!cache.has("b"));
    }

    #[test]
    fn test_has_does_not_promote() {
        let mut cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.has("a"));
        cache.set("c", 3);
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = LruCache::new(4);
        cache.set("a", 1);
        cache.set("b", 2);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let mut cache = LruCache::new(0);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.get("b"), Some(2));
        assert!(!cache.has("a"));
    }
}
