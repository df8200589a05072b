//! Cache-aside store — fixed-capacity LRU for expensive reads
//!
//! Callers check the cache first and populate it on miss. Entries are only
//! ever invalidated by capacity eviction; there is no TTL and writes to the
//! underlying store do not invalidate, so staleness is the caller's
//! responsibility (acceptable for the read-mostly listing path this backs).

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Thread-safe LRU cache with string keys and cloneable values.
///
/// One exclusive section per operation — no finer-grained locking is needed
/// at this scale.
#[derive(Debug)]
pub struct AsideCache<V> {
    inner: Mutex<LruCache<String, V>>,
}

impl<V: Clone> AsideCache<V> {
    /// Create a cache holding at most `capacity` entries. A capacity of zero
    /// is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up `key`, promoting the entry to most-recently-used on a hit.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    /// Insert or overwrite `key`, promoting it to most-recently-used. On
    /// overflow the least-recently-used entry is evicted.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.inner.lock().unwrap().put(key.into(), value);
    }

    /// Whether `key` is cached, without promoting it.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().contains(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache: AsideCache<i32> = AsideCache::new(4);
        assert!(cache.get("k").is_none());
        cache.put("k", 42);
        assert_eq!(cache.get("k"), Some(42));
    }

    #[test]
    fn test_overwrite() {
        let cache: AsideCache<i32> = AsideCache::new(4);
        cache.put("k", 1);
        cache.put("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_overflow_evicts_lru() {
        let cache: AsideCache<i32> = AsideCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);

        assert!(!cache.contains("a"));
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_promotes_to_mru() {
        let cache: AsideCache<i32> = AsideCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);

        // "a" becomes most-recently-used, so "b" is the eviction victim.
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    // End-to-end scenario: capacity 2; a,b,c → a evicted; get(b) then d → c
    // evicted, b and d remain.
    #[test]
    fn test_eviction_order_scenario() {
        let cache: AsideCache<&str> = AsideCache::new(2);
        cache.put("a", "A");
        cache.put("b", "B");
        cache.put("c", "C");
        assert!(!cache.contains("a"));

        assert_eq!(cache.get("b"), Some("B"));
        cache.put("d", "D");

        assert!(!cache.contains("c"));
        assert!(cache.contains("b"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache: AsideCache<i32> = AsideCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.len(), 1);
    }
}
