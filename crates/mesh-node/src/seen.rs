//! # Duplicate Suppression
//!
//! Bounded LRU of recently observed event ids, one per node. Re-receipt of
//! a cached id is discarded silently. The bound trades memory for a
//! window: ids older than the cache capacity may be re-accepted after
//! eviction.

use crate::MIN_SEEN_CAPACITY;
use lru::LruCache;
use mesh_types::EventId;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Bounded set of recently seen event ids.
pub struct SeenCache {
    cache: Mutex<LruCache<String, ()>>,
}

impl SeenCache {
    /// Create with the minimum required capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MIN_SEEN_CAPACITY)
    }

    /// Create with an explicit capacity (clamped to the minimum).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_SEEN_CAPACITY);
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Record an id; returns `true` when it is fresh, `false` on a
    /// duplicate.
    pub fn check_and_insert(&self, id: &EventId) -> bool {
        let mut cache = self.cache.lock();
        if cache.contains(id.as_str()) {
            return false;
        }
        cache.put(id.as_str().to_string(), ());
        true
    }

    /// Mark an id as seen without a freshness check (local-loop emits).
    pub fn insert(&self, id: &EventId) {
        self.cache.lock().put(id.as_str().to_string(), ());
    }

    /// Number of cached ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_then_duplicate() {
        let cache = SeenCache::new();
        let id = EventId::generate();

        assert!(cache.check_and_insert(&id));
        assert!(!cache.check_and_insert(&id));
    }

    #[test]
    fn test_insert_marks_seen() {
        let cache = SeenCache::new();
        let id = EventId::generate();

        cache.insert(&id);
        assert!(!cache.check_and_insert(&id));
    }

    #[test]
    fn test_capacity_floor() {
        let cache = SeenCache::with_capacity(1);
        // Clamped to the minimum: two distinct ids both stay cached.
        let a = EventId::generate();
        let b = EventId::generate();
        cache.insert(&a);
        cache.insert(&b);
        assert!(!cache.check_and_insert(&a));
        assert!(!cache.check_and_insert(&b));
    }

    #[test]
    fn test_eviction_after_capacity() {
        let cache = SeenCache::with_capacity(MIN_SEEN_CAPACITY);
        let first = EventId::generate();
        cache.insert(&first);

        for _ in 0..MIN_SEEN_CAPACITY {
            cache.insert(&EventId::generate());
        }

        // The oldest id fell out of the window and would be re-accepted.
        assert!(cache.check_and_insert(&first));
    }
}
