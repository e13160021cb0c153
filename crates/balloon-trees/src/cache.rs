//! The generic cache trait consulted during tree traversal above a tree's
//! cache height limit. [`crate::hyper::PassThroughCache`] is the other
//! implementation, specific to the hyper tree's store-backed variant.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use balloon_crypto::Digest;

/// A read/fill cache over node digests, keyed by tree position.
pub trait Cache<K>: Send + Sync {
    fn get(&self, key: &K) -> Option<Digest>;
    fn put(&self, key: K, value: Digest);
}

/// An unbounded in-memory cache, good for the common case where the whole
/// working set above a tree's cache height limit fits comfortably in RAM.
#[derive(Debug, Default)]
pub struct SimpleCache<K: Eq + Hash> {
    entries: RwLock<HashMap<K, Digest>>,
}

impl<K: Eq + Hash> SimpleCache<K> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone + Send + Sync> Cache<K> for SimpleCache<K> {
    fn get(&self, key: &K) -> Option<Digest> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: K, value: Digest) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_cache_round_trips() {
        let cache: SimpleCache<u32> = SimpleCache::new();
        cache.put(7, Digest::from(vec![7]));
        assert_eq!(cache.get(&7), Some(Digest::from(vec![7])));
        assert_eq!(cache.get(&8), None);
    }

    #[test]
    fn simple_cache_misses_an_unwritten_key() {
        let cache: SimpleCache<u32> = SimpleCache::new();
        assert_eq!(cache.get(&1), None);
    }
}
