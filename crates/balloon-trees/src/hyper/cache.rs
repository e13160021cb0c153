//! The pass-through hyper cache: a read-through adapter over the store's
//! `HyperCache` table, for deployments that would rather re-read a digest
//! from the store on every access than keep the whole above-cache-line
//! working set resident in RAM.

use std::sync::Arc;

use balloon_crypto::Digest;
use balloon_store::{Store, TableId};

use crate::cache::Cache;

use super::position::HyperPosition;

/// Reads hyper position digests straight from `TableId::HyperCache` on
/// every `get` and never buffers anything in memory. `put` is a no-op: the
/// store is already the source of truth, written by the tree's own
/// mutation batch, not by this cache.
#[derive(Debug)]
pub struct PassThroughCache {
    store: Arc<dyn Store>,
}

impl PassThroughCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        PassThroughCache { store }
    }
}

impl Cache<HyperPosition> for PassThroughCache {
    fn get(&self, key: &HyperPosition) -> Option<Digest> {
        self.store
            .get(TableId::HyperCache, &key.encode())
            .ok()
            .flatten()
            .map(Digest::from_bytes)
    }

    fn put(&self, _key: HyperPosition, _value: Digest) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use balloon_store::{MemoryStore, Mutation};

    #[test]
    fn reads_whatever_is_currently_in_the_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = PassThroughCache::new(store.clone());
        let pos = HyperPosition::root(8, 1);

        assert_eq!(cache.get(&pos), None);

        store
            .mutate(vec![Mutation::put(TableId::HyperCache, pos.encode(), vec![0x2a])])
            .unwrap();
        assert_eq!(cache.get(&pos), Some(Digest::from(vec![0x2a])));
    }

    #[test]
    fn put_does_not_persist_anything() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = PassThroughCache::new(store.clone());
        let pos = HyperPosition::root(8, 1);

        cache.put(pos.clone(), Digest::from(vec![0x01]));
        assert_eq!(cache.get(&pos), None);
    }
}
