use std::sync::{Arc, Mutex, MutexGuard};

use balloon_crypto::{hasher_for, Digest, Hasher};
use balloon_store::{Mutation, Store};
use balloon_trees::cache::SimpleCache;
use balloon_trees::history::HistoryTree;
use balloon_trees::hyper::{HyperPosition, HyperTree, PassThroughCache, Witness};

use crate::config::{BalloonConfig, CacheStrategy};
use crate::error::BalloonError;
use crate::metadata::Metadata;
use crate::proof::{ConsistencyProof, MembershipProof};
use crate::Commitment;

/// Drives both trees from a single stream of events.
///
/// `Add`/`AddBulk` are globally serialised, since history requires
/// monotonic versions; queries are not — they only ever read through each
/// tree's own shared cache lock.
pub struct Balloon {
    hasher: Arc<dyn Hasher>,
    history: HistoryTree,
    hyper: HyperTree,
    store: Arc<dyn Store>,
    next_version: Mutex<u64>,
}

impl Balloon {
    /// Opens a balloon over `store`, recovering the version counter and
    /// hasher identity from the metadata table (initializing both if the
    /// store is fresh), then rebuilding the hyper tree's in-memory cache
    /// from whatever tiles are already persisted.
    #[tracing::instrument(skip(store), err)]
    pub fn open(store: Arc<dyn Store>, config: BalloonConfig) -> Result<Self, BalloonError> {
        let metadata = Metadata::load_or_init(store.as_ref(), config.hash_algorithm)?;
        let hasher = hasher_for(metadata.hash_algorithm);

        let history = HistoryTree::new(hasher.clone(), store.clone());
        let cache: Arc<dyn balloon_trees::cache::Cache<HyperPosition>> = match config.cache_strategy {
            CacheStrategy::InMemory => Arc::new(SimpleCache::new()),
            CacheStrategy::PassThrough => Arc::new(PassThroughCache::new(store.clone())),
        };
        let hyper = HyperTree::with_cache(hasher.clone(), store.clone(), config.cache_height_limit, cache)?;
        hyper.rebuild_cache()?;

        tracing::debug!(version = metadata.version, algorithm = %metadata.hash_algorithm, "balloon opened");

        Ok(Balloon {
            hasher,
            history,
            hyper,
            store,
            next_version: Mutex::new(metadata.version),
        })
    }

    pub fn hasher(&self) -> &Arc<dyn Hasher> {
        &self.hasher
    }

    pub fn current_version(&self) -> u64 {
        *self.next_version.lock().expect("next_version mutex poisoned")
    }

    /// Hashes `event`, assigns it the next version, and inserts it into
    /// both trees. The two sub-insertions' mutations, plus the updated
    /// metadata record, are applied to the store as one atomic batch before
    /// this call returns; if either sub-insertion fails no mutations are
    /// persisted at all.
    #[tracing::instrument(skip(self, event), err)]
    pub fn add(&self, event: &[u8]) -> Result<Commitment, BalloonError> {
        let guard = self.next_version.lock().expect("next_version mutex poisoned");
        let version = *guard;

        let digest = self.hasher.hash(&[event]);
        let (history_digest, history_mutations) = self.history.add(version, &digest)?;
        let (hyper_digest, hyper_mutations) = self.hyper.insert(digest.as_bytes(), version)?;
        let mut mutations = history_mutations;
        mutations.extend(hyper_mutations);

        let commitment = Commitment {
            version,
            history_digest,
            hyper_digest,
        };
        self.commit(guard, version + 1, mutations)?;
        tracing::debug!(version, "event added");
        Ok(commitment)
    }

    /// Inserts every event in `events`, assigning consecutive versions
    /// starting at the balloon's current counter, and commits all of them
    /// (every version, both trees) as a single store mutation. Observationally
    /// equivalent to sequential `add` calls.
    #[tracing::instrument(skip(self, events), err)]
    pub fn add_bulk(&self, events: &[Vec<u8>]) -> Result<Vec<Commitment>, BalloonError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let guard = self.next_version.lock().expect("next_version mutex poisoned");
        let mut version = *guard;
        let mut commitments = Vec::with_capacity(events.len());
        let mut mutations = Vec::new();

        for event in events {
            let digest = self.hasher.hash(&[event.as_slice()]);
            let (history_digest, mut history_mutations) = self.history.add(version, &digest)?;
            let (hyper_digest, mut hyper_mutations) = self.hyper.insert(digest.as_bytes(), version)?;
            mutations.append(&mut history_mutations);
            mutations.append(&mut hyper_mutations);
            commitments.push(Commitment {
                version,
                history_digest,
                hyper_digest,
            });
            version += 1;
        }

        self.commit(guard, version, mutations)?;
        tracing::debug!(count = events.len(), "bulk events added");
        Ok(commitments)
    }

    fn commit(
        &self,
        mut guard: MutexGuard<'_, u64>,
        new_version: u64,
        mut mutations: Vec<Mutation>,
    ) -> Result<(), BalloonError> {
        let metadata = Metadata {
            version: new_version,
            hash_algorithm: self.hasher.algorithm(),
        };
        mutations.push(metadata.mutation()?);
        self.store.mutate(mutations)?;
        *guard = new_version;
        Ok(())
    }

    /// Consults the hyper tree for `key`'s actual version (if any), then
    /// proves the history tree's state at `query_version` either contains
    /// (exists) or cannot contain (absent) a leaf with that digest at
    /// `actual_version`.
    #[tracing::instrument(skip(self, key), err)]
    pub fn query_membership(&self, key: &[u8], query_version: u64) -> Result<MembershipProof, BalloonError> {
        let key_digest = Digest::from_bytes(key.to_vec());
        let current_version = self.current_version();
        if current_version == 0 || query_version > current_version - 1 {
            return Err(BalloonError::BadArgument(format!(
                "query_version {query_version} has not been committed yet (current version count {current_version})"
            )));
        }

        let hyper_proof = self.hyper.query_membership(key)?;
        let (found, actual_version) = match &hyper_proof.witness {
            Witness::Match { version, .. } => (true, *version),
            _ => (false, 0),
        };
        let exists = found && actual_version <= query_version;

        let history_proof = if exists {
            Some(self.history.prove_membership(actual_version, query_version)?)
        } else {
            None
        };

        Ok(MembershipProof {
            exists,
            key_digest,
            current_version,
            query_version,
            actual_version,
            hyper_proof,
            history_proof,
        })
    }

    /// Delegates to the history tree; the hyper tree has no role in
    /// consistency between two versions.
    #[tracing::instrument(skip(self), err)]
    pub fn query_consistency(&self, start: u64, end: u64) -> Result<ConsistencyProof, BalloonError> {
        let history_proof = self.history.prove_consistency(start, end)?;
        Ok(ConsistencyProof { history_proof })
    }
}
