use std::collections::HashMap;
use std::sync::Arc;

use balloon_crypto::{Digest, Hasher};
use balloon_store::{Mutation, Store, TableId};

use crate::cache::{Cache, SimpleCache};
use crate::error::TreeError;

use super::batch::{Tile, TileSlot, TILE_HEIGHT};
use super::default_hashes::DefaultHashes;
use super::position::{Direction, HyperPosition};
use super::proof::{QueryProof, Witness};

/// The hyper tree: a sparse Merkle tree over event digests, indexed by the
/// full hash of the event itself rather than by insertion order. Depth
/// equals the hasher's bit width, so most of it is implicitly empty —
/// unpopulated subtrees are never stored, only represented by
/// [`DefaultHashes`].
///
/// Traversal splits at `cache_height_limit`. Above it ("through-cache"),
/// every node is a plain combine of its two children or, once a subtree
/// holds nothing, a default hash, and a node's digest is cached (via
/// `cache`) rather than recomputed on every query — a shortcut never
/// forms up here. At and below it ("after-cache"), the tree is persisted
/// as packed [`Tile`]s: a subtree with exactly one key under it collapses
/// into a single shortcut leaf rather than a chain of single-child nodes,
/// and two colliding shortcuts are pushed further down on insert.
///
/// A shortcut leaf's value is the version the matching event was inserted
/// at, not the event digest itself — the key already *is* the event digest.
pub struct HyperTree {
    hasher: Arc<dyn Hasher>,
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache<HyperPosition>>,
    defaults: DefaultHashes,
    num_bits: u32,
    /// Heights above this are through-cache (plain InnerHash/GetDefault,
    /// cached, no shortcuts); heights at or below it are tiled. Must be a
    /// multiple of [`TILE_HEIGHT`].
    cache_height_limit: u32,
}

impl HyperTree {
    pub fn new(hasher: Arc<dyn Hasher>, store: Arc<dyn Store>, cache_height_limit: u32) -> Result<Self, TreeError> {
        Self::with_cache(hasher, store, cache_height_limit, Arc::new(SimpleCache::new()))
    }

    /// Builds a hyper tree over a caller-supplied above-cache-line cache,
    /// e.g. [`super::PassThroughCache`] instead of the default in-memory
    /// [`SimpleCache`].
    pub fn with_cache(
        hasher: Arc<dyn Hasher>,
        store: Arc<dyn Store>,
        cache_height_limit: u32,
        cache: Arc<dyn Cache<HyperPosition>>,
    ) -> Result<Self, TreeError> {
        let num_bits = hasher.bits();
        if cache_height_limit > num_bits {
            return Err(TreeError::BadArgument(format!(
                "cache_height_limit {cache_height_limit} exceeds hasher width {num_bits}"
            )));
        }
        if cache_height_limit % TILE_HEIGHT != 0 {
            return Err(TreeError::BadArgument(format!(
                "cache_height_limit {cache_height_limit} is not a multiple of tile height {TILE_HEIGHT}"
            )));
        }
        let defaults = DefaultHashes::build(hasher.as_ref(), num_bits);
        Ok(HyperTree {
            hasher,
            store,
            cache,
            defaults,
            num_bits,
            cache_height_limit,
        })
    }

    fn root_position(&self) -> HyperPosition {
        HyperPosition::root(self.num_bits, self.hasher.bytes())
    }

    fn shortcut_digest(&self, pos: &HyperPosition, key: &[u8], value: u64) -> Digest {
        self.hasher.salted(&pos.encode(), &[key, &value.to_be_bytes()])
    }

    fn inner_hash(&self, pos: &HyperPosition, left: &Digest, right: &Digest) -> Digest {
        self.hasher.salted(&pos.encode(), &[left.as_bytes(), right.as_bytes()])
    }

    /// The span (in levels) of the tile rooted at `tile_root_height`: the
    /// full tile height everywhere, except the bottommost tile when the
    /// cache height limit itself is smaller than a tile.
    fn tile_span(&self, tile_root_height: u32) -> u32 {
        TILE_HEIGHT.min(tile_root_height)
    }

    fn load_tile(&self, tile_root: &HyperPosition) -> Result<Tile, TreeError> {
        let span = self.tile_span(tile_root.height);
        match self.store.get(TableId::Hyper, &tile_root.encode())? {
            Some(bytes) => Tile::decode(&bytes, span, self.hasher.bytes()),
            None => Ok(Tile::empty(span)),
        }
    }

    fn tile_mutation(&self, tile_root: &HyperPosition, tile: &Tile) -> Mutation {
        Mutation::put(TableId::Hyper, tile_root.encode(), tile.encode())
    }

    /// A position above `cache_height_limit` is empty iff nothing has ever
    /// cached a digest for it: every insert walks the full ancestor chain
    /// of the key it plants and caches each ancestor it touches, so an
    /// uncached position has no key beneath it.
    fn is_empty_above(&self, pos: &HyperPosition) -> bool {
        self.cache.get(pos).is_none()
    }

    fn remember(&self, pos: &HyperPosition, digest: &Digest, mutations: &mut Vec<Mutation>) {
        self.cache.put(pos.clone(), digest.clone());
        mutations.push(Mutation::put(TableId::HyperCache, pos.encode(), digest.as_bytes().to_vec()));
    }

    /// The digest a tile slot contributes, given the global position it
    /// represents. Valid whether or not that slot is itself a tile
    /// boundary: a boundary slot's `Digest` is simply the child tile's own
    /// root digest, already folded in by whichever insert last wrote it.
    fn tile_slot_digest(&self, tile: &Tile, idx: usize, pos: &HyperPosition) -> Digest {
        match tile.get(idx) {
            TileSlot::Empty => self.defaults.get(pos.height).clone(),
            TileSlot::Digest(d) => d.clone(),
            TileSlot::Shortcut { key, value } => self.shortcut_digest(pos, key, *value),
        }
    }

    /// Current root digest.
    pub fn root(&self) -> Result<Digest, TreeError> {
        self.digest_at(&self.root_position())
    }

    fn digest_at(&self, pos: &HyperPosition) -> Result<Digest, TreeError> {
        if pos.height > self.cache_height_limit {
            if let Some(d) = self.cache.get(pos) {
                return Ok(d);
            }
            if self.is_empty_above(pos) {
                return Ok(self.defaults.get(pos.height).clone());
            }
            let (l, r) = pos.children();
            let ld = self.digest_at(&l)?;
            let rd = self.digest_at(&r)?;
            return Ok(self.inner_hash(pos, &ld, &rd));
        }
        let tile = self.load_tile(pos)?;
        Ok(self.tile_slot_digest(&tile, 0, pos))
    }

    /// Inserts (or updates) `key -> version`, returning the new root digest
    /// and the mutations to persist.
    pub fn insert(&self, key: &[u8], version: u64) -> Result<(Digest, Vec<Mutation>), TreeError> {
        if key.len() != self.hasher.bytes() {
            return Err(TreeError::BadArgument(format!(
                "key is {} bytes, expected {}",
                key.len(),
                self.hasher.bytes()
            )));
        }
        let mut mutations = Vec::new();
        let digest = self.insert_at(self.root_position(), key, version, &mut mutations)?;
        Ok((digest, mutations))
    }

    fn insert_at(&self, pos: HyperPosition, key: &[u8], version: u64, mutations: &mut Vec<Mutation>) -> Result<Digest, TreeError> {
        if pos.height > self.cache_height_limit {
            let empty = self.is_empty_above(&pos);
            let (l, r) = pos.children();
            let digest = match pos.branch_for(key) {
                Direction::Left => {
                    let ld = self.insert_at(l, key, version, mutations)?;
                    let rd = if empty { self.defaults.get(r.height).clone() } else { self.digest_at(&r)? };
                    self.inner_hash(&pos, &ld, &rd)
                }
                Direction::Right => {
                    let rd = self.insert_at(r, key, version, mutations)?;
                    let ld = if empty { self.defaults.get(l.height).clone() } else { self.digest_at(&l)? };
                    self.inner_hash(&pos, &ld, &rd)
                }
            };
            self.remember(&pos, &digest, mutations);
            return Ok(digest);
        }

        let mut tile = self.load_tile(&pos)?;
        let digest = self.insert_into_tile(&mut tile, 0, &pos, key, version, mutations)?;
        mutations.push(self.tile_mutation(&pos, &tile));
        self.remember(&pos, &digest, mutations);
        Ok(digest)
    }

    /// Inserts `(key, version)` into `tile` at local slot `idx`, `pos`
    /// being the global position that slot represents. Recurses across
    /// tile boundaries (loading or freshly creating the child tile as
    /// needed) and performs shortcut push-down on collision.
    fn insert_into_tile(
        &self,
        tile: &mut Tile,
        idx: usize,
        pos: &HyperPosition,
        key: &[u8],
        version: u64,
        mutations: &mut Vec<Mutation>,
    ) -> Result<Digest, TreeError> {
        if !pos.is_leaf() && tile.is_tile_leaf(idx) {
            let child_span = self.tile_span(pos.height);
            let mut child_tile = match tile.get(idx).clone() {
                TileSlot::Empty => Tile::empty(child_span),
                TileSlot::Digest(_) => self.load_tile(pos)?,
                TileSlot::Shortcut {
                    key: existing_key,
                    value: existing_version,
                } => {
                    let mut fresh = Tile::empty(child_span);
                    self.insert_into_tile(&mut fresh, 0, pos, &existing_key, existing_version, mutations)?;
                    fresh
                }
            };
            let digest = self.insert_into_tile(&mut child_tile, 0, pos, key, version, mutations)?;
            mutations.push(self.tile_mutation(pos, &child_tile));
            tile.set(idx, TileSlot::Digest(digest.clone()));
            return Ok(digest);
        }

        match tile.get(idx).clone() {
            TileSlot::Empty => {
                let digest = self.shortcut_digest(pos, key, version);
                tile.set(idx, TileSlot::Shortcut { key: key.to_vec(), value: version });
                Ok(digest)
            }
            TileSlot::Shortcut {
                key: existing_key,
                value: existing_version,
            } => {
                if existing_key == key {
                    let digest = self.shortcut_digest(pos, key, version);
                    tile.set(idx, TileSlot::Shortcut { key: key.to_vec(), value: version });
                    return Ok(digest);
                }
                if pos.is_leaf() {
                    return Err(TreeError::Invariant(format!(
                        "two distinct keys collided all the way to a leaf at {pos:?}"
                    )));
                }
                // Free the slot, then re-insert both the pre-existing
                // shortcut and the new key from here: each re-insertion
                // descends (and splits further, if they still collide) on
                // its own.
                tile.set(idx, TileSlot::Empty);
                self.insert_into_tile(tile, idx, pos, &existing_key, existing_version, mutations)?;
                self.insert_into_tile(tile, idx, pos, key, version, mutations)
            }
            TileSlot::Digest(_) => {
                let (l, r) = pos.children();
                let l_idx = Tile::left(idx);
                let r_idx = Tile::right(idx);
                let digest = match pos.branch_for(key) {
                    Direction::Left => {
                        let ld = self.insert_into_tile(tile, l_idx, &l, key, version, mutations)?;
                        let rd = self.tile_slot_digest(tile, r_idx, &r);
                        self.inner_hash(pos, &ld, &rd)
                    }
                    Direction::Right => {
                        let ld = self.tile_slot_digest(tile, l_idx, &l);
                        let rd = self.insert_into_tile(tile, r_idx, &r, key, version, mutations)?;
                        self.inner_hash(pos, &ld, &rd)
                    }
                };
                tile.set(idx, TileSlot::Digest(digest.clone()));
                Ok(digest)
            }
        }
    }

    /// Walks from the root to wherever `key` would live, collecting every
    /// sibling subtree's digest, and reports whether `key` is present.
    pub fn query_membership(&self, key: &[u8]) -> Result<QueryProof, TreeError> {
        if key.len() != self.hasher.bytes() {
            return Err(TreeError::BadArgument(format!(
                "key is {} bytes, expected {}",
                key.len(),
                self.hasher.bytes()
            )));
        }
        let mut pos = self.root_position();
        let mut audit_path = HashMap::new();
        loop {
            if pos.height > self.cache_height_limit {
                if self.is_empty_above(&pos) {
                    return Ok(QueryProof {
                        key: key.to_vec(),
                        witness: Witness::Empty { position: pos },
                        audit_path,
                    });
                }
                let (l, r) = pos.children();
                let (next, sibling) = match pos.branch_for(key) {
                    Direction::Left => (l, r),
                    Direction::Right => (r, l),
                };
                let sibling_digest = self.digest_at(&sibling)?;
                audit_path.insert(sibling, sibling_digest);
                pos = next;
                continue;
            }
            return self.query_in_tile(key, pos, audit_path);
        }
    }

    fn query_in_tile(
        &self,
        key: &[u8],
        tile_root: HyperPosition,
        mut audit_path: HashMap<HyperPosition, Digest>,
    ) -> Result<QueryProof, TreeError> {
        let mut tile = self.load_tile(&tile_root)?;
        let mut idx = 0usize;
        let mut pos = tile_root;
        loop {
            match tile.get(idx).clone() {
                TileSlot::Empty => {
                    return Ok(QueryProof {
                        key: key.to_vec(),
                        witness: Witness::Empty { position: pos },
                        audit_path,
                    });
                }
                TileSlot::Shortcut { key: existing_key, value } => {
                    let witness = if existing_key == key {
                        Witness::Match { position: pos, version: value }
                    } else {
                        Witness::OtherShortcut { position: pos, key: existing_key, version: value }
                    };
                    return Ok(QueryProof { key: key.to_vec(), witness, audit_path });
                }
                TileSlot::Digest(_) => {
                    if !pos.is_leaf() && tile.is_tile_leaf(idx) {
                        tile = self.load_tile(&pos)?;
                        idx = 0;
                        continue;
                    }
                    let (l, r) = pos.children();
                    let l_idx = Tile::left(idx);
                    let r_idx = Tile::right(idx);
                    let (next_idx, next_pos, sibling_idx, sibling_pos) = match pos.branch_for(key) {
                        Direction::Left => (l_idx, l, r_idx, r),
                        Direction::Right => (r_idx, r, l_idx, l),
                    };
                    let sibling_digest = self.tile_slot_digest(&tile, sibling_idx, &sibling_pos);
                    audit_path.insert(sibling_pos, sibling_digest);
                    idx = next_idx;
                    pos = next_pos;
                }
            }
        }
    }

    /// Warms the above-cache-line cache from the store's persisted
    /// `HyperCache` table, verifying along the way that every cached
    /// digest, and every stored tile, still reproduces from what is
    /// beneath it. Intended to run after loading a store whose integrity
    /// is in question, e.g. recovering from an unclean shutdown.
    pub fn rebuild_cache(&self) -> Result<(), TreeError> {
        self.verify_and_warm(&self.root_position())?;
        Ok(())
    }

    fn verify_and_warm(&self, pos: &HyperPosition) -> Result<Digest, TreeError> {
        if pos.height > self.cache_height_limit {
            let stored = self.store.get(TableId::HyperCache, &pos.encode())?;
            let digest = match stored {
                None => self.defaults.get(pos.height).clone(),
                Some(bytes) => {
                    let cached = Digest::from_bytes(bytes);
                    let (l, r) = pos.children();
                    let ld = self.verify_and_warm(&l)?;
                    let rd = self.verify_and_warm(&r)?;
                    let recomputed = self.inner_hash(pos, &ld, &rd);
                    if recomputed != cached {
                        return Err(TreeError::Invariant(format!(
                            "cached digest at {pos:?} does not match its own subtree"
                        )));
                    }
                    recomputed
                }
            };
            self.cache.put(pos.clone(), digest.clone());
            Ok(digest)
        } else {
            let tile = self.load_tile(pos)?;
            let digest = self.verify_tile_slot(&tile, 0, pos)?;
            self.cache.put(pos.clone(), digest.clone());
            Ok(digest)
        }
    }

    fn verify_tile_slot(&self, tile: &Tile, idx: usize, pos: &HyperPosition) -> Result<Digest, TreeError> {
        match tile.get(idx) {
            TileSlot::Empty => Ok(self.defaults.get(pos.height).clone()),
            TileSlot::Shortcut { key, value } => Ok(self.shortcut_digest(pos, key, *value)),
            TileSlot::Digest(d) => {
                if !pos.is_leaf() && tile.is_tile_leaf(idx) {
                    let deeper = self.verify_and_warm(pos)?;
                    if &deeper != d {
                        return Err(TreeError::Invariant(format!(
                            "tile summary at {pos:?} does not match its child tile"
                        )));
                    }
                    Ok(deeper)
                } else {
                    let (l, r) = pos.children();
                    let ld = self.verify_tile_slot(tile, Tile::left(idx), &l)?;
                    let rd = self.verify_tile_slot(tile, Tile::right(idx), &r)?;
                    let recomputed = self.inner_hash(pos, &ld, &rd);
                    if &recomputed != d {
                        return Err(TreeError::Invariant(format!(
                            "tile digest at {pos:?} does not match its own subtree"
                        )));
                    }
                    Ok(recomputed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use balloon_crypto::xor::XorHasher;
    use balloon_store::MemoryStore;

    use super::*;

    fn build_tree(cache_height_limit: u32) -> HyperTree {
        let hasher: Arc<dyn Hasher> = Arc::new(XorHasher);
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        HyperTree::new(hasher, store, cache_height_limit).unwrap()
    }

    #[test]
    fn empty_tree_root_is_the_top_default_hash() {
        let tree = build_tree(0);
        let expected = DefaultHashes::build(&XorHasher, 8).get(8).clone();
        assert_eq!(tree.root().unwrap(), expected);
    }

    /// Inserting `0x5a` at version 0 makes `query_membership(0x5a)` report a
    /// match at version 0, and `query_membership(0x5b)` report non-membership.
    #[test]
    fn inserted_key_is_found_by_query_membership() {
        let tree = build_tree(0);
        let (_, mutations) = tree.insert(&[0x5a], 0).unwrap();
        tree.store.mutate(mutations).unwrap();

        let proof = tree.query_membership(&[0x5a]).unwrap();
        match proof.witness {
            Witness::Match { version, .. } => assert_eq!(version, 0),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn absent_key_reports_non_membership() {
        let tree = build_tree(0);
        let (_, mutations) = tree.insert(&[0x5a], 0).unwrap();
        tree.store.mutate(mutations).unwrap();

        let proof = tree.query_membership(&[0x5b]).unwrap();
        assert!(!proof.witness.is_match());
    }

    #[test]
    fn colliding_keys_both_remain_queryable() {
        let tree = build_tree(0);
        let (_, m1) = tree.insert(&[0x5a], 1).unwrap();
        tree.store.mutate(m1).unwrap();
        let (_, m2) = tree.insert(&[0x5b], 2).unwrap();
        tree.store.mutate(m2).unwrap();

        let p1 = tree.query_membership(&[0x5a]).unwrap();
        let p2 = tree.query_membership(&[0x5b]).unwrap();
        assert!(p1.witness.is_match());
        assert!(p2.witness.is_match());
    }

    #[test]
    fn no_shortcut_forms_above_the_cache_line() {
        // With cache_height_limit = 4, a single insert's path above height
        // 4 must stay plain InnerHash/GetDefault: nothing is stored in the
        // Hyper table at those heights, only HyperCache entries.
        let tree = build_tree(4);
        let (_, mutations) = tree.insert(&[0x5a], 0).unwrap();
        tree.store.mutate(mutations).unwrap();

        for height in 5..=8 {
            let mut index = [0x5au8];
            for bit in 0..height {
                super::super::position::clear_bit(&mut index, bit);
            }
            let pos = HyperPosition { index: index.to_vec(), height };
            assert!(tree.store.get(TableId::Hyper, &pos.encode()).unwrap().is_none());
        }
    }

    #[test]
    fn rebuild_cache_accepts_a_freshly_populated_tree() {
        let tree = build_tree(4);
        for (k, v) in [(0x5au8, 1u64), (0x5b, 2), (0x01, 3)] {
            let (_, mutations) = tree.insert(&[k], v).unwrap();
            tree.store.mutate(mutations).unwrap();
        }
        tree.rebuild_cache().unwrap();

        for k in [0x5au8, 0x5b, 0x01] {
            let proof = tree.query_membership(&[k]).unwrap();
            assert!(proof.witness.is_match());
        }
    }
}
