//! The storage contract the balloon's trees are built against.
//!
//! `Store` is intentionally synchronous and intentionally minimal: balloon
//! does not implement or choose a persistent key-value engine, it only
//! specifies the four tables it needs and the handful of operations it
//! performs on them. A production deployment supplies its own `Store`
//! (typically wrapping an embedded engine such as RocksDB); [`memory`]
//! provides a `RwLock<BTreeMap<..>>` implementation for tests only.

pub mod memory;

use std::fmt;

pub use memory::MemoryStore;

/// The four tables the balloon persists into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableId {
    /// Frozen history tree node digests, keyed by encoded `(index, height)`.
    History,
    /// Hyper tree batch-node tiles, keyed by the tile's root position.
    Hyper,
    /// Cached hyper tree digests above the cache height limit.
    HyperCache,
    /// Global balloon metadata: version counter, hash algorithm.
    Metadata,
}

/// A single table/key write, applied atomically as part of a batch.
/// `value: None` deletes the key — the hyper tree uses this when a
/// shortcut leaf is pushed further down the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub table: TableId,
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

impl Mutation {
    pub fn put(table: TableId, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Mutation {
            table,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(table: TableId, key: impl Into<Vec<u8>>) -> Self {
        Mutation {
            table,
            key: key.into(),
            value: None,
        }
    }
}

/// Errors a [`Store`] implementation can surface. Anything more specific
/// (serialization, corruption) is collapsed to `Io` with a description —
/// stores are expected to log their own detail and hand balloon only
/// whether the operation succeeded.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),
}

/// Streams the contents of a table, in key order, for cache warm-up.
///
/// A table can be arbitrarily large, so reading it is paginated rather than
/// returned as one `Vec`.
pub trait KvReader {
    /// Returns the next batch of entries, or an empty `Vec` at end of
    /// stream.
    fn next_batch(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// The storage contract balloon's trees are built against.
pub trait Store: fmt::Debug + Send + Sync {
    /// Point lookup. `Ok(None)` means the key is absent, not an error.
    fn get(&self, table: TableId, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Applies a batch of writes atomically.
    fn mutate(&self, mutations: Vec<Mutation>) -> Result<(), StoreError>;

    /// Streams every entry of `table` in key order.
    fn get_all(&self, table: TableId) -> Result<Box<dyn KvReader + '_>, StoreError>;

    /// Releases any resources held by the store. A no-op for in-memory
    /// implementations.
    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
