use balloon_store::StoreError;

/// Errors raised by the tree engines.
///
/// `balloon`'s top-level `BalloonError` wraps this one-for-one; it lives
/// here (rather than only at the driver level) because the planners and the
/// interpreter themselves detect most of these conditions directly.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A structural invariant was violated: a node expected to be frozen
    /// and persisted could not be read back, or a tile failed to verify
    /// its own self-hash.
    #[error("tree invariant violated: {0}")]
    Invariant(String),

    /// A query referenced a version, index, or key that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying store failed.
    #[error("store error: {0}")]
    Io(#[from] StoreError),

    /// A caller-supplied argument was invalid independent of tree state
    /// (e.g. a negative-going version, an out-of-range query).
    #[error("bad argument: {0}")]
    BadArgument(String),
}
