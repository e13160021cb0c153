use balloon_crypto::Digest;

use super::position::HistoryPosition;

/// One step of a postfix operation stack built by a planner and carried out
/// by [`super::interpreter::Interpreter`].
///
/// Children always appear before the parent that consumes them, so the
/// interpreter never needs to look ahead — by the time it reaches an
/// `InnerHash`/`PartialInnerHash` step, both (or the one) child digests it
/// needs are already in its scratch table.
#[derive(Clone, Debug)]
pub enum Op {
    /// Fetch an already-frozen node's digest from the cache or store.
    GetCache(HistoryPosition),
    /// Hash a leaf's event digest.
    LeafHash(HistoryPosition, Digest),
    /// Combine a node's two present children.
    InnerHash(HistoryPosition),
    /// Combine a node whose right child has no leaves inserted under it
    /// yet, folding in only the left child's digest.
    PartialInnerHash(HistoryPosition),
    /// Persist a node that has just become frozen as of this operation.
    Persist(HistoryPosition),
    /// Record a node's digest into the audit path being built for a proof.
    Collect(HistoryPosition),
}
