use balloon_crypto::Digest;

use crate::error::TreeError;

use super::ops::Op;
use super::position::HistoryPosition;

/// Plans the postfix op sequence to read (not insert) the digest of `pos`
/// as of `version`, descending into partial subtrees as needed.
///
/// Every position reached here must already have at least one leaf
/// inserted under it (`pos.exists_at(version)`); callers are expected to
/// have checked that before recursing into a sibling.
pub fn plan_read(pos: HistoryPosition, version: u64, ops: &mut Vec<Op>) -> Result<(), TreeError> {
    if pos.is_frozen_at(version) {
        ops.push(Op::GetCache(pos));
        return Ok(());
    }
    if !pos.exists_at(version) {
        return Err(TreeError::Invariant(format!(
            "{pos:?} has no leaves inserted by version {version}"
        )));
    }
    if pos.is_leaf() {
        // A leaf that exists but isn't frozen is a contradiction: leaves
        // are frozen the instant they exist.
        return Err(TreeError::Invariant(format!(
            "{pos:?} is an unfrozen leaf"
        )));
    }
    let (l, r) = pos.children();
    if r.exists_at(version) {
        plan_read(l, version, ops)?;
        plan_read(r, version, ops)?;
        ops.push(Op::InnerHash(pos));
    } else {
        plan_read(l, version, ops)?;
        ops.push(Op::PartialInnerHash(pos));
    }
    Ok(())
}

/// Plans the insertion of `pending_digest` at leaf index `pending_index`,
/// descending from `pos` (normally the new root) and persisting every node
/// that becomes frozen as a result.
///
/// Because versions are always inserted in increasing order, every
/// position visited on this path was *not* frozen before this insertion —
/// the sibling not on the path to the new leaf, by contrast, is always
/// already fully committed, so it is fetched with `GetCache` rather than
/// descended into.
pub fn plan_add(
    pos: HistoryPosition,
    version: u64,
    pending_index: u64,
    pending_digest: &Digest,
    ops: &mut Vec<Op>,
) {
    if pos.is_leaf() {
        ops.push(Op::LeafHash(pos, pending_digest.clone()));
    } else {
        let (l, r) = pos.children();
        if pending_index < r.index {
            plan_add(l, version, pending_index, pending_digest, ops);
            ops.push(Op::PartialInnerHash(pos));
        } else {
            ops.push(Op::GetCache(l));
            plan_add(r, version, pending_index, pending_digest, ops);
            ops.push(Op::InnerHash(pos));
        }
    }
    if pos.is_frozen_at(version) {
        ops.push(Op::Persist(pos));
    }
}

/// Plans a membership audit path: descends from `pos` toward the leaf at
/// `target_index`, collecting the digest of every sibling that has at
/// least one inserted leaf.
pub fn plan_membership(
    pos: HistoryPosition,
    target_index: u64,
    version: u64,
    ops: &mut Vec<Op>,
) -> Result<(), TreeError> {
    if pos.index == target_index && pos.is_leaf() {
        return Ok(());
    }
    let (l, r) = pos.children();
    let (target_child, sibling) = if target_index < r.index { (l, r) } else { (r, l) };
    if sibling.exists_at(version) {
        plan_read(sibling, version, ops)?;
        ops.push(Op::Collect(sibling));
    }
    plan_membership(target_child, target_index, version, ops)
}

/// Plans the inclusion of a single node `target` (typically a balanced
/// root from an earlier version) into the tree as of `version`, walking
/// down from `pos` (normally the root at `version`) and collecting
/// sibling digests along the way.
pub fn plan_inclusion_walk(
    pos: HistoryPosition,
    target: HistoryPosition,
    version: u64,
    ops: &mut Vec<Op>,
) -> Result<(), TreeError> {
    if pos == target {
        return Ok(());
    }
    let (l, r) = pos.children();
    let (next, sibling) = if target.index < r.index { (l, r) } else { (r, l) };
    if sibling.exists_at(version) {
        plan_read(sibling, version, ops)?;
        ops.push(Op::Collect(sibling));
    }
    plan_inclusion_walk(next, target, version, ops)
}
