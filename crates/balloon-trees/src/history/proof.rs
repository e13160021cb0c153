use std::collections::HashMap;

use balloon_crypto::{Digest, Hasher};

use super::position::{broots, HistoryPosition};

/// An unordered map from position to digest, handed to a verifier alongside
/// a commitment so it can recompute a root without talking to the store.
pub type AuditPath = HashMap<HistoryPosition, Digest>;

/// Error returned while evaluating a proof against an audit path.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("audit path is missing the digest for {0:?}")]
    MissingDigest(HistoryPosition),
    #[error("proof roots computed from different balanced roots diverge")]
    DivergingRoots,
}

/// Walks from `leaf` up to `root`, combining with digests from
/// `audit_path` at each level. Shared by membership proof evaluation and
/// consistency proof evaluation, which are both "recompute an ancestor
/// from a leaf/node plus its siblings" in shape.
fn walk_to_root(
    mut pos: HistoryPosition,
    mut digest: Digest,
    root: HistoryPosition,
    audit_path: &AuditPath,
    hasher: &dyn Hasher,
) -> Result<Digest, VerifyError> {
    while pos != root {
        let parent = pos.parent();
        let (l, r) = parent.children();
        let (sibling, pos_is_right) = if pos == l { (r, false) } else { (l, true) };
        digest = match audit_path.get(&sibling) {
            Some(sib) => {
                if pos_is_right {
                    hasher.hash(&[sib.as_bytes(), digest.as_bytes()])
                } else {
                    hasher.hash(&[digest.as_bytes(), sib.as_bytes()])
                }
            }
            None => hasher.hash(&[digest.as_bytes()]),
        };
        pos = parent;
    }
    Ok(digest)
}

/// Proof that the leaf at `index` was present at `version`.
#[derive(Clone, Debug)]
pub struct InclusionProof {
    pub index: u64,
    pub version: u64,
    pub audit_path: AuditPath,
}

impl InclusionProof {
    /// Recomputes the history root at `self.version` from `leaf_digest`
    /// (the hash of the event the caller independently computed) and this
    /// proof's audit path.
    pub fn evaluate(&self, leaf_digest: &Digest, hasher: &dyn Hasher) -> Result<Digest, VerifyError> {
        let root = HistoryPosition::root(self.version);
        walk_to_root(
            HistoryPosition::leaf(self.index),
            leaf_digest.clone(),
            root,
            &self.audit_path,
            hasher,
        )
    }
}

/// Proof that the tree at `end` is an append-only extension of the tree at
/// `start`.
#[derive(Clone, Debug)]
pub struct ConsistencyProof {
    pub start: u64,
    pub end: u64,
    pub audit_path: AuditPath,
}

impl ConsistencyProof {
    /// Recomputes both the `start` root and the `end` root from this
    /// proof's audit path, returning `(start_root, end_root)`. Every
    /// balanced root of the `start` tree must independently walk up to the
    /// same `end` root, or the proof is inconsistent.
    pub fn evaluate(&self, hasher: &dyn Hasher) -> Result<(Digest, Digest), VerifyError> {
        let old_broots = broots(self.start + 1);
        let mut old_values = Vec::with_capacity(old_broots.len());
        for b in &old_broots {
            let d = self
                .audit_path
                .get(b)
                .cloned()
                .ok_or(VerifyError::MissingDigest(*b))?;
            old_values.push(d);
        }
        let start_root = reduce_broots(&old_values, hasher);

        if self.start == self.end {
            return Ok((start_root.clone(), start_root));
        }

        let end_root_pos = HistoryPosition::root(self.end);
        let mut end_root = None;
        for (b, value) in old_broots.iter().zip(old_values.iter()) {
            let candidate = walk_to_root(*b, value.clone(), end_root_pos, &self.audit_path, hasher)?;
            match &end_root {
                None => end_root = Some(candidate),
                Some(existing) if *existing == candidate => {}
                Some(_) => return Err(VerifyError::DivergingRoots),
            }
        }
        Ok((start_root, end_root.expect("at least one balanced root")))
    }
}

/// Combines a left-to-right (tallest-first) list of balanced-root digests
/// into a single root, nesting from the smallest/rightmost outward:
/// `hash(v0, hash(v1, hash(v2, ...)))`.
fn reduce_broots(values: &[Digest], hasher: &dyn Hasher) -> Digest {
    values
        .iter()
        .rev()
        .cloned()
        .reduce(|acc, v| hasher.hash(&[v.as_bytes(), acc.as_bytes()]))
        .expect("a tree with at least one version has at least one balanced root")
}

#[cfg(test)]
mod tests {
    use super::*;
    use balloon_crypto::xor::XorHasher;

    fn pos(index: u64, height: u16) -> HistoryPosition {
        HistoryPosition { index, height }
    }

    fn d(b: u8) -> Digest {
        Digest::from(vec![b])
    }

    /// `prove(3, 3) -> { (0,1): 0x01, (2,0): 0x02 }`, root 0x00.
    #[test]
    fn inclusion_proof_matches_worked_example() {
        let hasher = XorHasher;
        let mut audit_path = AuditPath::new();
        audit_path.insert(pos(0, 1), d(0x01));
        audit_path.insert(pos(2, 0), d(0x02));
        let proof = InclusionProof {
            index: 3,
            version: 3,
            audit_path,
        };
        let root = proof.evaluate(&d(0x03), &hasher).unwrap();
        assert_eq!(root, d(0x00));
    }

    /// `prove(0, 3) -> { (1,0): 0x01, (2,1): 0x01 }`, root 0x00.
    #[test]
    fn inclusion_proof_for_leftmost_leaf() {
        let hasher = XorHasher;
        let mut audit_path = AuditPath::new();
        audit_path.insert(pos(1, 0), d(0x01));
        audit_path.insert(pos(2, 1), d(0x01));
        let proof = InclusionProof {
            index: 0,
            version: 3,
            audit_path,
        };
        let root = proof.evaluate(&d(0x00), &hasher).unwrap();
        assert_eq!(root, d(0x00));
    }

    /// `prove(2, 2) -> { (0,1): 0x01 }`, root 0x03 (a partial node along
    /// the path).
    #[test]
    fn inclusion_proof_with_absent_sibling() {
        let hasher = XorHasher;
        let mut audit_path = AuditPath::new();
        audit_path.insert(pos(0, 1), d(0x01));
        let proof = InclusionProof {
            index: 2,
            version: 2,
            audit_path,
        };
        let root = proof.evaluate(&d(0x02), &hasher).unwrap();
        assert_eq!(root, d(0x03));
    }

    /// `proveConsistency(3, 5)` reconstructs root 0x00 at version 3 and
    /// root 0x01 at version 5 from a single audit path.
    #[test]
    fn consistency_proof_matches_worked_example() {
        let hasher = XorHasher;
        let mut audit_path = AuditPath::new();
        audit_path.insert(pos(0, 2), d(0x00));
        audit_path.insert(pos(4, 2), d(0x01));
        let proof = ConsistencyProof {
            start: 3,
            end: 5,
            audit_path,
        };
        let (start_root, end_root) = proof.evaluate(&hasher).unwrap();
        assert_eq!(start_root, d(0x00));
        assert_eq!(end_root, d(0x01));
    }

    #[test]
    fn consistency_proof_singleton_view() {
        let hasher = XorHasher;
        let mut audit_path = AuditPath::new();
        audit_path.insert(pos(0, 2), d(0x00));
        let proof = ConsistencyProof {
            start: 3,
            end: 3,
            audit_path,
        };
        let (start_root, end_root) = proof.evaluate(&hasher).unwrap();
        assert_eq!(start_root, d(0x00));
        assert_eq!(end_root, d(0x00));
    }
}
