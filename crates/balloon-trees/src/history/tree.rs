use std::sync::Arc;

use balloon_crypto::{Digest, Hasher};
use balloon_store::{Mutation, Store};

use crate::cache::{Cache, SimpleCache};
use crate::error::TreeError;

use super::interpreter::Interpreter;
use super::planner;
use super::position::HistoryPosition;
use super::proof::{ConsistencyProof, InclusionProof};

/// The append-only history tree: one leaf per inserted event, indexed by
/// insertion order.
pub struct HistoryTree {
    hasher: Arc<dyn Hasher>,
    store: Arc<dyn Store>,
    cache: SimpleCache<HistoryPosition>,
}

impl HistoryTree {
    pub fn new(hasher: Arc<dyn Hasher>, store: Arc<dyn Store>) -> Self {
        HistoryTree {
            hasher,
            store,
            cache: SimpleCache::new(),
        }
    }

    /// Inserts the digest of an event as the leaf at `version`. `version`
    /// must equal the number of leaves already present: append-only, dense,
    /// no gaps.
    pub fn add(&self, version: u64, event_digest: &Digest) -> Result<(Digest, Vec<Mutation>), TreeError> {
        let root_pos = HistoryPosition::root(version);
        let mut ops = Vec::new();
        planner::plan_add(root_pos, version, version, event_digest, &mut ops);
        let mut interp = Interpreter::new(self.hasher.clone(), &self.cache, self.store.as_ref());
        let root = interp.run(&ops, root_pos)?;
        Ok((root, interp.mutations))
    }

    /// Builds an inclusion proof for the leaf at `index`, valid against
    /// the root at `version`. Requires `index <= version`.
    pub fn prove_membership(&self, index: u64, version: u64) -> Result<InclusionProof, TreeError> {
        if index > version {
            return Err(TreeError::BadArgument(format!(
                "index {index} is newer than version {version}"
            )));
        }
        let root_pos = HistoryPosition::root(version);
        let mut ops = Vec::new();
        planner::plan_membership(root_pos, index, version, &mut ops)?;
        let mut interp = Interpreter::new(self.hasher.clone(), &self.cache, self.store.as_ref());
        interp.execute(&ops)?;
        Ok(InclusionProof {
            index,
            version,
            audit_path: interp.audit_path,
        })
    }

    /// Builds a proof that the tree at `end` extends the tree at `start`.
    /// Requires `start <= end`.
    pub fn prove_consistency(&self, start: u64, end: u64) -> Result<ConsistencyProof, TreeError> {
        if start > end {
            return Err(TreeError::BadArgument(format!(
                "start {start} is after end {end}"
            )));
        }
        let old_broots = super::position::broots(start + 1);
        let mut ops = Vec::new();
        for broot in &old_broots {
            planner::plan_read(*broot, start, &mut ops)?;
            ops.push(super::ops::Op::Collect(*broot));
            if start != end {
                let end_root = HistoryPosition::root(end);
                planner::plan_inclusion_walk(end_root, *broot, end, &mut ops)?;
            }
        }
        let mut interp = Interpreter::new(self.hasher.clone(), &self.cache, self.store.as_ref());
        interp.execute(&ops)?;
        Ok(ConsistencyProof {
            start,
            end,
            audit_path: interp.audit_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balloon_crypto::xor::XorHasher;
    use balloon_store::MemoryStore;

    fn build_tree(n: u64) -> HistoryTree {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let tree = HistoryTree::new(Arc::new(XorHasher), store);
        for v in 0..n {
            let (_, mutations) = tree.add(v, &Digest::from(vec![v as u8])).unwrap();
            tree.store.mutate(mutations).unwrap();
        }
        tree
    }

    /// Roots after inserting leaves 0x00..=0x09, checked against a worked
    /// reference table for this sequence.
    #[test]
    fn roots_match_worked_table() {
        let expected = [
            0x00, 0x01, 0x03, 0x00, 0x04, 0x01, 0x07, 0x00, 0x08, 0x01,
        ];
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let tree = HistoryTree::new(Arc::new(XorHasher), store);
        for (v, expected_root) in expected.iter().enumerate() {
            let v = v as u64;
            let (root, mutations) = tree.add(v, &Digest::from(vec![v as u8])).unwrap();
            tree.store.mutate(mutations).unwrap();
            assert_eq!(root.as_bytes(), &[*expected_root], "version {v}");
        }
    }

    #[test]
    fn membership_proofs_match_worked_examples() {
        let tree = build_tree(10);
        let hasher = XorHasher;

        let proof = tree.prove_membership(1, 1).unwrap();
        assert_eq!(proof.audit_path.len(), 1);
        assert_eq!(
            proof.evaluate(&Digest::from(vec![1]), &hasher).unwrap(),
            Digest::from(vec![0x01])
        );

        let proof = tree.prove_membership(2, 2).unwrap();
        assert_eq!(
            proof.evaluate(&Digest::from(vec![2]), &hasher).unwrap(),
            Digest::from(vec![0x03])
        );

        let proof = tree.prove_membership(3, 3).unwrap();
        assert_eq!(
            proof.evaluate(&Digest::from(vec![3]), &hasher).unwrap(),
            Digest::from(vec![0x00])
        );

        let proof = tree.prove_membership(0, 3).unwrap();
        assert_eq!(
            proof.evaluate(&Digest::from(vec![0]), &hasher).unwrap(),
            Digest::from(vec![0x00])
        );
    }

    #[test]
    fn consistency_proof_matches_worked_scenario() {
        let tree = build_tree(10);
        let hasher = XorHasher;
        let proof = tree.prove_consistency(3, 5).unwrap();
        let (start_root, end_root) = proof.evaluate(&hasher).unwrap();
        assert_eq!(start_root, Digest::from(vec![0x00]));
        assert_eq!(end_root, Digest::from(vec![0x01]));
    }

    #[test]
    fn membership_rejects_index_newer_than_version() {
        let tree = build_tree(3);
        assert!(matches!(
            tree.prove_membership(5, 2),
            Err(TreeError::BadArgument(_))
        ));
    }
}
