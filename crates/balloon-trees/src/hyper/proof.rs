use std::collections::HashMap;

use balloon_crypto::{Digest, Hasher};

use super::position::HyperPosition;

/// What was found at the end of a membership walk.
#[derive(Clone, Debug)]
pub enum Witness {
    /// `key` is present, stored as the shortcut at `position`, inserted at
    /// `version`.
    Match { position: HyperPosition, version: u64 },
    /// `key` is absent: `position` instead holds a *different* key's
    /// shortcut, proving nothing else can live in that subtree.
    OtherShortcut {
        position: HyperPosition,
        key: Vec<u8>,
        version: u64,
    },
    /// `key` is absent: `position` is a provably empty subtree.
    Empty { position: HyperPosition },
}

impl Witness {
    pub fn is_match(&self) -> bool {
        matches!(self, Witness::Match { .. })
    }

    fn position(&self) -> &HyperPosition {
        match self {
            Witness::Match { position, .. } => position,
            Witness::OtherShortcut { position, .. } => position,
            Witness::Empty { position } => position,
        }
    }
}

/// Proof of membership (or non-membership) of a key, built by
/// [`super::tree::HyperTree::query_membership`].
#[derive(Clone, Debug)]
pub struct QueryProof {
    pub key: Vec<u8>,
    pub witness: Witness,
    pub audit_path: HashMap<HyperPosition, Digest>,
}

/// Error returned while evaluating a hyper tree proof.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("audit path is missing the digest for {0:?}")]
    MissingDigest(HyperPosition),
    /// An `OtherShortcut` witness carried the queried key itself, which
    /// would make it prove nothing: the same shortcut record is valid
    /// evidence of non-membership only for a key other than its own.
    #[error("shortcut witness at {0:?} carries the queried key, not a different one")]
    ShortcutKeyMatchesQuery(HyperPosition),
}

impl QueryProof {
    /// Recomputes the hyper root implied by this proof's witness and audit
    /// path. The caller compares the result against the root they already
    /// trust (e.g. one carried by a signed commitment).
    pub fn evaluate(&self, num_bits: u32, hasher: &dyn Hasher) -> Result<Digest, VerifyError> {
        let mut pos = self.witness.position().clone();
        let mut digest = match &self.witness {
            Witness::Match { position, version } => {
                Ok(hasher.salted(&position.encode(), &[self.key.as_slice(), &version.to_be_bytes()]))
            }
            Witness::OtherShortcut { position, key, version } => {
                // a witness carrying the queried key itself would hash
                // identically to a Match and "prove" non-membership for a
                // key that is actually present.
                if key == &self.key {
                    return Err(VerifyError::ShortcutKeyMatchesQuery(position.clone()));
                }
                Ok(hasher.salted(&position.encode(), &[key.as_slice(), &version.to_be_bytes()]))
            }
            Witness::Empty { position } => {
                let defaults = super::default_hashes::DefaultHashes::build(hasher, num_bits);
                Ok(defaults.get(position.height).clone())
            }
        }?;

        while pos.height < num_bits {
            let parent_height = pos.height + 1;
            let mut parent_index = pos.index.clone();
            super::position::clear_bit(&mut parent_index, pos.height);
            let parent = HyperPosition {
                index: parent_index,
                height: parent_height,
            };
            let (l, r) = parent.children();
            let sibling = if pos == l { r } else { l };
            let sibling_digest = self
                .audit_path
                .get(&sibling)
                .cloned()
                .ok_or(VerifyError::MissingDigest(sibling.clone()))?;
            digest = if pos == l {
                hasher.salted(&parent.encode(), &[digest.as_bytes(), sibling_digest.as_bytes()])
            } else {
                hasher.salted(&parent.encode(), &[sibling_digest.as_bytes(), digest.as_bytes()])
            };
            pos = parent;
        }
        Ok(digest)
    }
}
