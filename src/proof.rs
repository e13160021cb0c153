use balloon_crypto::{Digest, Hasher};
use balloon_trees::history;
use balloon_trees::hyper;

use crate::Commitment;

/// Proof that `key` either was, or was not, present in the log by
/// `query_version`.
///
/// Combines a hyper witness locating `key` (or proving its absence) with a
/// history inclusion proof anchoring whatever version the hyper tree
/// reported against `query_version`.
#[derive(Clone, Debug)]
pub struct MembershipProof {
    pub exists: bool,
    pub key_digest: Digest,
    pub current_version: u64,
    pub query_version: u64,
    pub actual_version: u64,
    pub hyper_proof: hyper::QueryProof,
    pub history_proof: Option<history::InclusionProof>,
}

/// Error returned while evaluating a composite proof.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("hyper tree proof does not evaluate: {0}")]
    Hyper(#[from] hyper::VerifyError),
    #[error("history tree proof does not evaluate: {0}")]
    History(#[from] history::VerifyError),
    #[error("hyper root does not match the commitment's hyperDigest")]
    HyperRootMismatch,
    #[error("history root does not match the commitment's historyDigest")]
    HistoryRootMismatch,
    #[error("membership claim requires a history inclusion proof")]
    MissingHistoryProof,
}

impl MembershipProof {
    /// Reconstructs the hyper root from `hyper_proof` and compares it
    /// against `current_commitment` (the commitment at this proof's
    /// `current_version` — the hyper tree is not itself versioned, its root
    /// only ever reflects "everything inserted so far", so it can only be
    /// checked against the *latest* commitment, not the one at
    /// `query_version`). Existence is derived from `hyper_proof.witness`
    /// here, never taken from the `exists` field: that field is only the
    /// prover's own bookkeeping and a caller could set it to anything
    /// without invalidating the witness or the root it evaluates to. When
    /// the witness claims a match, additionally reconstructs the history
    /// root at `query_version` from `history_proof` and compares it
    /// against `query_commitment`.
    pub fn verify(
        &self,
        current_commitment: &Commitment,
        query_commitment: &Commitment,
        num_bits: u32,
        hasher: &dyn Hasher,
    ) -> Result<bool, VerifyError> {
        let hyper_root = self.hyper_proof.evaluate(num_bits, hasher)?;
        if hyper_root != current_commitment.hyper_digest {
            return Err(VerifyError::HyperRootMismatch);
        }

        let exists = matches!(&self.hyper_proof.witness, hyper::Witness::Match { .. })
            && self.hyper_proof.key.as_slice() == self.key_digest.as_bytes();

        if exists {
            let history_proof = self.history_proof.as_ref().ok_or(VerifyError::MissingHistoryProof)?;
            let history_root = history_proof.evaluate(&self.key_digest, hasher)?;
            if history_root != query_commitment.history_digest {
                return Err(VerifyError::HistoryRootMismatch);
            }
        }

        Ok(true)
    }
}

/// Proof that the log at `end` is an append-only extension of the log at
/// `start`. A thin wrapper around [`history::ConsistencyProof`]: hyper tree
/// participation is irrelevant to consistency.
#[derive(Clone, Debug)]
pub struct ConsistencyProof {
    pub history_proof: history::ConsistencyProof,
}

impl ConsistencyProof {
    /// Reconstructs both the `start` and `end` history roots and compares
    /// them against the two commitments.
    pub fn verify(
        &self,
        start: &Commitment,
        end: &Commitment,
        hasher: &dyn Hasher,
    ) -> Result<bool, VerifyError> {
        let (start_root, end_root) = self.history_proof.evaluate(hasher)?;
        Ok(start_root == start.history_digest && end_root == end.history_digest)
    }
}
