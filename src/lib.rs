//! Balloon: an append-only, cryptographically verifiable log.
//!
//! Every accepted event is assigned a monotonically increasing version and
//! folded into two Merkle-like trees built over a shared key-value store: a
//! [`balloon_trees::history`] tree indexed by insertion order, and a
//! [`balloon_trees::hyper`] tree indexed by the event's own digest. Together
//! they answer three questions: what is the log's digest at version v
//! ([`Commitment`]), was this event present by some version
//! ([`Balloon::query_membership`]), and is one commitment a prefix of
//! another ([`Balloon::query_consistency`]).

mod balloon;
mod config;
mod error;
mod metadata;
mod proof;

pub use balloon::Balloon;
pub use config::{BalloonConfig, CacheStrategy};
pub use error::BalloonError;
pub use metadata::Metadata;
pub use proof::{ConsistencyProof, MembershipProof, VerifyError};

use balloon_crypto::Digest;

/// Published once per accepted event: the version it was assigned, and the
/// two tree roots after its insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    pub version: u64,
    pub history_digest: Digest,
    pub hyper_digest: Digest,
}
