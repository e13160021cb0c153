//! The history tree: a plain append-only Merkle tree over inserted events,
//! indexed by version.

mod interpreter;
mod ops;
mod planner;
mod position;
mod proof;
mod tree;

pub use position::{broots, HistoryPosition};
pub use proof::{AuditPath, ConsistencyProof, InclusionProof, VerifyError};
pub use tree::HistoryTree;
