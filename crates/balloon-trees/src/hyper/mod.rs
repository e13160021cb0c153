//! The hyper tree: a sparse Merkle tree over event digests, supporting
//! membership and non-membership queries independent of insertion order.

mod batch;
mod cache;
mod default_hashes;
mod position;
mod proof;
mod tree;

pub use cache::PassThroughCache;
pub use default_hashes::DefaultHashes;
pub use position::{Direction, HyperPosition};
pub use proof::{QueryProof, VerifyError, Witness};
pub use tree::HyperTree;
