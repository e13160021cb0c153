//! Tree algorithms shared by the balloon: the append-only history tree and
//! the sparse hyper tree, each built over the same [`balloon_store::Store`]
//! contract and the same pluggable [`balloon_crypto::Hasher`].

pub mod cache;
pub mod error;
pub mod history;
pub mod hyper;

pub use error::TreeError;
