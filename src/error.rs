use balloon_store::StoreError;
use balloon_trees::TreeError;

/// Errors surfaced by the balloon driver.
///
/// One-for-one with [`TreeError`], plus `Cancelled`: the tree engines never
/// observe cancellation themselves (they only ever suspend on store I/O or
/// hasher calls, both of which are synchronous and uninterruptible once
/// started), so that variant only ever originates at the driver, between a
/// planning step and the next store I/O boundary.
#[derive(Debug, thiserror::Error)]
pub enum BalloonError {
    /// A structural invariant was violated: a tile failed its self-hash
    /// check, or a version regression was requested.
    #[error("balloon invariant violated: {0}")]
    Invariant(String),

    /// A query referenced a version, index, or key that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying store failed.
    #[error("store error: {0}")]
    Io(#[from] StoreError),

    /// A cancellation signal was honoured before the operation completed.
    /// No mutations from the in-flight operation are returned or persisted.
    #[error("operation cancelled")]
    Cancelled,

    /// A caller-supplied argument was invalid.
    #[error("bad argument: {0}")]
    BadArgument(String),
}

impl From<TreeError> for BalloonError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Invariant(msg) => BalloonError::Invariant(msg),
            TreeError::NotFound(msg) => BalloonError::NotFound(msg),
            TreeError::Io(e) => BalloonError::Io(e),
            TreeError::BadArgument(msg) => BalloonError::BadArgument(msg),
        }
    }
}
