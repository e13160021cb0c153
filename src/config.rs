use balloon_crypto::HashAlgorithm;

/// Which implementation backs the hyper tree's above-cache-line digest
/// cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Keep the whole above-cache-line working set resident in RAM.
    /// Appropriate whenever that working set comfortably fits in memory —
    /// the common case.
    InMemory,
    /// Re-read every digest from the store's `HyperCache` table on every
    /// access, buffering nothing. Trades digest-read latency for a
    /// constant memory footprint.
    PassThrough,
}

/// Construction-time knobs for a [`crate::Balloon`], immutable for the
/// lifetime of the tree instances built from it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BalloonConfig {
    /// Which digest function backs both trees.
    pub hash_algorithm: HashAlgorithm,
    /// Hyper tree heights above this are cached (through-cache, no
    /// shortcuts); at or below it, the tree is stored as batch-node tiles
    /// with shortcut leaves. Must be a multiple of the hyper tree's tile
    /// height (4).
    pub cache_height_limit: u32,
    /// Which cache implementation backs the through-cache region.
    pub cache_strategy: CacheStrategy,
}

impl Default for BalloonConfig {
    fn default() -> Self {
        BalloonConfig {
            hash_algorithm: HashAlgorithm::Sha256,
            cache_height_limit: 252,
            cache_strategy: CacheStrategy::InMemory,
        }
    }
}
