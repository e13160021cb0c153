use sha2::Digest as _;
use sha2::Sha256;

use crate::{Digest, HashAlgorithm, Hasher};

/// The production hasher.
#[derive(Default, Debug, Clone, Copy)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn bits(&self) -> u32 {
        256
    }

    fn hash(&self, parts: &[&[u8]]) -> Digest {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Digest::from(hasher.finalize().to_vec())
    }
}
