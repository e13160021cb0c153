use crate::{Digest, HashAlgorithm, Hasher};

/// A one-byte "digest" that XOR-reduces every input byte.
///
/// Not cryptographically meaningful. Its only purpose is to make the tree
/// arithmetic exercised by this workspace's tests reproducible by hand: with
/// an 8-bit digest and a commutative, self-inverse combine step, every root
/// and audit path in this workspace's worked examples can be checked on
/// paper.
#[derive(Default, Debug, Clone, Copy)]
pub struct XorHasher;

impl Hasher for XorHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Xor
    }

    fn bits(&self) -> u32 {
        8
    }

    fn hash(&self, parts: &[&[u8]]) -> Digest {
        let mut acc = 0u8;
        for part in parts {
            for byte in *part {
                acc ^= byte;
            }
        }
        Digest::from(vec![acc])
    }
}
