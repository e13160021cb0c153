use balloon_crypto::{Digest, Hasher};

/// Digest of a completely empty subtree, indexed by height. Height 0 is the
/// hash of no bytes at all; each level up combines two copies of the level
/// below. Unlike populated nodes, these are never salted by position: an
/// empty subtree looks the same no matter where it sits, which is what lets
/// [`super::tree::HyperTree`] skip storing (and hashing) the vast majority of
/// a sparse tree.
pub struct DefaultHashes {
    table: Vec<Digest>,
}

impl DefaultHashes {
    pub fn build(hasher: &dyn Hasher, num_bits: u32) -> Self {
        let mut table = Vec::with_capacity(num_bits as usize + 1);
        table.push(hasher.hash(&[]));
        for h in 1..=num_bits {
            let prev = table[(h - 1) as usize].clone();
            table.push(hasher.hash(&[prev.as_bytes(), prev.as_bytes()]));
        }
        DefaultHashes { table }
    }

    pub fn get(&self, height: u32) -> &Digest {
        &self.table[height as usize]
    }
}
