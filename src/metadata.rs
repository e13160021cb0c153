use balloon_crypto::HashAlgorithm;
use balloon_store::{Mutation, Store, TableId};

use crate::error::BalloonError;

const METADATA_KEY: &[u8] = b"balloon";

/// Global balloon state persisted outside either tree: the version counter
/// and the hasher identity, recovered at start-up before cache warm-up runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    pub version: u64,
    pub hash_algorithm: HashAlgorithm,
}

impl Metadata {
    /// Reads metadata back from the store, or initializes it to `{0,
    /// hash_algorithm}` if this is a fresh store.
    pub fn load_or_init(store: &dyn Store, hash_algorithm: HashAlgorithm) -> Result<Self, BalloonError> {
        match store.get(TableId::Metadata, METADATA_KEY)? {
            Some(bytes) => {
                let metadata: Metadata = ciborium::de::from_reader(bytes.as_slice())
                    .map_err(|e| BalloonError::Invariant(format!("corrupt metadata record: {e}")))?;
                Ok(metadata)
            }
            None => {
                let metadata = Metadata { version: 0, hash_algorithm };
                metadata.persist(store)?;
                Ok(metadata)
            }
        }
    }

    pub fn persist(&self, store: &dyn Store) -> Result<(), BalloonError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| BalloonError::Invariant(format!("failed to encode metadata: {e}")))?;
        store.mutate(vec![Mutation::put(TableId::Metadata, METADATA_KEY, bytes)])?;
        Ok(())
    }

    pub fn mutation(&self) -> Result<Mutation, BalloonError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| BalloonError::Invariant(format!("failed to encode metadata: {e}")))?;
        Ok(Mutation::put(TableId::Metadata, METADATA_KEY, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balloon_store::MemoryStore;

    #[test]
    fn fresh_store_initializes_version_zero() {
        let store = MemoryStore::new();
        let metadata = Metadata::load_or_init(&store, HashAlgorithm::Xor).unwrap();
        assert_eq!(metadata.version, 0);
        assert_eq!(metadata.hash_algorithm, HashAlgorithm::Xor);
    }

    #[test]
    fn persisted_metadata_round_trips() {
        let store = MemoryStore::new();
        let written = Metadata { version: 7, hash_algorithm: HashAlgorithm::Sha256 };
        written.persist(&store).unwrap();

        let read_back = Metadata::load_or_init(&store, HashAlgorithm::Xor).unwrap();
        assert_eq!(read_back, written);
    }
}
