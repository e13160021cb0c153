use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::{KvReader, Mutation, Store, StoreError, TableId};

/// An in-memory [`Store`], grounded on the same shape as a typical
/// reference key-value backend: one lock around one ordered map per table.
/// Not tuned for throughput; it exists so the rest of this workspace's
/// tests don't need a real storage engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<(TableId, Vec<u8>), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryKvReader {
    remaining: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl KvReader for MemoryKvReader {
    fn next_batch(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        // The whole table was already materialized in `get_all` below, so
        // one batch drains the iterator. A real backend would page here.
        Ok(self.remaining.by_ref().collect())
    }
}

impl Store for MemoryStore {
    fn get(&self, table: TableId, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Io("lock poisoned".into()))?;
        Ok(tables.get(&(table, key.to_vec())).cloned())
    }

    fn mutate(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Io("lock poisoned".into()))?;
        for m in mutations {
            match m.value {
                Some(value) => {
                    tables.insert((m.table, m.key), value);
                }
                None => {
                    tables.remove(&(m.table, m.key));
                }
            }
        }
        Ok(())
    }

    fn get_all(&self, table: TableId) -> Result<Box<dyn KvReader + '_>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Io("lock poisoned".into()))?;
        let entries: Vec<_> = tables
            .iter()
            .filter(|((t, _), _)| *t == table)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(MemoryKvReader {
            remaining: entries.into_iter(),
        }))
    }
}
