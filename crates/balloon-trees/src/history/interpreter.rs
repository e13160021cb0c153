use std::collections::HashMap;
use std::sync::Arc;

use balloon_crypto::{Digest, Hasher};
use balloon_store::{Mutation, Store, TableId};

use crate::cache::Cache;
use crate::error::TreeError;

use super::ops::Op;
use super::position::HistoryPosition;

/// Evaluates a postfix op sequence produced by [`super::planner`].
///
/// Carries a scratch table of digests computed (or fetched) so far, keyed
/// by position rather than a literal operand stack — `InnerHash`/
/// `PartialInnerHash` steps look their children up by position instead of
/// popping two anonymous values, which keeps the interpreter correct
/// regardless of the order children happen to have been computed in.
pub struct Interpreter<'a> {
    hasher: Arc<dyn Hasher>,
    cache: &'a dyn Cache<HistoryPosition>,
    store: &'a dyn Store,
    scratch: HashMap<HistoryPosition, Digest>,
    pub mutations: Vec<Mutation>,
    pub audit_path: HashMap<HistoryPosition, Digest>,
}

impl<'a> Interpreter<'a> {
    pub fn new(hasher: Arc<dyn Hasher>, cache: &'a dyn Cache<HistoryPosition>, store: &'a dyn Store) -> Self {
        Interpreter {
            hasher,
            cache,
            store,
            scratch: HashMap::new(),
            mutations: Vec::new(),
            audit_path: HashMap::new(),
        }
    }

    fn read(&self, pos: HistoryPosition) -> Result<Option<Digest>, TreeError> {
        if let Some(d) = self.cache.get(&pos) {
            return Ok(Some(d));
        }
        Ok(self
            .store
            .get(TableId::History, &pos.encode())?
            .map(Digest::from))
    }

    fn get(&self, pos: &HistoryPosition) -> Result<Digest, TreeError> {
        self.scratch
            .get(pos)
            .cloned()
            .ok_or_else(|| TreeError::Invariant(format!("{pos:?} has no computed digest")))
    }

    /// Runs `ops`, returning the digest of `target` once evaluated.
    pub fn run(&mut self, ops: &[Op], target: HistoryPosition) -> Result<Digest, TreeError> {
        self.execute(ops)?;
        self.get(&target)
    }

    /// Runs `ops` purely for their side effects (mutations, audit path
    /// entries) without requiring a final digest to extract.
    pub fn execute(&mut self, ops: &[Op]) -> Result<(), TreeError> {
        for op in ops {
            match op {
                Op::GetCache(pos) => {
                    let digest = self.read(*pos)?.ok_or_else(|| {
                        TreeError::Invariant(format!(
                            "{pos:?} is frozen but missing from cache and store"
                        ))
                    })?;
                    self.scratch.insert(*pos, digest);
                }
                Op::LeafHash(pos, value) => {
                    let digest = self.hasher.hash(&[value.as_bytes()]);
                    self.scratch.insert(*pos, digest);
                }
                Op::InnerHash(pos) => {
                    let (l, r) = pos.children();
                    let ld = self.get(&l)?;
                    let rd = self.get(&r)?;
                    let digest = self.hasher.hash(&[ld.as_bytes(), rd.as_bytes()]);
                    self.scratch.insert(*pos, digest);
                }
                Op::PartialInnerHash(pos) => {
                    let (l, _r) = pos.children();
                    let ld = self.get(&l)?;
                    let digest = self.hasher.hash(&[ld.as_bytes()]);
                    self.scratch.insert(*pos, digest);
                }
                Op::Persist(pos) => {
                    let digest = self.get(pos)?;
                    self.cache.put(*pos, digest.clone());
                    self.mutations.push(Mutation::put(
                        TableId::History,
                        pos.encode().to_vec(),
                        digest.as_bytes().to_vec(),
                    ));
                }
                Op::Collect(pos) => {
                    let digest = self.get(pos)?;
                    self.audit_path.insert(*pos, digest);
                }
            }
        }
        Ok(())
    }
}
