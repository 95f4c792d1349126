//! Revision chain ordering and dispatch.

use super::{Revision, RevisionId};
use crate::config_store::ConfigStore;
use crate::error::{ChainViolation, CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use tracing::{debug, info};
use tribun_store::KvStore;

/// Revisions in the order they must be applied.
pub struct RevisionChain {
    revisions: Vec<Box<dyn Revision>>,
}

/// Result of applying or rolling back part of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionRunResult {
    /// Revisions processed, in processing order.
    pub revisions: Vec<RevisionId>,
    /// Number of keys written or deleted.
    pub key_count: usize,
}

/// Orders revisions into a single chain.
///
/// The root is the only revision without a down revision; every other
/// revision follows exactly the one it names. Discovery order does not
/// matter.
///
/// # Errors
///
/// Returns [`CoreError::RevisionChain`] if ids repeat, there is not
/// exactly one root, a down revision is unknown, two revisions follow the
/// same one, or some revisions cannot be reached from the root.
pub fn order(mut revisions: Vec<Box<dyn Revision>>) -> CoreResult<RevisionChain> {
    // Sorting first makes the reported violation independent of discovery order
    revisions.sort_by(|a, b| a.revision().cmp(b.revision()));

    let sequence = resolve(&revisions)?;
    debug!(revisions = sequence.len(), "revision chain resolved");

    let mut slots: Vec<Option<Box<dyn Revision>>> = revisions.into_iter().map(Some).collect();
    let revisions = sequence
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect();

    Ok(RevisionChain { revisions })
}

/// Returns indices into `revisions` in chain order.
fn resolve(revisions: &[Box<dyn Revision>]) -> Result<Vec<usize>, ChainViolation> {
    if revisions.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(pair) = revisions
        .windows(2)
        .find(|pair| pair[0].revision() == pair[1].revision())
    {
        return Err(ChainViolation::DuplicateId {
            id: pair[0].revision().clone(),
        });
    }

    let roots: Vec<usize> = revisions
        .iter()
        .enumerate()
        .filter(|(_, r)| r.down_revision().is_none())
        .map(|(i, _)| i)
        .collect();
    let root = match roots.as_slice() {
        [] => return Err(ChainViolation::MissingRoot),
        [root] => *root,
        _ => {
            return Err(ChainViolation::MultipleRoots {
                ids: roots
                    .iter()
                    .map(|&i| revisions[i].revision().clone())
                    .collect(),
            })
        }
    };

    let ids: HashSet<&RevisionId> = revisions.iter().map(|r| r.revision()).collect();
    let mut children: BTreeMap<&RevisionId, Vec<usize>> = BTreeMap::new();

    for (index, revision) in revisions.iter().enumerate() {
        let Some(down) = revision.down_revision() else {
            continue;
        };
        if !ids.contains(down) {
            return Err(ChainViolation::DanglingReference {
                id: revision.revision().clone(),
                down_revision: down.clone(),
            });
        }
        children.entry(down).or_default().push(index);
    }

    if let Some((parent, branch)) = children.iter().find(|(_, c)| c.len() > 1) {
        return Err(ChainViolation::Branch {
            parent: (*parent).clone(),
            children: branch
                .iter()
                .map(|&i| revisions[i].revision().clone())
                .collect(),
        });
    }

    let successor: HashMap<&RevisionId, usize> = children
        .into_iter()
        .map(|(parent, c)| (parent, c[0]))
        .collect();

    let mut visited = vec![false; revisions.len()];
    let mut sequence = vec![root];
    visited[root] = true;

    let mut current = root;
    while let Some(&next) = successor.get(revisions[current].revision()) {
        if visited[next] {
            break;
        }
        visited[next] = true;
        sequence.push(next);
        current = next;
    }

    if sequence.len() != revisions.len() {
        return Err(ChainViolation::Orphaned {
            ids: revisions
                .iter()
                .zip(&visited)
                .filter(|(_, seen)| !**seen)
                .map(|(r, _)| r.revision().clone())
                .collect(),
        });
    }

    Ok(sequence)
}

impl RevisionChain {
    /// Returns the number of revisions.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Returns true if the chain holds no revision.
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Iterates over the revisions from root to head.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Revision> {
        self.revisions.iter().map(|r| r.as_ref())
    }

    /// Returns the ids from root to head.
    pub fn ids(&self) -> Vec<RevisionId> {
        self.iter().map(|r| r.revision().clone()).collect()
    }

    /// Returns the root revision.
    pub fn root(&self) -> Option<&dyn Revision> {
        self.revisions.first().map(|r| r.as_ref())
    }

    /// Returns the last revision of the chain.
    pub fn head(&self) -> Option<&dyn Revision> {
        self.revisions.last().map(|r| r.as_ref())
    }

    /// Returns the position of a revision in the chain.
    pub fn position(&self, id: &RevisionId) -> Option<usize> {
        self.revisions.iter().position(|r| r.revision() == id)
    }

    /// Returns a revision by id.
    pub fn get(&self, id: &RevisionId) -> Option<&dyn Revision> {
        self.position(id).map(|i| self.revisions[i].as_ref())
    }

    /// Applies every revision from root to head.
    pub fn upgrade<S: KvStore>(&self, store: &ConfigStore<S>) -> CoreResult<RevisionRunResult> {
        self.apply(store, 0..self.len())
    }

    /// Applies revisions from the root up to and including `target`.
    pub fn upgrade_to<S: KvStore>(
        &self,
        store: &ConfigStore<S>,
        target: &RevisionId,
    ) -> CoreResult<RevisionRunResult> {
        let end = self.require(target)? + 1;
        self.apply(store, 0..end)
    }

    /// Rolls back every revision from head to root.
    pub fn downgrade<S: KvStore>(&self, store: &ConfigStore<S>) -> CoreResult<RevisionRunResult> {
        self.rollback(store, 0..self.len())
    }

    /// Rolls back revisions from the head down to, but excluding, `target`.
    pub fn downgrade_to<S: KvStore>(
        &self,
        store: &ConfigStore<S>,
        target: &RevisionId,
    ) -> CoreResult<RevisionRunResult> {
        let start = self.require(target)? + 1;
        self.rollback(store, start..self.len())
    }

    fn require(&self, id: &RevisionId) -> CoreResult<usize> {
        self.position(id)
            .ok_or_else(|| CoreError::RevisionNotFound { id: id.clone() })
    }

    fn apply<S: KvStore>(
        &self,
        store: &ConfigStore<S>,
        range: Range<usize>,
    ) -> CoreResult<RevisionRunResult> {
        let mut result = RevisionRunResult::default();

        for revision in &self.revisions[range] {
            let id = revision.revision();
            let keys = store
                .put(&revision.upgrade())
                .map_err(|e| CoreError::revision_failed(id.clone(), e))?;

            info!(revision = %id, keys = keys.len(), "revision applied");
            result.revisions.push(id.clone());
            result.key_count += keys.len();
        }

        Ok(result)
    }

    fn rollback<S: KvStore>(
        &self,
        store: &ConfigStore<S>,
        range: Range<usize>,
    ) -> CoreResult<RevisionRunResult> {
        let mut result = RevisionRunResult::default();

        for revision in self.revisions[range].iter().rev() {
            let id = revision.revision();
            let keys = store
                .delete(&revision.downgrade())
                .map_err(|e| CoreError::revision_failed(id.clone(), e))?;

            info!(revision = %id, keys = keys.len(), "revision rolled back");
            result.revisions.push(id.clone());
            result.key_count += keys.len();
        }

        Ok(result)
    }
}

impl fmt::Debug for RevisionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionChain")
            .field("revisions", &self.ids())
            .finish()
    }
}
