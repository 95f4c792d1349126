//! Error types for Tribun core.

use crate::revision::RevisionId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Tribun core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] tribun_store::StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A transaction exceeded the store's operation limit.
    ///
    /// Chunking guarantees this never happens against a correctly
    /// configured store; it is never retried.
    #[error("too many keys in transaction ({count} > {limit})")]
    TransactionTooLarge {
        /// Operations sent.
        count: usize,
        /// Operations the executor was configured to send at most.
        limit: usize,
    },

    /// Keys expected to exist are absent.
    #[error("keys do not exist: {}", .keys.join(", "))]
    KeyConflict {
        /// The absent keys.
        keys: Vec<String>,
    },

    /// A configuration key has an empty path.
    #[error("configuration key path is empty")]
    EmptyKey,

    /// A guarded put found existing values for non-alterable keys.
    #[error("keys could not be modified: {}", .keys.join(", "))]
    UnmodifiableKeys {
        /// The existing non-alterable keys.
        keys: Vec<String>,
    },

    /// The revisions do not form a single linear chain.
    #[error("invalid revision chain: {0}")]
    RevisionChain(#[from] ChainViolation),

    /// A revision id does not follow the naming convention.
    #[error("invalid revision id {id:?}: expected {len} ASCII alphanumeric characters", len = RevisionId::LEN)]
    InvalidRevisionId {
        /// The rejected id.
        id: String,
    },

    /// A revision definition could not be loaded.
    #[error("cannot load revision {}: {message}", .path.display())]
    RevisionLoad {
        /// File holding the definition.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A revision is not part of the chain.
    #[error("revision {id} not found")]
    RevisionNotFound {
        /// The unknown id.
        id: RevisionId,
    },

    /// Applying or rolling back a revision failed.
    #[error("revision {id} failed: {source}")]
    RevisionFailed {
        /// The failing revision.
        id: RevisionId,
        /// Underlying error.
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates a revision load error.
    pub fn revision_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RevisionLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wraps an error raised while running a revision.
    pub fn revision_failed(id: RevisionId, source: CoreError) -> Self {
        Self::RevisionFailed {
            id,
            source: Box::new(source),
        }
    }
}

/// A broken revision chain invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    /// No revision lacks a down revision.
    #[error("no root revision")]
    MissingRoot,

    /// More than one revision lacks a down revision.
    #[error("multiple root revisions: {}", join_ids(.ids))]
    MultipleRoots {
        /// The roots, sorted.
        ids: Vec<RevisionId>,
    },

    /// Two revisions declare the same id.
    #[error("duplicate revision id {id}")]
    DuplicateId {
        /// The repeated id.
        id: RevisionId,
    },

    /// A down revision names an id that is not in the set.
    #[error("revision {id} has unknown down revision {down_revision}")]
    DanglingReference {
        /// The referencing revision.
        id: RevisionId,
        /// The unknown id it points to.
        down_revision: RevisionId,
    },

    /// Several revisions declare the same down revision.
    #[error("revisions {} all follow {parent}", join_ids(.children))]
    Branch {
        /// The shared down revision.
        parent: RevisionId,
        /// The revisions following it, sorted.
        children: Vec<RevisionId>,
    },

    /// Revisions not reachable from the root, which means they form a cycle.
    #[error("revisions unreachable from the root (cycle): {}", join_ids(.ids))]
    Orphaned {
        /// The unreachable revisions, sorted.
        ids: Vec<RevisionId>,
    },
}

fn join_ids(ids: &[RevisionId]) -> String {
    ids.iter()
        .map(RevisionId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RevisionId {
        RevisionId::parse(s).unwrap()
    }

    #[test]
    fn error_display() {
        let err = CoreError::TransactionTooLarge {
            count: 65,
            limit: 64,
        };
        assert_eq!(err.to_string(), "too many keys in transaction (65 > 64)");

        let err = CoreError::UnmodifiableKeys {
            keys: vec!["a/b".into(), "a/c".into()],
        };
        assert_eq!(err.to_string(), "keys could not be modified: a/b, a/c");
    }

    #[test]
    fn chain_violation_display() {
        let err = CoreError::from(ChainViolation::MultipleRoots {
            ids: vec![id("aaaa1111"), id("bbbb2222")],
        });
        assert_eq!(
            err.to_string(),
            "invalid revision chain: multiple root revisions: aaaa1111, bbbb2222"
        );

        let err = ChainViolation::DanglingReference {
            id: id("aaaa1111"),
            down_revision: id("zzzz9999"),
        };
        assert!(err.to_string().contains("zzzz9999"));
    }

    #[test]
    fn revision_failed_keeps_source() {
        use std::error::Error;

        let err = CoreError::revision_failed(
            id("aaaa1111"),
            CoreError::KeyConflict {
                keys: vec!["x".into()],
            },
        );
        assert!(err.to_string().starts_with("revision aaaa1111 failed"));
        assert!(err.source().is_some());
    }
}
