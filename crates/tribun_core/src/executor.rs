//! Batched transaction executor.
//!
//! The store caps the number of operations in a transaction. The executor
//! splits flat key lists into chunks below that cap, submits one
//! transaction per chunk, strictly in order, and concatenates the results.
//!
//! ## Guarantees
//!
//! - Each chunk is atomic; the whole call is not. When chunk `k` fails,
//!   chunks before it stay applied
//! - One round trip per chunk, two when a read must be retried without
//!   absent keys
//! - Nothing is cached between calls
//!
//! Inputs are expected to be flat, see [`crate::flatten`].

use crate::config::ExecutorConfig;
use crate::error::{CoreError, CoreResult};
use crate::key::ConfigurationKey;
use std::collections::HashSet;
use tracing::{debug, error, warn};
use tribun_store::{KvStore, TxnOp, TxnResponse, Verb};

/// Executes get/set/delete operations in store-sized transactions.
pub struct BatchExecutor<S> {
    store: S,
    config: ExecutorConfig,
}

impl<S: KvStore> BatchExecutor<S> {
    /// Creates an executor with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ExecutorConfig::default())
    }

    /// Creates an executor with the given configuration.
    pub fn with_config(store: S, config: ExecutorConfig) -> Self {
        Self { store, config }
    }

    /// Returns the store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Reads the given keys.
    ///
    /// Only keys present in the store are returned, with their values. In
    /// strict mode an absent key fails the call instead.
    pub fn multi_get(&self, keys: &[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>> {
        self.read(keys, self.config.strict)
    }

    /// Reads the given keys, failing with [`CoreError::KeyConflict`] if any is absent.
    pub fn multi_get_strict(
        &self,
        keys: &[ConfigurationKey],
    ) -> CoreResult<Vec<ConfigurationKey>> {
        self.read(keys, true)
    }

    /// Reads the given keys, skipping absent ones whatever the configuration.
    pub(crate) fn multi_get_lenient(
        &self,
        keys: &[ConfigurationKey],
    ) -> CoreResult<Vec<ConfigurationKey>> {
        self.read(keys, false)
    }

    /// Writes the given keys and returns them.
    ///
    /// A key without a value is written as the empty string.
    pub fn multi_put(&self, keys: &[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>> {
        self.paginate(keys, Verb::Set, |chunk| {
            let ops: Vec<_> = chunk
                .iter()
                .map(|k| TxnOp::set(k.key(), k.value().unwrap_or_default()))
                .collect();
            self.write(&ops)?;
            Ok(chunk.to_vec())
        })
    }

    /// Deletes the given keys and returns them.
    ///
    /// Keys marked with [`ConfigurationKey::as_tree`] remove their whole subtree.
    pub fn multi_delete(&self, keys: &[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>> {
        self.paginate(keys, Verb::Delete, |chunk| {
            let ops: Vec<_> = chunk
                .iter()
                .map(|k| {
                    if k.is_tree() {
                        TxnOp::delete_tree(k.key())
                    } else {
                        TxnOp::delete(k.key())
                    }
                })
                .collect();
            self.write(&ops)?;
            Ok(chunk.to_vec())
        })
    }

    fn write(&self, ops: &[TxnOp]) -> CoreResult<()> {
        self.submit(ops).map(drop)
    }

    fn read(&self, keys: &[ConfigurationKey], strict: bool) -> CoreResult<Vec<ConfigurationKey>> {
        self.paginate(keys, Verb::Get, |chunk| self.read_chunk(chunk, strict))
    }

    fn paginate<F>(
        &self,
        keys: &[ConfigurationKey],
        verb: Verb,
        mut run: F,
    ) -> CoreResult<Vec<ConfigurationKey>>
    where
        F: FnMut(&[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>>,
    {
        let size = self.config.max_operations.max(1);
        let mut results = Vec::with_capacity(keys.len());

        for (index, chunk) in keys.chunks(size).enumerate() {
            debug!(chunk = index, ops = chunk.len(), %verb, "submitting transaction");
            results.extend(run(chunk)?);
        }

        Ok(results)
    }

    fn read_chunk(
        &self,
        chunk: &[ConfigurationKey],
        strict: bool,
    ) -> CoreResult<Vec<ConfigurationKey>> {
        let conflict = match self.submit(&get_ops(chunk.iter())) {
            Ok(response) => return decode(&response),
            Err(CoreError::Store(err)) if err.is_conflict() => err,
            Err(e) => return Err(e),
        };

        // A conflict that does not name absent keys is not ours to recover from
        let Some(missing) = conflict.missing_keys().filter(|keys| !keys.is_empty()) else {
            return Err(conflict.into());
        };

        if strict {
            return Err(CoreError::KeyConflict { keys: missing });
        }

        let absent: HashSet<&str> = missing.iter().map(String::as_str).collect();
        let remaining: Vec<&ConfigurationKey> = chunk
            .iter()
            .filter(|k| !absent.contains(k.key()))
            .collect();

        if remaining.is_empty() {
            debug!(ops = chunk.len(), "no key of the chunk exists");
            return Ok(Vec::new());
        }

        warn!(
            missing = missing.len(),
            remaining = remaining.len(),
            "keys absent, retrying without them"
        );

        match self.submit(&get_ops(remaining.into_iter())) {
            Ok(response) => decode(&response),
            Err(CoreError::Store(err)) if err.is_conflict() => {
                match err.missing_keys().filter(|keys| !keys.is_empty()) {
                    Some(keys) => Err(CoreError::KeyConflict { keys }),
                    None => Err(err.into()),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn submit(&self, ops: &[TxnOp]) -> CoreResult<TxnResponse> {
        self.store.txn(ops).map_err(|err| {
            if err.is_too_large() {
                error!(
                    count = ops.len(),
                    limit = self.config.max_operations,
                    "store rejected transaction as too large"
                );
                CoreError::TransactionTooLarge {
                    count: ops.len(),
                    limit: self.config.max_operations,
                }
            } else {
                CoreError::Store(err)
            }
        })
    }
}

fn get_ops<'a>(keys: impl Iterator<Item = &'a ConfigurationKey>) -> Vec<TxnOp> {
    keys.map(|k| TxnOp::get(k.key())).collect()
}

fn decode(response: &TxnResponse) -> CoreResult<Vec<ConfigurationKey>> {
    response
        .pairs()
        .map(|kv| {
            ConfigurationKey::from_b64(kv.key.clone(), kv.value.as_deref()).map_err(CoreError::from)
        })
        .collect()
}
