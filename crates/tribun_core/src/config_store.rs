//! Guarded configuration access.
//!
//! [`ConfigStore`] is the entry point for callers holding key trees. It
//! flattens them and hands the leaves to a [`BatchExecutor`].
//!
//! Writes are guarded: a key that is not marked alterable may only be
//! created, never overwritten. The check covers every key of the call
//! before anything is written, so a rejected put writes nothing.

use crate::config::ExecutorConfig;
use crate::error::{CoreError, CoreResult};
use crate::executor::BatchExecutor;
use crate::key::{flatten, ConfigurationKey};
use tracing::{debug, warn};
use tribun_store::KvStore;

/// Reads and writes configuration trees through a store handle.
///
/// The handle is created once by the caller and reused for every call.
pub struct ConfigStore<S> {
    executor: BatchExecutor<S>,
}

impl<S: KvStore> ConfigStore<S> {
    /// Creates a configuration store with the default executor configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ExecutorConfig::default())
    }

    /// Creates a configuration store with the given executor configuration.
    pub fn with_config(store: S, config: ExecutorConfig) -> Self {
        Self {
            executor: BatchExecutor::with_config(store, config),
        }
    }

    /// Returns the underlying executor.
    pub fn executor(&self) -> &BatchExecutor<S> {
        &self.executor
    }

    /// Returns the store handle.
    pub fn store(&self) -> &S {
        self.executor.store()
    }

    /// Writes key trees and returns the flattened keys.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnmodifiableKeys`] without writing anything if
    /// a non-alterable key already has a value.
    pub fn put(&self, keys: &[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>> {
        let full_keys = flatten(keys);

        let guarded: Vec<ConfigurationKey> = full_keys
            .iter()
            .filter(|k| !k.is_alterable())
            .cloned()
            .collect();

        if !guarded.is_empty() {
            // Absent keys are the expected case here, even for a strict executor
            let existing = self.executor.multi_get_lenient(&guarded)?;
            if !existing.is_empty() {
                let keys: Vec<String> = existing.iter().map(|k| k.key().to_string()).collect();
                warn!(count = keys.len(), "refusing to overwrite non-alterable keys");
                return Err(CoreError::UnmodifiableKeys { keys });
            }
        }

        debug!(keys = full_keys.len(), "writing keys");
        self.executor.multi_put(&full_keys)
    }

    /// Reads key trees and returns the stored leaves.
    pub fn get(&self, keys: &[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>> {
        self.executor.multi_get(&flatten(keys))
    }

    /// Deletes key trees and returns the flattened keys.
    pub fn delete(&self, keys: &[ConfigurationKey]) -> CoreResult<Vec<ConfigurationKey>> {
        self.executor.multi_delete(&flatten(keys))
    }
}
