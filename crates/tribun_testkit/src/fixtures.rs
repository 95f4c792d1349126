//! Test fixtures and store helpers.
//!
//! Provides the key sets used across the test suites and convenience
//! wrappers for stores and revision directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tribun_core::{ConfigStore, ConfigurationKey, ExecutorConfig, RevisionId};
use tribun_store::InMemoryStore;

/// Size of the key set that needs several transactions.
pub const LARGE_SET_SIZE: usize = 130;

/// Three flat keys under `tribun/test`.
pub fn configuration_keys() -> Vec<ConfigurationKey> {
    vec![
        ConfigurationKey::leaf("tribun/test/a", "a"),
        ConfigurationKey::leaf("tribun/test/b", "b"),
        ConfigurationKey::leaf("tribun/test/c", "c"),
    ]
}

/// `n` flat keys named `tribun/test/a_<i>`.
pub fn large_key_set(n: usize) -> Vec<ConfigurationKey> {
    (0..n)
        .map(|i| ConfigurationKey::leaf(format!("tribun/test/a_{i}"), format!("value-{i}")))
        .collect()
}

/// [`configuration_keys`] followed by a two-level subtree.
///
/// Flattens into five leaves, the last one being
/// `tribun/tests/nested/test_2 = bagarre`.
pub fn nested_keys() -> Vec<ConfigurationKey> {
    let mut keys = configuration_keys();
    keys.push(ConfigurationKey::tree(
        "tribun/tests",
        vec![ConfigurationKey::tree(
            "nested",
            vec![
                ConfigurationKey::leaf("test", "magnifique"),
                ConfigurationKey::leaf("test_2", "bagarre"),
            ],
        )],
    ));
    keys
}

/// An in-memory store with a configuration store on top of it.
pub struct TestStore {
    /// The configuration store.
    pub config: ConfigStore<Arc<InMemoryStore>>,
    memory: Arc<InMemoryStore>,
}

impl TestStore {
    /// Creates an empty store with the default limits.
    pub fn new() -> Self {
        Self::with_store(InMemoryStore::new(), ExecutorConfig::default())
    }

    /// Creates an empty store whose transactions hold at most `max` operations,
    /// with an executor sending at most that many.
    pub fn with_max_operations(max: usize) -> Self {
        Self::with_store(
            InMemoryStore::with_max_operations(max),
            ExecutorConfig::new().max_operations(max),
        )
    }

    /// Wraps an existing store.
    pub fn with_store(store: InMemoryStore, config: ExecutorConfig) -> Self {
        let memory = Arc::new(store);
        Self {
            config: ConfigStore::with_config(Arc::clone(&memory), config),
            memory,
        }
    }

    /// Returns the in-memory store for direct inspection.
    pub fn memory(&self) -> &InMemoryStore {
        &self.memory
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = ConfigStore<Arc<InMemoryStore>>;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

/// A temporary directory of revision files, removed on drop.
pub struct RevisionDir {
    dir: TempDir,
}

impl RevisionDir {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a revision file and returns its path.
    pub fn write(
        &self,
        revision: &str,
        down_revision: Option<&str>,
        upgrade: &[ConfigurationKey],
        downgrade: &[ConfigurationKey],
    ) -> PathBuf {
        let id = RevisionId::parse(revision).expect("Invalid revision id");
        let down = down_revision.map(|d| RevisionId::parse(d).expect("Invalid down revision id"));

        let content = serde_json::json!({
            "revision": id,
            "down_revision": down,
            "upgrade": upgrade,
            "downgrade": downgrade,
        });

        let path = self.path().join(format!("{id}_revision.json"));
        fs::write(&path, content.to_string()).expect("Failed to write revision file");
        path
    }

    /// Writes a revision putting `key = revision` on upgrade and deleting it on downgrade.
    pub fn write_simple(&self, revision: &str, down_revision: Option<&str>, key: &str) -> PathBuf {
        self.write(
            revision,
            down_revision,
            &[ConfigurationKey::leaf(key, revision)],
            &[ConfigurationKey::empty(key)],
        )
    }

    /// Writes a file that is not a revision.
    pub fn write_other(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).expect("Failed to write file");
        path
    }
}

impl Default for RevisionDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribun_core::{discover, flatten, order};

    #[test]
    fn nested_keys_flatten_to_five_leaves() {
        let flat = flatten(&nested_keys());
        assert_eq!(flat.len(), 5);

        let last = flat.last().unwrap();
        assert_eq!(last.key(), "tribun/tests/nested/test_2");
        assert_eq!(last.value(), Some("bagarre"));
    }

    #[test]
    fn test_store_shares_the_memory() {
        let store = TestStore::new();
        store.put(&configuration_keys()).unwrap();
        assert_eq!(store.memory().len(), 3);
        assert_eq!(store.memory().get_raw("tribun/test/b").as_deref(), Some("b"));
    }

    #[test]
    fn revision_dir_is_discoverable() {
        let dir = RevisionDir::new();
        dir.write_simple("aaaa0001", None, "tribun/one");
        dir.write_simple("aaaa0002", Some("aaaa0001"), "tribun/two");
        dir.write_other("notes.txt", "ignored");

        let chain = order(discover(dir.path()).unwrap()).unwrap();
        assert_eq!(chain.len(), 2);
    }
}
