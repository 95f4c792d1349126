//! Property-based test generators using proptest.
//!
//! Provides strategies for generating configuration keys and trees.

use proptest::prelude::*;
use tribun_core::{ConfigurationKey, KeyValue};

/// Strategy for generating a single path segment.
pub fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for generating key paths of one to three segments.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..=3).prop_map(|segments| segments.join("/"))
}

/// Strategy for generating values, empty strings included.
pub fn value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,24}").expect("Invalid regex")
}

/// Strategy for generating a leaf with a value.
pub fn leaf_key_strategy() -> impl Strategy<Value = ConfigurationKey> {
    (path_strategy(), value_strategy()).prop_map(|(key, value)| ConfigurationKey::leaf(key, value))
}

/// Strategy for generating leaves with distinct keys.
///
/// Keys are sorted.
pub fn flat_key_set_strategy(
    size: impl Into<prop::collection::SizeRange>,
) -> impl Strategy<Value = Vec<ConfigurationKey>> {
    prop::collection::btree_map(path_strategy(), value_strategy(), size).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, value)| ConfigurationKey::leaf(key, value))
            .collect()
    })
}

/// Strategy for generating a key tree up to four levels deep.
pub fn key_tree_strategy() -> impl Strategy<Value = ConfigurationKey> {
    let leaf = (segment_strategy(), prop::option::of(value_strategy()))
        .prop_map(|(key, value)| ConfigurationKey::with_value(key, KeyValue::Leaf(value)));

    leaf.prop_recursive(3, 48, 4, |inner| {
        (segment_strategy(), prop::collection::vec(inner, 0..4))
            .prop_map(|(key, children)| ConfigurationKey::tree(key, children))
    })
}

/// Counts the leaves below a key, the key itself when it is a leaf.
pub fn leaf_count(key: &ConfigurationKey) -> usize {
    match key.children() {
        Some(children) => children.iter().map(leaf_count).sum(),
        None => 1,
    }
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribun_core::flatten;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn paths_have_no_empty_segment(path in path_strategy()) {
            prop_assert!(path.split('/').all(|s| !s.is_empty()));
        }

        #[test]
        fn flat_sets_have_distinct_keys(keys in flat_key_set_strategy(0..50)) {
            let mut names: Vec<&str> = keys.iter().map(ConfigurationKey::key).collect();
            names.dedup();
            prop_assert_eq!(names.len(), keys.len());
        }

        #[test]
        fn leaves_flatten_to_themselves(key in leaf_key_strategy()) {
            prop_assert!(key.value().is_some());
            prop_assert_eq!(flatten(std::slice::from_ref(&key)), vec![key]);
        }

        #[test]
        fn flatten_yields_every_leaf(tree in prop::collection::vec(key_tree_strategy(), 0..4)) {
            let flat = flatten(&tree);
            prop_assert_eq!(flat.len(), tree.iter().map(leaf_count).sum::<usize>());
            prop_assert!(flat.iter().all(ConfigurationKey::is_leaf));
        }

        #[test]
        fn flatten_is_idempotent(tree in prop::collection::vec(key_tree_strategy(), 0..4)) {
            let once = flatten(&tree);
            prop_assert_eq!(flatten(&once), once);
        }
    }
}
