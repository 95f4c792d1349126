//! Configuration key trees.
//!
//! A [`ConfigurationKey`] is either a leaf holding a single string value or
//! a subtree holding an ordered list of child keys. A subtree's key is the
//! namespace of its children, so
//!
//! ```text
//! tribun/tests
//! └── nested
//!     ├── test   = "magnifique"
//!     └── test_2 = "bagarre"
//! ```
//!
//! flattens into the leaves `tribun/tests/nested/test` and
//! `tribun/tests/nested/test_2`.
//!
//! Equality and hashing are structural: two keys are equal when their paths,
//! flags and values are equal, children compared element by element in
//! order.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use tribun_store::{decode_value, StoreResult};

/// Value of a configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Child keys, namespaced under the parent key.
    Tree(Vec<ConfigurationKey>),
    /// A plain text value, possibly absent.
    Leaf(Option<String>),
}

impl Default for KeyValue {
    fn default() -> Self {
        KeyValue::Leaf(None)
    }
}

/// A node of a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KeyRecord")]
pub struct ConfigurationKey {
    key: String,
    value: KeyValue,
    /// Whether a put may overwrite an existing value.
    #[serde(skip_serializing_if = "is_false")]
    alterable: bool,
    /// Whether a delete removes everything below the key.
    #[serde(skip_serializing_if = "is_false")]
    is_tree: bool,
}

/// Serialized form of a [`ConfigurationKey`], checked on conversion.
#[derive(Deserialize)]
struct KeyRecord {
    key: String,
    #[serde(default)]
    value: KeyValue,
    #[serde(default)]
    alterable: bool,
    #[serde(default)]
    is_tree: bool,
}

impl TryFrom<KeyRecord> for ConfigurationKey {
    type Error = CoreError;

    fn try_from(record: KeyRecord) -> Result<Self, Self::Error> {
        if record.key.is_empty() {
            return Err(CoreError::EmptyKey);
        }
        Ok(Self {
            key: record.key,
            value: record.value,
            alterable: record.alterable,
            is_tree: record.is_tree,
        })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ConfigurationKey {
    /// Creates a leaf key.
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_value(key, KeyValue::Leaf(Some(value.into())))
    }

    /// Creates a leaf key without a value.
    pub fn empty(key: impl Into<String>) -> Self {
        Self::with_value(key, KeyValue::Leaf(None))
    }

    /// Creates a subtree.
    pub fn tree(key: impl Into<String>, children: Vec<ConfigurationKey>) -> Self {
        Self::with_value(key, KeyValue::Tree(children))
    }

    /// Creates a key from any value.
    pub fn with_value(key: impl Into<String>, value: KeyValue) -> Self {
        Self {
            key: key.into(),
            value,
            alterable: false,
            is_tree: false,
        }
    }

    /// Creates a leaf key from a base64 value as returned by the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not base64 encoded UTF-8.
    pub fn from_b64(key: impl Into<String>, encoded: Option<&str>) -> StoreResult<Self> {
        let value = encoded.map(decode_value).transpose()?;
        Ok(Self::with_value(key, KeyValue::Leaf(value)))
    }

    /// Marks the key as alterable.
    #[must_use]
    pub fn alterable(mut self) -> Self {
        self.alterable = true;
        self
    }

    /// Marks the key for subtree deletion.
    #[must_use]
    pub fn as_tree(mut self) -> Self {
        self.is_tree = true;
        self
    }

    /// Returns the key path.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the raw value.
    pub fn raw_value(&self) -> &KeyValue {
        &self.value
    }

    /// Returns the leaf value, if this is a leaf holding one.
    pub fn value(&self) -> Option<&str> {
        match &self.value {
            KeyValue::Leaf(value) => value.as_deref(),
            KeyValue::Tree(_) => None,
        }
    }

    /// Returns the children, if this is a subtree.
    pub fn children(&self) -> Option<&[ConfigurationKey]> {
        match &self.value {
            KeyValue::Tree(children) => Some(children),
            KeyValue::Leaf(_) => None,
        }
    }

    /// Returns true if this key holds a value rather than children.
    pub fn is_leaf(&self) -> bool {
        matches!(self.value, KeyValue::Leaf(_))
    }

    /// Returns true if a put may overwrite an existing value.
    pub fn is_alterable(&self) -> bool {
        self.alterable
    }

    /// Returns true if a delete removes everything below the key.
    pub fn is_tree(&self) -> bool {
        self.is_tree
    }

    /// Returns a copy whose key is prefixed with `namespace`.
    ///
    /// An empty namespace leaves the key unchanged.
    #[must_use]
    pub fn with_namespace(&self, namespace: &str) -> Self {
        Self {
            key: join_path(namespace, &self.key),
            ..self.clone()
        }
    }
}

fn join_path(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{namespace}/{key}")
    }
}

/// Flattens key trees into fully qualified leaves.
///
/// Traversal is depth first with children in declaration order. Leaves keep
/// their value and flags; subtrees contribute only their leaves. The input
/// is left untouched.
pub fn flatten(nodes: &[ConfigurationKey]) -> Vec<ConfigurationKey> {
    let mut leaves = Vec::new();
    for node in nodes {
        collect(node, "", &mut leaves);
    }
    leaves
}

fn collect(node: &ConfigurationKey, namespace: &str, leaves: &mut Vec<ConfigurationKey>) {
    match &node.value {
        KeyValue::Tree(children) => {
            let namespace = join_path(namespace, &node.key);
            for child in children {
                collect(child, &namespace, leaves);
            }
        }
        KeyValue::Leaf(_) => leaves.push(node.with_namespace(namespace)),
    }
}
