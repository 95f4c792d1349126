//! Transaction wire model.
//!
//! A transaction is an ordered list of key operations submitted to the
//! store as one atomic call. The JSON shapes here follow the store's
//! `/v1/txn` endpoint:
//!
//! ```text
//! request:  [{"KV": {"Verb": "set", "Key": "a/b", "Value": "<base64>"}}, ...]
//! success:  {"Results": [{"KV": {"Key": "a/b", "Value": "<base64>", ...}}], "Errors": null}
//! conflict: {"Results": null, "Errors": [{"OpIndex": 0, "What": "key \"a/b\" doesn't exist"}]}
//! ```

use crate::error::{StoreError, StoreResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Maximum number of operations the store accepts in a single transaction.
pub const MAX_OPERATIONS_IN_TXN: usize = 64;

static MISSING_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"key "(.+)" doesn't exist"#).expect("valid pattern"));

/// Verb of a key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verb {
    /// Read a single key. Fails the transaction if the key is absent.
    Get,
    /// Write a single key.
    Set,
    /// Remove a single key.
    Delete,
    /// Remove a key and every key below it.
    DeleteTree,
}

impl Verb {
    /// Returns the wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Set => "set",
            Verb::Delete => "delete",
            Verb::DeleteTree => "delete-tree",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation of a transaction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnOp {
    /// The key/value operation.
    #[serde(rename = "KV")]
    pub kv: KvOp,
}

/// A key/value operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvOp {
    /// What to do.
    pub verb: Verb,
    /// Target key.
    pub key: String,
    /// Base64 encoded value, for `set`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TxnOp {
    fn new(verb: Verb, key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            kv: KvOp {
                verb,
                key: key.into(),
                value,
            },
        }
    }

    /// Creates a `get` operation.
    pub fn get(key: impl Into<String>) -> Self {
        Self::new(Verb::Get, key, None)
    }

    /// Creates a `set` operation; the plain text value is base64 encoded.
    pub fn set(key: impl Into<String>, value: &str) -> Self {
        Self::new(Verb::Set, key, Some(encode_value(value)))
    }

    /// Creates a `delete` operation.
    pub fn delete(key: impl Into<String>) -> Self {
        Self::new(Verb::Delete, key, None)
    }

    /// Creates a `delete-tree` operation.
    pub fn delete_tree(key: impl Into<String>) -> Self {
        Self::new(Verb::DeleteTree, key, None)
    }

    /// Returns the verb of this operation.
    pub fn verb(&self) -> Verb {
        self.kv.verb
    }

    /// Returns the key of this operation.
    pub fn key(&self) -> &str {
        &self.kv.key
    }
}

/// A stored key/value pair as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvPair {
    /// Full key path.
    pub key: String,
    /// Base64 encoded value; `None` for write results.
    #[serde(default)]
    pub value: Option<String>,
    /// Opaque client flags.
    #[serde(default)]
    pub flags: u64,
    /// Index at which the key was created.
    #[serde(default)]
    pub create_index: u64,
    /// Index at which the key was last modified.
    #[serde(default)]
    pub modify_index: u64,
}

/// One entry of the `Results` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnResult {
    /// The key/value result, if the operation produced one.
    #[serde(rename = "KV", default, skip_serializing_if = "Option::is_none")]
    pub kv: Option<KvPair>,
}

/// One entry of the `Errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TxnError {
    /// Index of the failing operation in the request.
    #[serde(default)]
    pub op_index: usize,
    /// Human-readable failure message.
    pub what: String,
}

/// Body of a transaction response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TxnResponse {
    /// Results, in request order, for operations that produce one.
    #[serde(default)]
    pub results: Option<Vec<TxnResult>>,
    /// Errors, when the transaction was rolled back.
    #[serde(default)]
    pub errors: Option<Vec<TxnError>>,
}

impl TxnResponse {
    /// Creates a successful response.
    pub fn success(results: Vec<TxnResult>) -> Self {
        Self {
            results: Some(results),
            errors: None,
        }
    }

    /// Creates a failed response.
    pub fn failure(errors: Vec<TxnError>) -> Self {
        Self {
            results: None,
            errors: Some(errors),
        }
    }

    /// Returns the results, or an empty slice.
    pub fn results(&self) -> &[TxnResult] {
        self.results.as_deref().unwrap_or_default()
    }

    /// Returns the errors, or an empty slice.
    pub fn errors(&self) -> &[TxnError] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// Iterates over the key/value pairs carried by the results.
    pub fn pairs(&self) -> impl Iterator<Item = &KvPair> {
        self.results().iter().filter_map(|r| r.kv.as_ref())
    }
}

/// Formats the message the store uses for a `get` on an absent key.
pub fn missing_key_message(key: &str) -> String {
    format!("key \"{key}\" doesn't exist")
}

/// Extracts the absent keys from the body of a conflict response.
///
/// Errors whose message does not name a missing key are ignored.
pub fn missing_keys(body: &str) -> StoreResult<Vec<String>> {
    let response: TxnResponse = serde_json::from_str(body)?;
    Ok(response
        .errors()
        .iter()
        .filter_map(|e| MISSING_KEY_PATTERN.captures(&e.what))
        .map(|c| c[1].to_string())
        .collect())
}

/// Encodes a plain text value the way the store expects it.
pub fn encode_value(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decodes a base64 value returned by the store into plain text.
pub fn decode_value(encoded: &str) -> StoreResult<String> {
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}
