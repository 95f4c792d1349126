//! In-memory store for testing.

use crate::error::{StoreError, StoreResult, STATUS_CONFLICT, STATUS_TOO_LARGE};
use crate::store::KvStore;
use crate::txn::{
    decode_value, encode_value, missing_key_message, KvPair, TxnError, TxnOp, TxnResponse,
    TxnResult, Verb, MAX_OPERATIONS_IN_TXN,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An in-memory key/value store with the store's transaction semantics.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Dry runs of revision chains
///
/// Transactions are applied to a copy of the data and swapped in only when
/// every operation succeeded, so a failed transaction leaves no trace.
///
/// # Example
///
/// ```rust
/// use tribun_store::{InMemoryStore, KvStore, TxnOp};
///
/// let store = InMemoryStore::new();
/// store.txn(&[TxnOp::set("app/name", "tribun")]).unwrap();
/// assert_eq!(store.get_raw("app/name").as_deref(), Some("tribun"));
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
    max_operations: usize,
    txn_count: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    index: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    /// Base64 encoded value, as received.
    value: String,
    create_index: u64,
    modify_index: u64,
}

impl Entry {
    fn pair(&self, key: &str, with_value: bool) -> KvPair {
        KvPair {
            key: key.to_string(),
            value: with_value.then(|| self.value.clone()),
            flags: 0,
            create_index: self.create_index,
            modify_index: self.modify_index,
        }
    }
}

impl State {
    fn set(&mut self, key: &str, value: String) -> &Entry {
        let index = self.index;
        let create_index = self.entries.get(key).map_or(index, |e| e.create_index);
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                create_index,
                modify_index: index,
            },
        );
        &self.entries[key]
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty store with the default operation limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_operations(MAX_OPERATIONS_IN_TXN)
    }

    /// Creates a new empty store that accepts at most `max` operations per transaction.
    #[must_use]
    pub fn with_max_operations(max: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            max_operations: max,
            txn_count: AtomicUsize::new(0),
        }
    }

    /// Creates a store holding the given plain text entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.put_raw(key.as_ref(), value.as_ref());
        }
        store
    }

    /// Returns the operation limit of this store.
    pub fn max_operations(&self) -> usize {
        self.max_operations
    }

    /// Writes a plain text value outside of any transaction.
    ///
    /// Does not count as a transaction.
    pub fn put_raw(&self, key: &str, value: &str) {
        let mut state = self.state.write();
        state.index += 1;
        state.set(key, encode_value(value));
    }

    /// Reads a plain text value outside of any transaction.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let state = self.state.read();
        state
            .entries
            .get(key)
            .and_then(|e| decode_value(&e.value).ok())
    }

    /// Returns true if the key is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().entries.contains_key(key)
    }

    /// Returns all stored keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.state.read().entries.keys().cloned().collect()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.state.write().entries.clear();
    }

    /// Returns the number of transactions submitted so far, failed ones included.
    pub fn txn_count(&self) -> usize {
        self.txn_count.load(Ordering::SeqCst)
    }
}

impl KvStore for InMemoryStore {
    fn txn(&self, ops: &[TxnOp]) -> StoreResult<TxnResponse> {
        self.txn_count.fetch_add(1, Ordering::SeqCst);

        if ops.len() > self.max_operations {
            return Err(StoreError::status(
                STATUS_TOO_LARGE,
                format!(
                    "Transaction contains too many operations ({} > {})",
                    ops.len(),
                    self.max_operations
                ),
            ));
        }

        let mut state = self.state.write();
        let mut working = state.clone();
        working.index += 1;

        let mut results = Vec::new();
        let mut errors = Vec::new();

        for (op_index, op) in ops.iter().enumerate() {
            let key = op.key();
            match op.verb() {
                Verb::Get => match working.entries.get(key) {
                    Some(entry) => results.push(TxnResult {
                        kv: Some(entry.pair(key, true)),
                    }),
                    None => errors.push(TxnError {
                        op_index,
                        what: missing_key_message(key),
                    }),
                },
                Verb::Set => {
                    let value = op.kv.value.clone().unwrap_or_default();
                    if STANDARD.decode(value.as_bytes()).is_err() {
                        return Err(StoreError::status(
                            400,
                            format!("failed to parse value of key {key:?}: not base64"),
                        ));
                    }
                    let entry = working.set(key, value);
                    results.push(TxnResult {
                        kv: Some(entry.pair(key, false)),
                    });
                }
                Verb::Delete => {
                    working.entries.remove(key);
                }
                Verb::DeleteTree => {
                    // Prefix match, not path-segment match
                    working.entries.retain(|k, _| !k.starts_with(key));
                }
            }
        }

        if !errors.is_empty() {
            let body = serde_json::to_string(&TxnResponse::failure(errors))?;
            return Err(StoreError::status(STATUS_CONFLICT, body));
        }

        *state = working;
        Ok(TxnResponse::success(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.max_operations(), MAX_OPERATIONS_IN_TXN);
        assert_eq!(store.txn_count(), 0);
    }

    #[test]
    fn clear_keeps_the_transaction_count() {
        let store = InMemoryStore::with_entries([("a", "1"), ("b", "2")]);
        store.txn(&[TxnOp::get("a")]).unwrap();

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.txn_count(), 1);
    }

    #[test]
    fn set_then_get() {
        let store = InMemoryStore::new();
        store
            .txn(&[TxnOp::set("a", "1"), TxnOp::set("b", "2")])
            .unwrap();

        let response = store.txn(&[TxnOp::get("b"), TxnOp::get("a")]).unwrap();
        let pairs: Vec<_> = response.pairs().collect();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].key, "b");
        assert_eq!(pairs[0].value.as_deref(), Some(encode_value("2").as_str()));
        assert_eq!(pairs[1].key, "a");
        assert_eq!(store.txn_count(), 2);
    }

    #[test]
    fn set_results_carry_no_value() {
        let store = InMemoryStore::new();
        let response = store.txn(&[TxnOp::set("a", "1")]).unwrap();

        let pair = response.pairs().next().unwrap();
        assert_eq!(pair.key, "a");
        assert_eq!(pair.value, None);
    }

    #[test]
    fn get_missing_reports_every_absent_key() {
        let store = InMemoryStore::with_entries([("b", "present")]);

        let err = store
            .txn(&[TxnOp::get("a"), TxnOp::get("b"), TxnOp::get("c")])
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(
            err.missing_keys(),
            Some(vec!["a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn failed_transaction_is_rolled_back() {
        let store = InMemoryStore::new();

        let err = store
            .txn(&[TxnOp::set("written", "x"), TxnOp::get("absent")])
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(!store.contains_key("written"));
    }

    #[test]
    fn too_many_operations() {
        let store = InMemoryStore::with_max_operations(2);
        let ops = vec![TxnOp::get("a"), TxnOp::get("b"), TxnOp::get("c")];

        let err = store.txn(&ops).unwrap_err();
        assert!(err.is_too_large());
        assert!(err.to_string().contains("3 > 2"));
    }

    #[test]
    fn delete_and_delete_tree() {
        let store = InMemoryStore::with_entries([
            ("app/a", "1"),
            ("app/b/c", "2"),
            ("app/b/d", "3"),
            ("other", "4"),
        ]);

        let response = store
            .txn(&[TxnOp::delete("app/a"), TxnOp::delete_tree("app/b")])
            .unwrap();

        assert!(response.results().is_empty());
        assert_eq!(store.keys(), vec!["other".to_string()]);
    }

    #[test]
    fn delete_missing_is_noop() {
        let store = InMemoryStore::new();
        assert!(store.txn(&[TxnOp::delete("nothing")]).is_ok());
    }

    #[test]
    fn invalid_base64_rejected() {
        let store = InMemoryStore::new();
        let op: TxnOp = serde_json::from_str(
            r#"{"KV": {"Verb": "set", "Key": "a", "Value": "***"}}"#,
        )
        .unwrap();

        let err = store.txn(&[op]).unwrap_err();
        assert!(matches!(err, StoreError::Status { code: 400, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn overwrite_keeps_create_index() {
        let store = InMemoryStore::new();
        store.txn(&[TxnOp::set("a", "1")]).unwrap();
        store.txn(&[TxnOp::set("a", "2")]).unwrap();

        let response = store.txn(&[TxnOp::get("a")]).unwrap();
        let pair = response.pairs().next().unwrap();
        assert!(pair.create_index < pair.modify_index);
        assert_eq!(store.get_raw("a").as_deref(), Some("2"));
    }
}
