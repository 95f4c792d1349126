//! Store trait definition.

use crate::error::StoreResult;
use crate::txn::{TxnOp, TxnResponse};
use std::sync::Arc;

/// A key/value store that executes atomic multi-key transactions.
///
/// The store is a black box: it receives an ordered list of operations and
/// either applies all of them or none.
///
/// # Contract
///
/// - At most [`crate::MAX_OPERATIONS_IN_TXN`] operations per call; beyond
///   that the store fails with status 413
/// - A `get` on an absent key fails the whole transaction with status 409;
///   the body lists every absent key
/// - Success returns one result per operation that produces one, in
///   request order
///
/// Implementations must be `Send + Sync` so a single handle can be reused
/// for the lifetime of the process.
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and dry runs
/// - [`super::HttpStore`] - For a store reachable over HTTP
pub trait KvStore: Send + Sync {
    /// Submits one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Status`] when the store rejects the
    /// transaction, or a transport/decoding error.
    fn txn(&self, ops: &[TxnOp]) -> StoreResult<TxnResponse>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn txn(&self, ops: &[TxnOp]) -> StoreResult<TxnResponse> {
        (**self).txn(ops)
    }
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn txn(&self, ops: &[TxnOp]) -> StoreResult<TxnResponse> {
        (**self).txn(ops)
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn txn(&self, ops: &[TxnOp]) -> StoreResult<TxnResponse> {
        (**self).txn(ops)
    }
}
