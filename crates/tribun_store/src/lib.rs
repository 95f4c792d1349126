//! # Tribun Store
//!
//! Transaction wire model and store clients for Tribun.
//!
//! This crate is the lowest layer of Tribun. It knows how to talk to a
//! key/value store that executes atomic multi-key transactions, and nothing
//! about configuration trees or revisions.
//!
//! ## Design Principles
//!
//! - A store is a black box exposing one call: submit a transaction
//! - Values travel base64 encoded; callers only see plain text after decoding
//! - Store-level failures are surfaced as status codes with the raw body
//! - Stores must be `Send + Sync` so one handle serves the whole process
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and dry runs
//! - [`HttpStore`] - For a store agent reachable over HTTP
//!
//! ## Example
//!
//! ```rust
//! use tribun_store::{InMemoryStore, KvStore, TxnOp};
//!
//! let store = InMemoryStore::new();
//! store.txn(&[TxnOp::set("app/name", "tribun")]).unwrap();
//!
//! let err = store.txn(&[TxnOp::get("app/missing")]).unwrap_err();
//! assert_eq!(err.missing_keys(), Some(vec!["app/missing".to_string()]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod memory;
mod store;
pub mod txn;

pub use config::{StoreConfig, DEFAULT_ADDRESS};
pub use error::{StoreError, StoreResult, STATUS_CONFLICT, STATUS_TOO_LARGE};
pub use http::{HttpClient, HttpResponse, HttpStore, LoopbackClient, LoopbackServer, TOKEN_HEADER};
pub use memory::InMemoryStore;
pub use store::KvStore;
pub use txn::{
    decode_value, encode_value, KvPair, TxnError, TxnOp, TxnResponse, TxnResult, Verb,
    MAX_OPERATIONS_IN_TXN,
};
