//! # Tribun Testkit
//!
//! Test utilities for Tribun.
//!
//! This crate provides:
//! - Key sets and trees shared by the test suites
//! - An in-memory store bundled with a configuration store
//! - Temporary revision directories
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tribun_testkit::prelude::*;
//!
//! #[test]
//! fn put_large_set() {
//!     let store = TestStore::new();
//!     store.config.put(&large_key_set(LARGE_SET_SIZE)).unwrap();
//!     assert_eq!(store.memory().len(), LARGE_SET_SIZE);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
