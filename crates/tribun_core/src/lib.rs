//! # Tribun Core
//!
//! Configuration management on top of a transactional key/value store.
//!
//! This crate provides:
//! - Configuration key trees and their flattening into store keys
//! - A batched executor splitting key lists into store-sized transactions
//! - Guarded writes that never overwrite non-alterable keys
//! - Revision chains applying configuration changes in order
//!
//! ## Example
//!
//! ```rust
//! use tribun_core::{ConfigStore, ConfigurationKey};
//! use tribun_store::InMemoryStore;
//!
//! let config = ConfigStore::new(InMemoryStore::new());
//! let tree = vec![ConfigurationKey::tree(
//!     "app",
//!     vec![ConfigurationKey::leaf("name", "tribun")],
//! )];
//!
//! config.put(&tree).unwrap();
//! let stored = config.get(&tree).unwrap();
//! assert_eq!(stored[0].key(), "app/name");
//! assert_eq!(stored[0].value(), Some("tribun"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod config_store;
mod error;
mod executor;
mod key;
pub mod revision;

pub use config::ExecutorConfig;
pub use config_store::ConfigStore;
pub use error::{ChainViolation, CoreError, CoreResult};
pub use executor::BatchExecutor;
pub use key::{flatten, ConfigurationKey, KeyValue};
pub use revision::{
    discover, order, DirectorySource, Revision, RevisionChain, RevisionDefinition, RevisionId,
    RevisionRunResult, RevisionSource, StaticSource,
};

/// Version of the Tribun crates.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
