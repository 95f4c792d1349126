//! Configuration revisions.
//!
//! Revisions express configuration changes the way schema migrations
//! express database changes. Each revision names the revision it must be
//! applied after, so a set of revisions forms a single chain from a root.
//!
//! ## Design
//!
//! Revisions are:
//! - **Stateless**: definitions only, nothing records which ones were applied
//! - **Pluggable**: any [`RevisionSource`] can provide them, a directory of
//!   JSON files or a registry compiled into the binary
//! - **Validated**: [`order`] refuses anything but one linear chain
//! - **Reversible**: upgrade keys are put, downgrade keys are deleted
//!
//! ## Usage
//!
//! ```ignore
//! use tribun_core::revision::{discover, order};
//! use tribun_core::ConfigStore;
//!
//! let chain = order(discover("revisions.d")?)?;
//! chain.upgrade(&ConfigStore::new(store))?;
//! ```

mod chain;
mod source;

pub use chain::{order, RevisionChain, RevisionRunResult};
pub use source::{
    discover, parse_file_name, DirectorySource, RevisionFile, RevisionSource, StaticSource,
};

use crate::error::{CoreError, CoreResult};
use crate::key::ConfigurationKey;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a revision: 8 ASCII alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevisionId(String);

impl RevisionId {
    /// Length of every revision id.
    pub const LEN: usize = 8;

    /// Parses a revision id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRevisionId`] unless `id` is exactly
    /// [`Self::LEN`] ASCII alphanumeric characters.
    pub fn parse(id: &str) -> CoreResult<Self> {
        if id.len() == Self::LEN && id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(id.to_string()))
        } else {
            Err(CoreError::InvalidRevisionId { id: id.to_string() })
        }
    }

    /// Generates a random lowercase revision id.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RevisionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RevisionId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RevisionId> for String {
    fn from(id: RevisionId) -> Self {
        id.0
    }
}

/// Trait for defining revisions.
pub trait Revision: fmt::Debug + Send + Sync {
    /// Returns the id of this revision.
    fn revision(&self) -> &RevisionId;

    /// Returns the id of the revision this one follows, `None` for the root.
    fn down_revision(&self) -> Option<&RevisionId>;

    /// Returns a human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Returns the keys this revision puts when applied.
    fn upgrade(&self) -> Vec<ConfigurationKey>;

    /// Returns the keys this revision deletes when rolled back.
    fn downgrade(&self) -> Vec<ConfigurationKey>;
}

/// A revision defined by data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionDefinition {
    id: RevisionId,
    down_revision: Option<RevisionId>,
    description: String,
    upgrade: Vec<ConfigurationKey>,
    downgrade: Vec<ConfigurationKey>,
}

impl RevisionDefinition {
    /// Creates a revision with no keys.
    pub fn new(id: RevisionId, down_revision: Option<RevisionId>) -> Self {
        Self {
            id,
            down_revision,
            description: String::new(),
            upgrade: Vec::new(),
            downgrade: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the keys put on upgrade.
    #[must_use]
    pub fn with_upgrade(mut self, keys: Vec<ConfigurationKey>) -> Self {
        self.upgrade = keys;
        self
    }

    /// Sets the keys deleted on downgrade.
    #[must_use]
    pub fn with_downgrade(mut self, keys: Vec<ConfigurationKey>) -> Self {
        self.downgrade = keys;
        self
    }
}

impl Revision for RevisionDefinition {
    fn revision(&self) -> &RevisionId {
        &self.id
    }

    fn down_revision(&self) -> Option<&RevisionId> {
        self.down_revision.as_ref()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn upgrade(&self) -> Vec<ConfigurationKey> {
        self.upgrade.clone()
    }

    fn downgrade(&self) -> Vec<ConfigurationKey> {
        self.downgrade.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_ids() {
        assert_eq!(RevisionId::parse("hgsqa54a").unwrap().as_str(), "hgsqa54a");
        assert!("ABCD1234".parse::<RevisionId>().is_ok());
    }

    #[test]
    fn parse_rejects_invalid_ids() {
        for bad in ["", "short", "toolong123", "abc_1234", "abcd-123", "abcdéfgh"] {
            assert!(
                matches!(RevisionId::parse(bad), Err(CoreError::InvalidRevisionId { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn generated_ids_are_valid() {
        for _ in 0..100 {
            let id = RevisionId::generate();
            assert!(RevisionId::parse(id.as_str()).is_ok());
            assert_eq!(id.as_str(), id.as_str().to_ascii_lowercase());
        }
    }

    #[test]
    fn serde_validates_ids() {
        let id: RevisionId = serde_json::from_str(r#""aaaa1111""#).unwrap();
        assert_eq!(id.to_string(), "aaaa1111");
        assert!(serde_json::from_str::<RevisionId>(r#""nope""#).is_err());
    }

    #[test]
    fn definition_builder() {
        let rev = RevisionDefinition::new(RevisionId::parse("aaaa1111").unwrap(), None)
            .with_description("first")
            .with_upgrade(vec![ConfigurationKey::leaf("a", "1")])
            .with_downgrade(vec![ConfigurationKey::empty("a")]);

        assert_eq!(rev.revision().as_str(), "aaaa1111");
        assert!(rev.down_revision().is_none());
        assert_eq!(rev.description(), "first");
        assert_eq!(rev.upgrade().len(), 1);
        assert_eq!(rev.downgrade()[0].key(), "a");
    }

    #[test]
    fn boxed_revisions_are_debuggable() {
        let boxed: Box<dyn Revision> =
            Box::new(RevisionDefinition::new(RevisionId::parse("aaaa1111").unwrap(), None));

        let loaded: CoreResult<Vec<Box<dyn Revision>>> = Ok(vec![boxed]);
        assert!(format!("{loaded:?}").contains("aaaa1111"));
    }
}
