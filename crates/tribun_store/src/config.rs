//! Configuration for store clients.

use crate::error::{StoreError, StoreResult};
use std::time::Duration;

/// Default address of a local store agent.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8500";

/// Configuration for reaching the store over HTTP.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store agent.
    pub address: String,
    /// ACL token sent with every request.
    pub token: Option<String>,
    /// Datacenter to target; the agent's own when unset.
    pub datacenter: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl StoreConfig {
    /// Creates a new store configuration.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: None,
            datacenter: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the ACL token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the datacenter.
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks that the configuration can be put on a request line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the datacenter is empty or holds
    /// anything but ASCII alphanumerics, `-`, `_` and `.`.
    pub fn validate(&self) -> StoreResult<()> {
        match &self.datacenter {
            Some(dc) if !is_datacenter_name(dc) => Err(StoreError::Config(format!(
                "datacenter {dc:?} must be ASCII alphanumerics, '-', '_' or '.'"
            ))),
            _ => Ok(()),
        }
    }

    /// Returns the URL of the transaction endpoint.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::validate`].
    pub fn txn_url(&self) -> StoreResult<String> {
        self.validate()?;
        let base = self.address.trim_end_matches('/');
        Ok(match &self.datacenter {
            Some(dc) => format!("{base}/v1/txn?dc={dc}"),
            None => format!("{base}/v1/txn"),
        })
    }
}

fn is_datacenter_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_builder() {
        let config = StoreConfig::new("https://consul.example.com/")
            .with_token("secret")
            .with_datacenter("dc2")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.txn_url().unwrap(),
            "https://consul.example.com/v1/txn?dc=dc2"
        );
    }

    #[test]
    fn default_points_at_local_agent() {
        let config = StoreConfig::default();
        assert_eq!(config.txn_url().unwrap(), "http://127.0.0.1:8500/v1/txn");
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn datacenter_must_be_url_safe() {
        for bad in ["eu&dc=us", "eu west", "eu#1", "eu/1", "é", ""] {
            let config = StoreConfig::default().with_datacenter(bad);
            assert!(
                matches!(config.txn_url(), Err(StoreError::Config(_))),
                "{bad:?} should be rejected"
            );
        }

        let config = StoreConfig::default().with_datacenter("eu-west_1.prod");
        assert!(config.validate().is_ok());
    }
}
