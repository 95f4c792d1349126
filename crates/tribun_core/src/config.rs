//! Executor configuration.

use tribun_store::MAX_OPERATIONS_IN_TXN;

/// Configuration for batched transactions.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of operations per transaction.
    pub max_operations: usize,

    /// Whether reads fail when a key is absent instead of skipping it.
    pub strict: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_operations: MAX_OPERATIONS_IN_TXN,
            strict: false,
        }
    }
}

impl ExecutorConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of operations per transaction.
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn max_operations(mut self, max: usize) -> Self {
        self.max_operations = max.max(1);
        self
    }

    /// Sets whether reads of absent keys are errors.
    #[must_use]
    pub const fn strict(mut self, value: bool) -> Self {
        self.strict = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_operations, 64);
        assert!(!config.strict);
    }

    #[test]
    fn builder_pattern() {
        let config = ExecutorConfig::new().max_operations(0).strict(true);
        assert_eq!(config.max_operations, 1);
        assert!(config.strict);
    }
}
