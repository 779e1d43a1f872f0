//! Compiler configuration.

use serde::{Deserialize, Serialize};

/// Limits and options applied to every compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Deepest `not`/`and`/`or` nesting accepted; a bare leaf has depth 1.
    pub max_depth: usize,

    /// Most leaves accepted in one filter.
    pub max_leaves: usize,

    /// NFD-normalize string operands.
    pub normalize_strings: bool,

    /// Largest accepted `itemsPerPage`.
    pub max_items_per_page: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_leaves: 256,
            normalize_strings: true,
            max_items_per_page: 1000,
        }
    }
}

impl CompilerConfig {
    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_depth == 0 {
            errors.push("Max depth cannot be 0".to_string());
        }

        if self.max_leaves == 0 {
            errors.push("Max leaves cannot be 0".to_string());
        }

        if self.max_items_per_page == 0 {
            errors.push("Max items per page cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Sets the nesting bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the leaf bound.
    pub fn with_max_leaves(mut self, max_leaves: usize) -> Self {
        self.max_leaves = max_leaves;
        self
    }

    /// Sets the page size bound.
    pub fn with_max_items_per_page(mut self, max_items_per_page: u64) -> Self {
        self.max_items_per_page = max_items_per_page;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.max_leaves, 256);
        assert!(config.normalize_strings);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let config = CompilerConfig::default()
            .with_max_depth(0)
            .with_max_leaves(0)
            .with_max_items_per_page(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CompilerConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.max_leaves, 256);
    }
}
