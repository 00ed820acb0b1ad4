//! Engine configuration.
//!
//! [`EngineConfig`] carries the knobs that tune a configuration pass: the
//! categorization limit and whether data-compatible key types collapse to
//! `Data`. Hosts usually rely on the defaults; the struct deserializes from
//! TOML for hosts that expose the knobs in their own configuration files.
//!
//! ```toml
//! category_limit = 100
//! collapse_data_types = true
//! ```

use crate::constants::MAX_CATEGORIZATIONS;
use crate::core::{BinderyError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable settings for one binder/injector configuration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of distinct categorizations accepted by
    /// `set_categories`. Bounded by
    /// [`MAX_CATEGORIZATIONS`](crate::constants::MAX_CATEGORIZATIONS).
    pub category_limit: usize,
    /// Whether named keys with data-compatible types collapse to `Data`.
    ///
    /// Collapsing lets a precise request find a generically declared
    /// binding; disabling it keys every binding under its precise type.
    pub collapse_data_types: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            category_limit: MAX_CATEGORIZATIONS,
            collapse_data_types: true,
        }
    }
}

impl EngineConfig {
    /// The default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(text).context("failed to parse engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| {
            format!("failed to read engine configuration from {}", path.display())
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// [`BinderyError::Configuration`] when the category limit is zero or
    /// exceeds [`MAX_CATEGORIZATIONS`](crate::constants::MAX_CATEGORIZATIONS).
    pub fn validate(&self) -> Result<()> {
        if self.category_limit == 0 || self.category_limit > MAX_CATEGORIZATIONS {
            return Err(BinderyError::Configuration {
                message: format!(
                    "category_limit must be between 1 and {MAX_CATEGORIZATIONS}, got {}",
                    self.category_limit
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.category_limit, MAX_CATEGORIZATIONS);
        assert!(config.collapse_data_types);
    }

    #[test]
    fn parses_partial_toml() {
        let config = EngineConfig::from_toml_str("category_limit = 10").unwrap();
        assert_eq!(config.category_limit, 10);
        assert!(config.collapse_data_types);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(EngineConfig::from_toml_str("categories = 10").is_err());
    }

    #[test]
    fn rejects_zero_category_limit() {
        assert!(EngineConfig::from_toml_str("category_limit = 0").is_err());
    }

    #[test]
    fn rejects_limit_above_maximum() {
        let text = format!("category_limit = {}", MAX_CATEGORIZATIONS + 1);
        assert!(EngineConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.toml");
        std::fs::write(&path, "collapse_data_types = false\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert!(!config.collapse_data_types);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/bindery.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
