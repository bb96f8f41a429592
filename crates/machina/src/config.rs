//! Configuration for the analysis pipeline.
//!
//! [`AnalyzerConfig`] implements [`serde::Deserialize`] with every field
//! defaulted, so a partial document is enough. [`AnalyzerConfig::from_toml_str`]
//! reads one from TOML text.
//!
//! # Example
//!
//! ```
//! # use machina::config::AnalyzerConfig;
//! let config = AnalyzerConfig::from_toml_str(
//!     r#"
//!     strict_mode = true
//!     reserved_condition_identifiers = ["retryCount"]
//!     "#,
//! )
//! .expect("valid config");
//!
//! assert_eq!(config.strict_mode(), Some(true));
//! assert!(config.check_types());
//! ```

use serde::Deserialize;

use crate::MachinaError;

/// Switches for [`MachineAnalyzer`](crate::MachineAnalyzer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Overrides the machine's `@StrictMode` annotation when set.
    strict_mode: Option<bool>,

    /// Whether lenient linking creates placeholder nodes for unresolved
    /// references. When off, unresolved references are only reported.
    auto_create_placeholders: bool,

    /// Whether declared attribute types are checked.
    check_types: bool,

    /// Whether implicit dependencies are inferred.
    infer_dependencies: bool,

    /// Extra identifiers that condition expressions never depend on.
    reserved_condition_identifiers: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            strict_mode: None,
            auto_create_placeholders: true,
            check_types: true,
            infer_dependencies: true,
            reserved_condition_identifiers: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`MachinaError::Config`] if the text is not valid TOML or does
    /// not match the expected shape.
    pub fn from_toml_str(source: &str) -> Result<Self, MachinaError> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = Some(strict);
        self
    }

    pub fn with_auto_create_placeholders(mut self, enabled: bool) -> Self {
        self.auto_create_placeholders = enabled;
        self
    }

    pub fn with_check_types(mut self, enabled: bool) -> Self {
        self.check_types = enabled;
        self
    }

    pub fn with_infer_dependencies(mut self, enabled: bool) -> Self {
        self.infer_dependencies = enabled;
        self
    }

    pub fn with_reserved_condition_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.reserved_condition_identifiers.push(identifier.into());
        self
    }

    /// Returns the strict mode override, if any.
    pub fn strict_mode(&self) -> Option<bool> {
        self.strict_mode
    }

    pub fn auto_create_placeholders(&self) -> bool {
        self.auto_create_placeholders
    }

    pub fn check_types(&self) -> bool {
        self.check_types
    }

    pub fn infer_dependencies(&self) -> bool {
        self.infer_dependencies
    }

    pub fn reserved_condition_identifiers(&self) -> &[String] {
        &self.reserved_condition_identifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();

        assert_eq!(config.strict_mode(), None);
        assert!(config.auto_create_placeholders());
        assert!(config.check_types());
        assert!(config.infer_dependencies());
        assert!(config.reserved_condition_identifiers().is_empty());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = AnalyzerConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            auto_create_placeholders = false
            infer_dependencies = false
            "#,
        )
        .unwrap();

        assert!(!config.auto_create_placeholders());
        assert!(!config.infer_dependencies());
        assert!(config.check_types());
    }

    #[test]
    fn test_invalid_toml() {
        let result = AnalyzerConfig::from_toml_str("check_types = \"yes\"");
        assert!(matches!(result, Err(MachinaError::Config(_))));
    }
}
