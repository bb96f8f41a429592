//! The core diagnostic record.
//!
//! A [`ValidationError`] represents a single finding of any severity with a
//! code, an optional [`Location`], expected/actual type information, free-form
//! context and a suggestion.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ErrorCategory, ErrorCode, Location, Severity};

/// A structured diagnostic.
///
/// # Example
///
/// ```
/// # use machina_analyzer::error::{ErrorCode, ValidationError};
///
/// let err = ValidationError::error(ErrorCode::TypeMismatch, "expected Integer, got string")
///     .with_property("fetch", "retries")
///     .with_expected("Integer")
///     .with_actual("string")
///     .with_suggestion("use a whole number such as `3`");
///
/// assert_eq!(err.to_string(), "error[TYPE_MISMATCH]: expected Integer, got string");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    severity: Severity,
    category: ErrorCategory,
    code: ErrorCode,
    message: String,
    location: Option<Location>,
    expected: Option<String>,
    actual: Option<String>,
    context: IndexMap<String, String>,
    suggestion: Option<String>,
    timestamp: DateTime<Utc>,
}

impl ValidationError {
    /// Create an error diagnostic.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create an informational diagnostic.
    pub fn info(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Create a hint diagnostic.
    pub fn hint(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Hint, code, message)
    }

    /// Create a diagnostic with an explicit severity.
    ///
    /// The category is derived from the code.
    pub fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: code.category(),
            code,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
            context: IndexMap::new(),
            suggestion: None,
            timestamp: Utc::now(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The qualified name of the affected node, if any.
    pub fn node(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.node.as_deref())
    }

    pub fn expected(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    pub fn actual(&self) -> Option<&str> {
        self.actual.as_deref()
    }

    pub fn context(&self) -> &IndexMap<String, String> {
        &self.context
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Point the diagnostic at a node.
    pub fn with_node(self, node: impl Into<String>) -> Self {
        self.with_location(Location::node(node))
    }

    /// Point the diagnostic at a property of a node.
    pub fn with_property(self, node: impl Into<String>, property: impl Into<String>) -> Self {
        self.with_location(Location::property(node, property))
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Add a context entry. A repeated key replaces the earlier value.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "warning[ORPHANED_NODE]: message"
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}
