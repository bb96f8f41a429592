//! Diagnostic categories.

use std::fmt;

use serde::Serialize;

/// The area a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Type mismatches and missing required values.
    Type,

    /// Annotation, relationship and dependency validity.
    Semantic,

    /// Reachability, orphans, cycles and entry/exit points.
    Graph,

    /// Malformed or conflicting AST shape, unresolved references.
    Structural,

    /// Reserved for the executor.
    Runtime,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 5] = [
        ErrorCategory::Type,
        ErrorCategory::Semantic,
        ErrorCategory::Graph,
        ErrorCategory::Structural,
        ErrorCategory::Runtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Type => "type",
            ErrorCategory::Semantic => "semantic",
            ErrorCategory::Graph => "graph",
            ErrorCategory::Structural => "structural",
            ErrorCategory::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
