//! Source and model locations attached to diagnostics.

use std::fmt;

use serde::Serialize;

/// Where a diagnostic applies.
///
/// `node` is the qualified name of the affected node and is what drives the
/// per-node bookkeeping in [`ValidationContext`](super::ValidationContext).
/// The textual position fields are filled in only when the parser supplied
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub node: Option<String>,
    pub property: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub file: Option<String>,
}

impl Location {
    /// A location pointing at a node.
    pub fn node(node: impl Into<String>) -> Self {
        Self {
            node: Some(node.into()),
            ..Self::default()
        }
    }

    /// A location pointing at a property of a node.
    pub fn property(node: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            node: Some(node.into()),
            property: Some(property.into()),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}")?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{line}:{column}")?;
            }
            write!(f, " ")?;
        }
        match (&self.node, &self.property) {
            (Some(node), Some(property)) => write!(f, "{node}.{property}"),
            (Some(node), None) => write!(f, "{node}"),
            (None, Some(property)) => write!(f, ".{property}"),
            (None, None) => Ok(()),
        }
    }
}
