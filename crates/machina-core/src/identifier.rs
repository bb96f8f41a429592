//! Qualified node names.
//!
//! A node's qualified name is the dot-join of its ancestors' simple names and
//! its own, e.g. `workflow.review.approve`. This module provides the
//! [`QualifiedName`] type used by every pass that needs to split, join or
//! compare such paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between path segments of a qualified name.
pub const SEPARATOR: char = '.';

/// [`SEPARATOR`] as a string slice, for joining segments.
pub const SEPARATOR_STR: &str = ".";

/// A dot-separated node path.
///
/// # Examples
///
/// ```
/// use machina_core::identifier::QualifiedName;
///
/// let team = QualifiedName::new("team");
/// let lead = team.create_nested("lead");
/// assert_eq!(lead, "team.lead");
/// assert_eq!(lead.simple_name(), "lead");
/// assert_eq!(lead.parent().unwrap(), "team");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Creates a `QualifiedName` from its textual form.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Builds a qualified name from path segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 {
                joined.push(SEPARATOR);
            }
            joined.push_str(segment.as_ref());
        }
        Self(joined)
    }

    /// Creates a nested name by appending `child` with the `.` separator.
    pub fn create_nested(&self, child: &str) -> Self {
        if self.0.is_empty() {
            return Self::new(child);
        }
        Self(format!("{}{SEPARATOR}{child}", self.0))
    }

    /// Returns the path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Returns the last path segment.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Returns everything but the last segment, or `None` for a simple name.
    pub fn parent(&self) -> Option<QualifiedName> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| QualifiedName::new(parent))
    }

    /// Returns `true` if the name contains at least one separator.
    pub fn is_qualified(&self) -> bool {
        is_qualified(&self.0)
    }

    /// Returns the number of path segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Returns `true` if `name` contains the qualified-name separator.
pub fn is_qualified(name: &str) -> bool {
    name.contains(SEPARATOR)
}

/// Splits a dotted name into its non-empty segments.
///
/// Empty segments produced by leading, trailing or doubled separators are
/// dropped, so `"a..b."` splits into `["a", "b"]`.
pub fn split_segments(name: &str) -> Vec<&str> {
    name.split(SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for QualifiedName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for QualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for QualifiedName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for QualifiedName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
