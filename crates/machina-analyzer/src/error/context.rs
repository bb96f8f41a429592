//! Shared accumulator for diagnostics.
//!
//! Every analysis pass reports into a [`ValidationContext`] instead of failing
//! on the first problem. Diagnostics located on a node are additionally
//! aggregated into that node's [`NodeErrorFlag`], which is what the executor
//! consults to decide whether a node is blocked and how to recover.

use std::fmt;

use indexmap::IndexMap;
use log::trace;
use serde::Serialize;

use crate::error::{ErrorCategory, RecoveryAction, Severity, ValidationError};

/// Per-node aggregation of diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeErrorFlag {
    errors: Vec<ValidationError>,
    is_blocked: bool,
    recovery: Option<RecoveryAction>,
}

impl NodeErrorFlag {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `true` iff any attached diagnostic has [`Severity::Error`].
    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    pub fn recovery(&self) -> Option<&RecoveryAction> {
        self.recovery.as_ref()
    }

    fn push(&mut self, error: ValidationError) {
        self.is_blocked |= error.severity().is_error();
        self.errors.push(error);
    }
}

/// Collector for diagnostics from every pass.
///
/// # Example
///
/// ```
/// # use machina_analyzer::error::{ErrorCode, RecoveryAction, ValidationContext, ValidationError};
///
/// let mut context = ValidationContext::new();
/// context.add_error(
///     ValidationError::error(ErrorCode::MissingValue, "`retries` has no value")
///         .with_property("fetch", "retries"),
/// );
/// context.set_recovery_action("fetch", RecoveryAction::Retry { max_attempts: 3 });
///
/// assert!(context.is_node_blocked("fetch"));
/// assert_eq!(context.errors_for_node("fetch").len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationContext {
    errors: Vec<ValidationError>,
    node_flags: IndexMap<String, NodeErrorFlag>,
}

impl ValidationContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    ///
    /// If the diagnostic is located on a node, the node's flag is updated as
    /// well and becomes blocked when the diagnostic is an error.
    pub fn add_error(&mut self, error: ValidationError) {
        if let Some(node) = error.node() {
            trace!(node, code = error.code().as_str(); "Flagging node");
            self.node_flags
                .entry(node.to_string())
                .or_default()
                .push(error.clone());
        }
        self.errors.push(error);
    }

    /// Attach a recovery action to a node, replacing any earlier one.
    pub fn set_recovery_action(&mut self, node: impl Into<String>, action: RecoveryAction) {
        self.node_flags.entry(node.into()).or_default().recovery = Some(action);
    }

    /// Move every diagnostic of `other` into this context, in order.
    pub fn merge(&mut self, other: ValidationContext) {
        for error in other.errors {
            self.add_error(error);
        }
        for (node, flag) in other.node_flags {
            if let Some(action) = flag.recovery {
                self.set_recovery_action(node, action);
            }
        }
    }

    /// All diagnostics in insertion order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if any diagnostic has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity().is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.errors.iter().any(|e| e.severity().is_warning())
    }

    pub fn errors_by_severity(&self, severity: Severity) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity() == severity)
            .collect()
    }

    pub fn errors_by_category(&self, category: ErrorCategory) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.category() == category)
            .collect()
    }

    pub fn errors_for_node(&self, node: &str) -> &[ValidationError] {
        self.node_flags
            .get(node)
            .map(|flag| flag.errors())
            .unwrap_or_default()
    }

    pub fn node_flag(&self, node: &str) -> Option<&NodeErrorFlag> {
        self.node_flags.get(node)
    }

    pub fn is_node_blocked(&self, node: &str) -> bool {
        self.node_flags.get(node).is_some_and(|f| f.is_blocked())
    }

    pub fn recovery_action(&self, node: &str) -> Option<&RecoveryAction> {
        self.node_flags.get(node).and_then(|f| f.recovery())
    }

    /// Qualified names of blocked nodes, in the order they were first flagged.
    pub fn blocked_nodes(&self) -> Vec<&str> {
        self.node_flags
            .iter()
            .filter(|(_, flag)| flag.is_blocked())
            .map(|(node, _)| node.as_str())
            .collect()
    }

    /// Summarize the collected diagnostics.
    pub fn summary(&self) -> ValidationSummary {
        let count_severity = |severity| {
            self.errors
                .iter()
                .filter(|e| e.severity() == severity)
                .count()
        };
        let by_category = ErrorCategory::ALL
            .into_iter()
            .map(|category| {
                let count = self
                    .errors
                    .iter()
                    .filter(|e| e.category() == category)
                    .count();
                (category, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();

        ValidationSummary {
            total: self.errors.len(),
            errors: count_severity(Severity::Error),
            warnings: count_severity(Severity::Warning),
            infos: count_severity(Severity::Info),
            hints: count_severity(Severity::Hint),
            by_category,
            blocked_nodes: self.blocked_nodes().into_iter().map(String::from).collect(),
        }
    }
}

/// Counts of collected diagnostics, with a human-readable report via `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
    pub by_category: Vec<(ErrorCategory, usize)>,
    pub blocked_nodes: Vec<String>,
}

impl ValidationSummary {
    /// Returns `true` if no diagnostic has error severity.
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} diagnostic(s): {} error(s), {} warning(s), {} info, {} hint(s)",
            self.total, self.errors, self.warnings, self.infos, self.hints
        )?;
        for (category, count) in &self.by_category {
            writeln!(f, "  {category}: {count}")?;
        }
        if !self.blocked_nodes.is_empty() {
            writeln!(f, "blocked nodes: {}", self.blocked_nodes.join(", "))?;
        }
        Ok(())
    }
}
