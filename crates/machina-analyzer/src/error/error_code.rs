//! Error codes for the Machina diagnostic system.
//!
//! Codes are grouped by [`ErrorCategory`]:
//! - Type codes come from attribute type checking
//! - Graph codes come from control-flow validation
//! - Structural codes come from expansion and linking
//! - Semantic codes come from dependency inference
//! - Runtime codes are reserved for the executor

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::ErrorCategory;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Type
    // =========================================================================
    /// A value does not match its declared type.
    TypeMismatch,

    /// A required (non-optional) typed attribute has no value.
    MissingValue,

    /// A value is not a member of its literal-union type.
    InvalidLiteral,

    /// A generic type was given the wrong number of parameters.
    GenericArity,

    /// A type annotation could not be parsed.
    InvalidTypeSyntax,

    // =========================================================================
    // Graph
    // =========================================================================
    /// A node cannot be reached from any entry point.
    UnreachableNode,

    /// A node has no incoming and no outgoing control edges.
    OrphanedNode,

    /// The control graph contains a cycle.
    CycleDetected,

    /// The control graph has no entry point.
    NoEntryPoint,

    /// The control graph has more than one entry point.
    MultipleEntryPoints,

    /// The control graph has no exit point.
    NoExitPoint,

    // =========================================================================
    // Structural
    // =========================================================================
    /// An edge references a node that does not exist.
    UnresolvedReference,

    /// A placeholder node was synthesized for a dangling reference.
    PlaceholderCreated,

    /// Two declarations of the same node disagree on its type.
    TypeConflict,

    // =========================================================================
    // Semantic
    // =========================================================================
    /// Inferred dependencies form a cycle.
    CircularDependency,

    // =========================================================================
    // Runtime
    // =========================================================================
    /// A node failed while executing.
    ExecutionFailed,
}

impl ErrorCode {
    /// Returns the stable code string (e.g. `"MISSING_VALUE"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::MissingValue => "MISSING_VALUE",
            ErrorCode::InvalidLiteral => "INVALID_LITERAL",
            ErrorCode::GenericArity => "GENERIC_ARITY",
            ErrorCode::InvalidTypeSyntax => "INVALID_TYPE_SYNTAX",
            ErrorCode::UnreachableNode => "UNREACHABLE_NODE",
            ErrorCode::OrphanedNode => "ORPHANED_NODE",
            ErrorCode::CycleDetected => "CYCLE_DETECTED",
            ErrorCode::NoEntryPoint => "NO_ENTRY_POINT",
            ErrorCode::MultipleEntryPoints => "MULTIPLE_ENTRY_POINTS",
            ErrorCode::NoExitPoint => "NO_EXIT_POINT",
            ErrorCode::UnresolvedReference => "UNRESOLVED_REFERENCE",
            ErrorCode::PlaceholderCreated => "PLACEHOLDER_CREATED",
            ErrorCode::TypeConflict => "TYPE_CONFLICT",
            ErrorCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            ErrorCode::ExecutionFailed => "EXECUTION_FAILED",
        }
    }

    /// Returns a short description of what this code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::TypeMismatch => "value does not match declared type",
            ErrorCode::MissingValue => "required value is missing",
            ErrorCode::InvalidLiteral => "value is not one of the allowed literals",
            ErrorCode::GenericArity => "wrong number of generic parameters",
            ErrorCode::InvalidTypeSyntax => "malformed type annotation",
            ErrorCode::UnreachableNode => "node is unreachable",
            ErrorCode::OrphanedNode => "node has no edges",
            ErrorCode::CycleDetected => "control flow cycle",
            ErrorCode::NoEntryPoint => "no entry point",
            ErrorCode::MultipleEntryPoints => "multiple entry points",
            ErrorCode::NoExitPoint => "no exit point",
            ErrorCode::UnresolvedReference => "unresolved reference",
            ErrorCode::PlaceholderCreated => "placeholder node created",
            ErrorCode::TypeConflict => "conflicting node types",
            ErrorCode::CircularDependency => "circular dependency",
            ErrorCode::ExecutionFailed => "execution failed",
        }
    }

    /// Returns the category this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::TypeMismatch
            | ErrorCode::MissingValue
            | ErrorCode::InvalidLiteral
            | ErrorCode::GenericArity
            | ErrorCode::InvalidTypeSyntax => ErrorCategory::Type,
            ErrorCode::UnreachableNode
            | ErrorCode::OrphanedNode
            | ErrorCode::CycleDetected
            | ErrorCode::NoEntryPoint
            | ErrorCode::MultipleEntryPoints
            | ErrorCode::NoExitPoint => ErrorCategory::Graph,
            ErrorCode::UnresolvedReference
            | ErrorCode::PlaceholderCreated
            | ErrorCode::TypeConflict => ErrorCategory::Structural,
            ErrorCode::CircularDependency => ErrorCategory::Semantic,
            ErrorCode::ExecutionFailed => ErrorCategory::Runtime,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
