//! Error and diagnostic system for the Machina analyzer.
//!
//! This module provides:
//! - Stable error codes, each mapped to a category
//! - Four severity levels
//! - Structured [`ValidationError`] records with location, expected/actual
//!   types, free-form context and suggestions
//! - The [`ValidationContext`] accumulator with per-node blocking and
//!   recovery bookkeeping
//!
//! # Overview
//!
//! Passes never fail on soft problems. They add [`ValidationError`]s to a
//! shared [`ValidationContext`] and keep going. Only two situations produce a
//! hard `Err`: an unresolved reference in strict mode
//! ([`LinkError`](crate::link::LinkError)) and a type annotation that cannot
//! be parsed at all ([`TypeParseError`](crate::types::TypeParseError)).
//!
//! # Example
//!
//! ```
//! # use machina_analyzer::error::{ErrorCode, Severity, ValidationContext, ValidationError};
//!
//! let mut context = ValidationContext::new();
//! context.add_error(
//!     ValidationError::warning(ErrorCode::OrphanedNode, "node `cleanup` has no edges")
//!         .with_node("cleanup")
//!         .with_suggestion("connect it or remove it"),
//! );
//!
//! assert_eq!(context.errors_by_severity(Severity::Warning).len(), 1);
//! assert!(!context.is_node_blocked("cleanup"));
//! ```

mod category;
mod context;
mod error_code;
mod location;
mod recovery;
mod severity;
mod validation_error;

pub use category::ErrorCategory;
pub use context::{NodeErrorFlag, ValidationContext, ValidationSummary};
pub use error_code::ErrorCode;
pub use location::Location;
pub use recovery::RecoveryAction;
pub use severity::Severity;
pub use validation_error::ValidationError;
