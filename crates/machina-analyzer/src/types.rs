//! Attribute type system.
//!
//! Attribute declarations may carry a type (`retries<Integer>: 3`). This
//! module parses those types, infers the shape of values, and validates one
//! against the other.
//!
//! # Architecture
//!
//! - [`parse_type`] turns `Map<string, Array<number>>?` into a [`ParsedType`]
//! - [`infer_type`] derives a [`ParsedType`] from an [`AttributeValue`]
//! - [`are_types_compatible`] is the structural compatibility relation,
//!   including the widenings `Integer`/`Float` from `number` and
//!   `Date`/`UUID`/`URL`/`Duration` from `string`
//! - [`TypeRegistry`] holds named validators: scalars, semantic string
//!   subtypes, generic containers and schemas derived from the machine's own
//!   nodes
//! - [`TypeChecker`] applies all of the above to attributes and records
//!   `TYPE` diagnostics
//!
//! [`AttributeValue`]: machina_core::ast::AttributeValue

mod checker;
mod compat;
mod infer;
mod parse;
mod registry;
mod semantic;

pub use checker::{AttributeTypeResult, TypeChecker};
pub use compat::{are_types_compatible, is_compatible};
pub use infer::{InferenceError, infer_type};
pub use parse::{ParsedType, TypeParseError, parse_type};
pub use registry::{NodeSchema, SchemaField, TypeRegistry, TypeViolation};
