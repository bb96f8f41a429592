//! Attribute type checking over a whole machine.

use log::{debug, info};
use serde::Serialize;

use machina_core::{ast::Attribute, index::MachineIndex};

use super::{TypeRegistry, TypeViolation};
use crate::error::{ErrorCode, ValidationContext, ValidationError};

/// Outcome of checking one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeTypeResult {
    pub valid: bool,
    pub expected_type: Option<String>,
    pub actual_type: Option<String>,
    pub message: Option<String>,
    pub code: Option<ErrorCode>,
}

impl AttributeTypeResult {
    fn valid(expected_type: Option<String>) -> Self {
        Self {
            valid: true,
            expected_type,
            actual_type: None,
            message: None,
            code: None,
        }
    }

    fn invalid(violation: TypeViolation) -> Self {
        Self {
            valid: false,
            expected_type: Some(violation.expected),
            actual_type: Some(violation.actual),
            message: Some(violation.message),
            code: Some(violation.code),
        }
    }
}

/// Validates attribute values against their declared types.
#[derive(Debug, Clone, Default)]
pub struct TypeChecker {
    registry: TypeRegistry,
}

impl TypeChecker {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    /// A checker whose registry knows the machine's node schemas.
    pub fn for_machine(index: &MachineIndex<'_>) -> Self {
        Self::new(TypeRegistry::for_machine(index))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Checks one attribute.
    ///
    /// Untyped attributes are always valid. A typed attribute without a value
    /// is valid only when its type is optional.
    pub fn validate_attribute_type(&self, attribute: &Attribute) -> AttributeTypeResult {
        let Some(type_def) = &attribute.type_def else {
            return AttributeTypeResult::valid(None);
        };
        let expected = type_def.to_string();

        let Some(value) = &attribute.value else {
            if type_def.optional {
                return AttributeTypeResult::valid(Some(expected));
            }
            return AttributeTypeResult::invalid(TypeViolation {
                code: ErrorCode::MissingValue,
                message: format!("attribute `{}` of type `{expected}` has no value", attribute.name),
                expected,
                actual: "undefined".to_string(),
            });
        };

        match self.registry.validate_declared(value, type_def) {
            Ok(()) => AttributeTypeResult::valid(Some(expected)),
            Err(violation) => AttributeTypeResult::invalid(violation),
        }
    }

    /// Checks every attribute of every node and records one `TYPE`
    /// diagnostic per failure. Returns the number of failures.
    pub fn check_machine(&self, index: &MachineIndex<'_>, context: &mut ValidationContext) -> usize {
        let mut failures = 0;
        for (_, indexed) in index.nodes() {
            let node_name = indexed.qualified_name().as_str();
            for attribute in &indexed.node().attributes {
                let result = self.validate_attribute_type(attribute);
                if result.valid {
                    continue;
                }
                failures += 1;
                debug!(node = node_name, attribute = attribute.name.as_str(); "Attribute type check failed");

                let code = result.code.unwrap_or(ErrorCode::TypeMismatch);
                let message = result.message.unwrap_or_else(|| code.description().to_string());
                let mut error = ValidationError::error(
                    code,
                    format!("{node_name}.{}: {message}", attribute.name),
                )
                .with_property(node_name, attribute.name.as_str());
                if let Some(expected) = result.expected_type {
                    error = error.with_expected(expected);
                }
                if let Some(actual) = result.actual_type {
                    error = error.with_actual(actual);
                }
                if code == ErrorCode::MissingValue {
                    error = error.with_suggestion("provide a value or mark the type optional with `?`");
                }
                context.add_error(error);
            }
        }
        info!(failures; "Type checked attributes");
        failures
    }
}
