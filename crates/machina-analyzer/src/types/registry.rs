//! Named type validators.

use indexmap::IndexMap;
use log::trace;
use serde::Serialize;

use machina_core::{
    ast::{AttributeValue, Node, Primitive, TypeDef},
    index::MachineIndex,
};

use super::{
    ParsedType,
    compat::{canonical_base, is_compatible},
    infer::{infer_type, numeric_value},
    semantic,
};
use crate::error::ErrorCode;

/// Why a value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeViolation {
    pub code: ErrorCode,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl TypeViolation {
    fn mismatch(expected: impl ToString, value: &AttributeValue) -> Self {
        let expected = expected.to_string();
        let actual = describe(value);
        Self {
            code: ErrorCode::TypeMismatch,
            message: format!("expected `{expected}`, found `{actual}`"),
            expected,
            actual,
        }
    }

    fn arity(expected: &str, ty: &ParsedType) -> Self {
        Self {
            code: ErrorCode::GenericArity,
            message: format!("`{}` takes {expected}, found {}", ty.base, ty.params.len()),
            expected: expected.to_string(),
            actual: ty.to_string(),
        }
    }

    fn missing(expected: impl ToString, field: &str) -> Self {
        let expected = expected.to_string();
        Self {
            code: ErrorCode::MissingValue,
            message: format!("missing required field `{field}` of type `{expected}`"),
            expected,
            actual: "undefined".to_string(),
        }
    }

    /// Prefixes the message with where inside a value the violation occurred.
    fn within(mut self, position: &str) -> Self {
        self.message = format!("{position}: {}", self.message);
        self
    }
}

/// Describes a value's shape for messages.
fn describe(value: &AttributeValue) -> String {
    infer_type(value)
        .map(|t| t.to_string())
        .unwrap_or_else(|_| "Array".to_string())
}

fn is_null(value: &AttributeValue) -> bool {
    match value.as_primitive() {
        Some(Primitive::Null) => true,
        Some(Primitive::Bare(text)) => text.trim() == "null",
        _ => false,
    }
}

/// Text of a string-like primitive. Numbers and booleans do not count.
fn string_text(value: &AttributeValue) -> Option<&str> {
    match value.as_primitive()? {
        Primitive::String(text) | Primitive::Bare(text) => Some(text),
        _ => None,
    }
}

/// One field of a node-derived schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub type_def: TypeDef,
}

impl SchemaField {
    pub fn is_optional(&self) -> bool {
        self.type_def.optional
    }
}

/// A structural schema built from a node's typed attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeSchema {
    pub fields: Vec<SchemaField>,
}

impl NodeSchema {
    pub fn from_node(node: &Node) -> Self {
        let fields = node
            .attributes
            .iter()
            .filter_map(|attr| {
                attr.type_def.as_ref().map(|type_def| SchemaField {
                    name: attr.name.clone(),
                    type_def: type_def.clone(),
                })
            })
            .collect();
        Self { fields }
    }
}

#[derive(Debug, Clone)]
enum Validator {
    String,
    Number,
    Boolean,
    Any,
    Integer,
    Float,
    Date,
    Uuid,
    Url,
    Duration,
    Array,
    Map,
    Schema(NodeSchema),
}

/// Registry of named types.
///
/// Built-in names always win over node schemas of the same name, and among
/// schemas the first registration wins.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    validators: IndexMap<String, Validator>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry with the built-in types only.
    pub fn new() -> Self {
        let builtins = [
            ("string", Validator::String),
            ("number", Validator::Number),
            ("boolean", Validator::Boolean),
            ("any", Validator::Any),
            ("Integer", Validator::Integer),
            ("Float", Validator::Float),
            ("Date", Validator::Date),
            ("UUID", Validator::Uuid),
            ("URL", Validator::Url),
            ("Duration", Validator::Duration),
            ("Array", Validator::Array),
            ("List", Validator::Array),
            ("Map", Validator::Map),
            ("Record", Validator::Map),
        ];
        Self {
            validators: builtins
                .into_iter()
                .map(|(name, validator)| (name.to_string(), validator))
                .collect(),
        }
    }

    /// A registry with the built-ins plus a schema for every node.
    pub fn for_machine(index: &MachineIndex<'_>) -> Self {
        let mut registry = Self::new();
        registry.register_machine(index);
        registry
    }

    /// Registers every node of the machine under its simple and qualified
    /// names.
    pub fn register_machine(&mut self, index: &MachineIndex<'_>) {
        for (_, indexed) in index.nodes() {
            let schema = NodeSchema::from_node(indexed.node());
            self.register_schema(indexed.qualified_name().as_str(), schema.clone());
            self.register_schema(indexed.name(), schema);
        }
        trace!(types = self.validators.len(); "Registered node schemas");
    }

    /// Registers a schema unless the name is taken. Returns whether it was added.
    pub fn register_schema(&mut self, name: &str, schema: NodeSchema) -> bool {
        if self.validators.contains_key(name) {
            return false;
        }
        self.validators
            .insert(name.to_string(), Validator::Schema(schema));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Option<&Validator> {
        self.validators
            .get(name)
            .or_else(|| self.validators.get(canonical_base(name)))
    }

    /// Validates a value against a declared type, literal unions included.
    pub fn validate_declared(
        &self,
        value: &AttributeValue,
        type_def: &TypeDef,
    ) -> Result<(), TypeViolation> {
        if type_def.optional && is_null(value) {
            return Ok(());
        }
        if type_def.is_literal_union() {
            let text = match value.as_text() {
                Some(text) => text.into_owned(),
                None => value.to_string(),
            };
            if type_def.literals.iter().any(|literal| *literal == text) {
                return Ok(());
            }
            let expected = type_def.to_string();
            return Err(TypeViolation {
                code: ErrorCode::InvalidLiteral,
                message: format!("`{text}` is not one of {expected}"),
                expected,
                actual: text,
            });
        }

        let parsed = ParsedType::try_from(type_def).map_err(|err| TypeViolation {
            code: ErrorCode::InvalidTypeSyntax,
            expected: type_def.to_string(),
            actual: describe(value),
            message: err.to_string(),
        })?;
        self.validate(value, &parsed)
    }

    /// Validates a value against a parsed type.
    ///
    /// Registered names use their validator; unknown names fall back to
    /// structural compatibility with the value's inferred type.
    pub fn validate(&self, value: &AttributeValue, ty: &ParsedType) -> Result<(), TypeViolation> {
        if ty.is_any() || (ty.optional && is_null(value)) {
            return Ok(());
        }

        let Some(validator) = self.lookup(&ty.base) else {
            return match infer_type(value) {
                Err(_) => Ok(()),
                Ok(actual) if is_compatible(ty, &actual) => Ok(()),
                Ok(_) => Err(TypeViolation::mismatch(ty, value)),
            };
        };

        let accepted = match validator {
            Validator::Any => true,
            Validator::String => inferred_base_is(value, "string"),
            Validator::Number => inferred_base_is(value, "number"),
            Validator::Boolean => inferred_base_is(value, "boolean"),
            Validator::Integer => numeric_value(value).is_some_and(|n| n.fract() == 0.0),
            Validator::Float => numeric_value(value).is_some(),
            Validator::Date => string_text(value).is_some_and(semantic::is_date),
            Validator::Uuid => string_text(value).is_some_and(semantic::is_uuid),
            Validator::Url => string_text(value).is_some_and(semantic::is_url),
            Validator::Duration => string_text(value).is_some_and(semantic::is_duration),
            Validator::Array => return self.validate_array(value, ty),
            Validator::Map => return self.validate_map(value, ty),
            Validator::Schema(schema) => return self.validate_schema(value, ty, schema),
        };

        if accepted {
            Ok(())
        } else {
            Err(TypeViolation::mismatch(ty, value))
        }
    }

    fn validate_array(&self, value: &AttributeValue, ty: &ParsedType) -> Result<(), TypeViolation> {
        let AttributeValue::Array(items) = value else {
            return Err(TypeViolation::mismatch(ty, value));
        };
        match ty.params.as_slice() {
            [] => Ok(()),
            [element] => items.iter().enumerate().try_for_each(|(i, item)| {
                self.validate(item, element)
                    .map_err(|v| v.within(&format!("element {i}")))
            }),
            _ => Err(TypeViolation::arity("1 type parameter", ty)),
        }
    }

    fn validate_map(&self, value: &AttributeValue, ty: &ParsedType) -> Result<(), TypeViolation> {
        let AttributeValue::Object(entries) = value else {
            return Err(TypeViolation::mismatch(ty, value));
        };
        match ty.params.as_slice() {
            [] => Ok(()),
            [key_type, value_type] => {
                let check_keys = !key_type.is_any() && canonical_base(&key_type.base) != "string";
                entries.iter().try_for_each(|(key, entry)| {
                    if check_keys {
                        self.validate(&AttributeValue::bare(key.as_str()), key_type)
                            .map_err(|v| v.within(&format!("key `{key}`")))?;
                    }
                    self.validate(entry, value_type)
                        .map_err(|v| v.within(&format!("entry `{key}`")))
                })
            }
            _ => Err(TypeViolation::arity("2 type parameters", ty)),
        }
    }

    fn validate_schema(
        &self,
        value: &AttributeValue,
        ty: &ParsedType,
        schema: &NodeSchema,
    ) -> Result<(), TypeViolation> {
        let AttributeValue::Object(entries) = value else {
            return Err(TypeViolation::mismatch(ty, value));
        };
        schema.fields.iter().try_for_each(|field| match entries.get(&field.name) {
            Some(entry) => self
                .validate_declared(entry, &field.type_def)
                .map_err(|v| v.within(&format!("field `{}`", field.name))),
            None if field.is_optional() => Ok(()),
            None => Err(TypeViolation::missing(&field.type_def, &field.name)),
        })
    }
}

fn inferred_base_is(value: &AttributeValue, base: &str) -> bool {
    infer_type(value).is_ok_and(|t| canonical_base(&t.base) == base)
}
