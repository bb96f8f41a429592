//! Value type inference.

use thiserror::Error;

use machina_core::ast::{AttributeValue, Primitive};

use super::ParsedType;

/// Why a value's type could not be inferred.
///
/// This is not a type error: callers treat an uninferable value as
/// compatible with any declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("cannot infer the element type of an empty array")]
    EmptyArray,
}

/// Infers the type of a value.
///
/// - Arrays take the type of their first element and fall back to
///   `Array<any>` when elements disagree. Empty arrays fail with
///   [`InferenceError::EmptyArray`].
/// - Objects are `Record<string, any>`.
/// - Unquoted text that reads as a number, boolean or `null` infers as such.
pub fn infer_type(value: &AttributeValue) -> Result<ParsedType, InferenceError> {
    match value {
        AttributeValue::Primitive(primitive) => Ok(infer_primitive(primitive)),
        AttributeValue::Array(items) => {
            let (first, rest) = items.split_first().ok_or(InferenceError::EmptyArray)?;
            let element = match infer_type(first) {
                Ok(element) => element,
                Err(InferenceError::EmptyArray) => {
                    return Ok(ParsedType::with_params("Array", [ParsedType::any()]));
                }
            };
            let homogeneous = rest
                .iter()
                .all(|item| infer_type(item).is_ok_and(|t| t == element));
            let element = if homogeneous { element } else { ParsedType::any() };
            Ok(ParsedType::with_params("Array", [element]))
        }
        AttributeValue::Object(_) => Ok(ParsedType::with_params(
            "Record",
            [ParsedType::named("string"), ParsedType::any()],
        )),
    }
}

fn infer_primitive(primitive: &Primitive) -> ParsedType {
    let name = match primitive {
        Primitive::String(_) => "string",
        Primitive::Number(_) => "number",
        Primitive::Boolean(_) => "boolean",
        Primitive::Null => "null",
        Primitive::Bare(text) => infer_bare_text(text),
    };
    ParsedType::named(name)
}

fn infer_bare_text(text: &str) -> &'static str {
    let text = text.trim();
    if text == "true" || text == "false" {
        "boolean"
    } else if text == "null" {
        "null"
    } else if parse_number(text).is_some() {
        "number"
    } else {
        "string"
    }
}

/// Parses numeric text, rejecting the non-finite spellings `f64` accepts.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// The numeric value of a primitive, if it reads as a number.
pub(crate) fn numeric_value(value: &AttributeValue) -> Option<f64> {
    match value.as_primitive()? {
        Primitive::Number(n) => Some(*n),
        Primitive::Bare(text) => parse_number(text),
        _ => None,
    }
}
