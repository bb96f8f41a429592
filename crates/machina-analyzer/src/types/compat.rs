//! Structural type compatibility.

use super::{ParsedType, parse_type};

/// Subtypes that accept a plain `number`.
const NUMBER_REFINEMENTS: [&str; 2] = ["Integer", "Float"];

/// Subtypes that accept a plain `string`.
const STRING_REFINEMENTS: [&str; 4] = ["Date", "UUID", "URL", "Duration"];

/// Canonical spelling of a base name for comparison.
pub(crate) fn canonical_base(base: &str) -> &str {
    match base {
        "Array" | "List" | "array" | "list" => "Array",
        "Map" | "Record" | "map" | "record" => "Map",
        other if other.eq_ignore_ascii_case("string") => "string",
        other if other.eq_ignore_ascii_case("number") => "number",
        other if other.eq_ignore_ascii_case("boolean") => "boolean",
        other if other.eq_ignore_ascii_case("null") => "null",
        other if other.eq_ignore_ascii_case("any") => "any",
        other => other,
    }
}

/// Checks whether a value of type `actual` may stand where `expected` is
/// declared.
///
/// `any` on either side is compatible with everything. An unparameterized
/// generic matches any parameterization of the same container; two
/// parameterized types are compared position by position and must agree on
/// arity.
pub fn is_compatible(expected: &ParsedType, actual: &ParsedType) -> bool {
    if expected.is_any() || actual.is_any() {
        return true;
    }

    let expected_base = canonical_base(&expected.base);
    let actual_base = canonical_base(&actual.base);

    if actual_base == "null" && expected.optional {
        return true;
    }

    if expected_base == actual_base {
        if expected.params.is_empty() || actual.params.is_empty() {
            return true;
        }
        return expected.params.len() == actual.params.len()
            && expected
                .params
                .iter()
                .zip(&actual.params)
                .all(|(e, a)| is_compatible(e, a));
    }

    (actual_base == "number" && NUMBER_REFINEMENTS.contains(&expected_base))
        || (actual_base == "string" && STRING_REFINEMENTS.contains(&expected_base))
}

/// String form of [`is_compatible`]. Unparseable types are incompatible.
pub fn are_types_compatible(expected: &str, actual: &str) -> bool {
    match (parse_type(expected), parse_type(actual)) {
        (Ok(expected), Ok(actual)) => is_compatible(&expected, &actual),
        _ => false,
    }
}
