//! Type expression parsing.

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use machina_core::ast::TypeDef;

/// A parsed type expression such as `Array<string>?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParsedType {
    pub base: String,
    pub params: Vec<ParsedType>,
    pub optional: bool,
}

impl ParsedType {
    /// A type without parameters.
    pub fn named(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            params: Vec::new(),
            optional: false,
        }
    }

    pub fn with_params(base: impl Into<String>, params: impl IntoIterator<Item = ParsedType>) -> Self {
        Self {
            base: base.into(),
            params: params.into_iter().collect(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.params.is_empty()
    }

    /// The `any` type.
    pub fn any() -> Self {
        Self::named("any")
    }

    pub fn is_any(&self) -> bool {
        self.base.eq_ignore_ascii_case("any")
    }
}

impl fmt::Display for ParsedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if !self.params.is_empty() {
            write!(f, "<")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{param}")?;
            }
            write!(f, ">")?;
        }
        if self.optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

impl FromStr for ParsedType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

impl TryFrom<&TypeDef> for ParsedType {
    type Error = TypeParseError;

    /// Converts a declared type. Literal unions have no [`ParsedType`] form.
    fn try_from(type_def: &TypeDef) -> Result<Self, Self::Error> {
        if type_def.is_literal_union() {
            return Err(TypeParseError::LiteralUnion(type_def.to_string()));
        }
        parse_type(&type_def.to_string())
    }
}

/// A type expression that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("empty type expression")]
    Empty,

    #[error("unbalanced angle brackets in `{0}`")]
    UnbalancedBrackets(String),

    #[error("empty type parameter in `{0}`")]
    EmptyParameter(String),

    #[error("invalid type name `{0}`")]
    InvalidName(String),

    #[error("unexpected text after `>` in `{0}`")]
    TrailingInput(String),

    #[error("literal union `{0}` is not a named type")]
    LiteralUnion(String),
}

/// Parses a type expression.
///
/// A trailing `?` marks the type optional. Generic parameters are split on
/// commas at nesting depth zero, so `Map<string, Array<number>>` has exactly
/// two parameters.
pub fn parse_type(input: &str) -> Result<ParsedType, TypeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TypeParseError::Empty);
    }

    let (body, optional) = match trimmed.strip_suffix('?') {
        Some(body) => (body.trim_end(), true),
        None => (trimmed, false),
    };

    let Some(open) = body.find('<') else {
        if body.contains('>') {
            return Err(TypeParseError::UnbalancedBrackets(input.to_string()));
        }
        let base = validate_name(body)?;
        return Ok(ParsedType {
            base,
            params: Vec::new(),
            optional,
        });
    };

    let close = matching_close(body, open)
        .ok_or_else(|| TypeParseError::UnbalancedBrackets(input.to_string()))?;
    if !body[close + 1..].trim().is_empty() {
        return Err(TypeParseError::TrailingInput(input.to_string()));
    }

    let base = validate_name(body[..open].trim())?;
    let inner = &body[open + 1..close];
    let params = split_top_level(inner)
        .into_iter()
        .map(|param| {
            if param.trim().is_empty() {
                Err(TypeParseError::EmptyParameter(input.to_string()))
            } else {
                parse_type(param)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedType {
        base,
        params,
        optional,
    })
}

fn validate_name(name: &str) -> Result<String, TypeParseError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(name.to_string())
    } else {
        Err(TypeParseError::InvalidName(name.to_string()))
    }
}

/// Finds the `>` closing the `<` at `open`.
fn matching_close(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on commas that are not nested inside `<...>`.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_and_optional() {
        assert_eq!(parse_type("string").unwrap(), ParsedType::named("string"));
        assert_eq!(
            parse_type(" Integer? ").unwrap(),
            ParsedType::named("Integer").optional()
        );
    }

    #[test]
    fn test_parse_nested_generics() {
        let parsed = parse_type("Map<string, Array<number>>").unwrap();

        assert_eq!(parsed.base, "Map");
        assert_eq!(parsed.params.len(), 2);
        assert_eq!(parsed.params[0], ParsedType::named("string"));
        assert_eq!(
            parsed.params[1],
            ParsedType::with_params("Array", [ParsedType::named("number")])
        );
        assert_eq!(parsed.to_string(), "Map<string, Array<number>>");
    }

    #[test]
    fn test_parse_optional_parameters() {
        let parsed = parse_type("Array<Date?>?").unwrap();

        assert!(parsed.optional);
        assert!(parsed.params[0].optional);
        assert_eq!(parsed.to_string(), "Array<Date?>?");
    }

    #[test]
    fn test_parse_qualified_node_type() {
        let parsed = parse_type("Array<workflow.Config>").unwrap();
        assert_eq!(parsed.params[0].base, "workflow.Config");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_type("  "), Err(TypeParseError::Empty));
        assert!(matches!(
            parse_type("Array<string"),
            Err(TypeParseError::UnbalancedBrackets(_))
        ));
        assert!(matches!(
            parse_type("string>"),
            Err(TypeParseError::UnbalancedBrackets(_))
        ));
        assert!(matches!(
            parse_type("Map<string,>"),
            Err(TypeParseError::EmptyParameter(_))
        ));
        assert!(matches!(
            parse_type("Array<string>x"),
            Err(TypeParseError::TrailingInput(_))
        ));
        assert!(matches!(
            parse_type("my type"),
            Err(TypeParseError::InvalidName(_))
        ));
    }

    #[test]
    fn test_from_type_def() {
        let type_def = TypeDef::generic("Array", [TypeDef::named("string")]).optional();
        let parsed = ParsedType::try_from(&type_def).unwrap();
        assert_eq!(parsed.to_string(), "Array<string>?");

        let union = TypeDef::literal_union(["a", "b"]);
        assert!(matches!(
            ParsedType::try_from(&union),
            Err(TypeParseError::LiteralUnion(_))
        ));
    }

    #[test]
    fn test_from_str() {
        let parsed: ParsedType = "List<Integer>".parse().unwrap();
        assert!(parsed.is_generic());
    }
}
