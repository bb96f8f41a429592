//! Text scanning for `{{ }}` template placeholders and edge conditions.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
static CONDITION_KEYWORD: OnceLock<Regex> = OnceLock::new();
static CONDITION_TOKEN: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)\s*\}\}")
            .expect("placeholder pattern is a valid regex")
    })
}

fn condition_keyword() -> &'static Regex {
    CONDITION_KEYWORD.get_or_init(|| {
        Regex::new(r"\b(when|unless|if)\s*:").expect("condition keyword pattern is a valid regex")
    })
}

fn condition_token() -> &'static Regex {
    CONDITION_TOKEN.get_or_init(|| {
        Regex::new(
            r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\b\d[\w.]*|([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)"#,
        )
        .expect("condition token pattern is a valid regex")
    })
}

/// Identifier paths of every `{{ path }}` placeholder, in order.
pub fn template_paths(text: &str) -> Vec<&str> {
    placeholder()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// The keyword that introduced a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    When,
    Unless,
    If,
}

impl ConditionKind {
    /// Keywords by priority.
    const PRIORITY: [ConditionKind; 3] = [ConditionKind::When, ConditionKind::Unless, ConditionKind::If];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::When => "when",
            ConditionKind::Unless => "unless",
            ConditionKind::If => "if",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A condition found in an edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition<'a> {
    pub kind: ConditionKind,
    /// The text between the keyword's colon and the next condition keyword,
    /// trimmed.
    pub expression: &'a str,
}

/// Extracts the condition of an edge label.
///
/// `when:` takes priority over `unless:`, which takes priority over `if:`.
pub fn extract_condition(label: &str) -> Option<Condition<'_>> {
    let found: Vec<(ConditionKind, usize, usize)> = condition_keyword()
        .captures_iter(label)
        .filter_map(|caps| {
            let keyword = caps.get(1)?;
            let whole = caps.get(0)?;
            let kind = ConditionKind::PRIORITY
                .into_iter()
                .find(|kind| kind.as_str() == keyword.as_str())?;
            Some((kind, whole.start(), whole.end()))
        })
        .collect();

    ConditionKind::PRIORITY.into_iter().find_map(|kind| {
        let position = found.iter().position(|&(k, ..)| k == kind)?;
        let (_, _, start) = found[position];
        let end = found
            .get(position + 1)
            .map_or(label.len(), |&(_, next, _)| next);
        Some(Condition {
            kind,
            expression: label[start..end].trim(),
        })
    })
}

/// Identifier paths in a condition expression.
///
/// Dotted member access (`config.retry.max`) is one path. Quoted strings and
/// numeric literals are skipped, and so is any path whose root identifier is
/// in `reserved`.
pub fn condition_identifiers<'e>(expression: &'e str, reserved: &[&str]) -> Vec<&'e str> {
    let mut identifiers: Vec<&str> = Vec::new();
    for caps in condition_token().captures_iter(expression) {
        let Some(path) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let root = path.split('.').next().unwrap_or(path);
        if reserved.contains(&root) || identifiers.contains(&path) {
            continue;
        }
        identifiers.push(path);
    }
    identifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_paths() {
        let text = "Summarize {{ input.text }} for {{user}} and {{ bad-name }} {{ a.b.c }}";
        assert_eq!(template_paths(text), vec!["input.text", "user", "a.b.c"]);
        assert!(template_paths("no placeholders {here}").is_empty());
    }

    #[test]
    fn test_extract_condition_priority() {
        let when = extract_condition("if: x when: ready").unwrap();
        assert_eq!(when.kind, ConditionKind::When);
        assert_eq!(when.expression, "ready");

        let unless = extract_condition("unless: failed").unwrap();
        assert_eq!(unless.kind, ConditionKind::Unless);
        assert_eq!(unless.expression, "failed");

        let plain = extract_condition("if : count > 3").unwrap();
        assert_eq!(plain.kind, ConditionKind::If);
        assert_eq!(plain.expression, "count > 3");

        assert!(extract_condition("approve").is_none());
        assert!(extract_condition("elif: x").is_none());
    }

    #[test]
    fn test_condition_stops_at_next_keyword() {
        let when = extract_condition("when: a unless: b").unwrap();
        assert_eq!(when.kind, ConditionKind::When);
        assert_eq!(when.expression, "a");
        assert_eq!(condition_identifiers(when.expression, &[]), vec!["a"]);

        let unless = extract_condition("unless: done if: retry").unwrap();
        assert_eq!(unless.expression, "done");
    }

    #[test]
    fn test_condition_identifiers() {
        let reserved = ["true", "false", "null", "errorCount", "errors", "activeState"];
        let identifiers = condition_identifiers(
            "config.retry.maxAttempts > 3 && status == 'done' && errorCount < 2 && ready == true",
            &reserved,
        );
        assert_eq!(identifiers, vec!["config.retry.maxAttempts", "status", "ready"]);
    }

    #[test]
    fn test_condition_identifiers_skip_strings_and_numbers() {
        let identifiers = condition_identifiers(r#"label == "has spaces.and.dots" || ratio > 0.5e2"#, &[]);
        assert_eq!(identifiers, vec!["label", "ratio"]);
    }

    #[test]
    fn test_condition_identifiers_are_unique() {
        assert_eq!(condition_identifiers("a || a || b", &[]), vec!["a", "b"]);
    }
}
