//! Naming rules shared by the selector auditor and the mock synthesizer.

use crate::models::ViolationKind;
use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};

/// Values rejected as selector names even though they are valid kebab-case
pub const DEFAULT_GENERIC_SELECTORS: &[&str] = &[
    "test", "testid", "test-id", "element", "el", "item", "button", "btn", "div", "span",
    "container", "wrapper", "component", "foo", "bar", "baz", "tmp", "temp", "placeholder",
    "todo", "x", "selector",
];

/// Field naming convention of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireCase {
    #[default]
    SnakeCase,
    CamelCase,
    PascalCase,
    KebabCase,
    ScreamingSnakeCase,
}

impl WireCase {
    pub fn apply(&self, name: &str) -> String {
        match self {
            WireCase::SnakeCase => name.to_snake_case(),
            WireCase::CamelCase => name.to_lower_camel_case(),
            WireCase::PascalCase => name.to_upper_camel_case(),
            WireCase::KebabCase => name.to_kebab_case(),
            WireCase::ScreamingSnakeCase => name.to_shouty_snake_case(),
        }
    }

    /// Whether `name` is already written in this convention
    pub fn matches(&self, name: &str) -> bool {
        self.apply(name) == name
    }
}

/// Kebab-case tokens of an arbitrary identifier or phrase
pub fn kebab_tokens(input: &str) -> Vec<String> {
    input
        .to_kebab_case()
        .split('-')
        .map(|t| t.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn kebab(input: &str) -> String {
    kebab_tokens(input).join("-")
}

/// Builds `<context>-<purpose>-<kind>`, collapsing repeated adjacent tokens
pub fn compose_selector(context: &str, purpose: &str, kind: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    for part in [context, purpose, kind] {
        for token in kebab_tokens(part) {
            if tokens.last() != Some(&token) {
                tokens.push(token);
            }
        }
    }
    tokens.join("-")
}

pub fn is_kebab_case(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Static part of a selector value: template expressions and their separators removed
pub fn static_selector_part(value: &str) -> String {
    let mut out = String::new();
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.trim_matches('-').replace("--", "-")
}

/// Checks an existing selector value against the convention
pub fn validate_selector(value: &str, generic: &[String]) -> Option<ViolationKind> {
    let base = static_selector_part(value);
    if !is_kebab_case(&base) {
        return Some(ViolationKind::NotKebabCase);
    }
    let is_generic = |candidate: &str| generic.iter().any(|g| g == candidate);
    let without_digits = base.trim_end_matches(|c: char| c.is_ascii_digit() || c == '-');
    if is_generic(&base) || is_generic(without_digits) {
        return Some(ViolationKind::GenericPlaceholder);
    }
    if base.split('-').count() < 2 {
        return Some(ViolationKind::TooFewSegments);
    }
    None
}

/// Naive English singular, enough for REST resource names
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with("ies") && word.len() > 3 {
        format!("{}y", &word[..word.len() - 3])
    } else if lower.ends_with("sses") || lower.ends_with("xes") || lower.ends_with("ches") {
        word[..word.len() - 2].to_string()
    } else if lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic() -> Vec<String> {
        DEFAULT_GENERIC_SELECTORS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compose_selector() {
        assert_eq!(
            compose_selector("LoginForm", "handleSubmit", "button"),
            "login-form-handle-submit-button"
        );
        assert_eq!(compose_selector("TodoList", "list", "list"), "todo-list");
        assert_eq!(compose_selector("Nav", "Home page", "link"), "nav-home-page-link");
    }

    #[test]
    fn test_validate_selector() {
        let generic = generic();
        assert_eq!(validate_selector("login-form-submit-button", &generic), None);
        assert_eq!(
            validate_selector("todo-item-${todo.id}", &generic),
            None
        );
        assert_eq!(
            validate_selector("submitBtn", &generic),
            Some(ViolationKind::NotKebabCase)
        );
        assert_eq!(
            validate_selector("button-2", &generic),
            Some(ViolationKind::GenericPlaceholder)
        );
        assert_eq!(
            validate_selector("submit", &generic),
            Some(ViolationKind::TooFewSegments)
        );
    }

    #[test]
    fn test_static_selector_part() {
        assert_eq!(static_selector_part("row-${i}-cell-${j}"), "row-cell");
        assert_eq!(static_selector_part("plain-value"), "plain-value");
    }

    #[test]
    fn test_wire_case() {
        assert_eq!(WireCase::SnakeCase.apply("createdAt"), "created_at");
        assert_eq!(WireCase::CamelCase.apply("created_at"), "createdAt");
        assert_eq!(WireCase::PascalCase.apply("created_at"), "CreatedAt");
        assert!(WireCase::SnakeCase.matches("first_name"));
        assert!(!WireCase::SnakeCase.matches("firstName"));
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("todos"), "todo");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("status"), "status");
    }
}
