//! Endpoint template normalization.
//!
//! Turns a statically known URL argument into a path template with named
//! placeholders: `` `${API_URL}/users/${user.id}/?tab=1` `` becomes `/users/{id}/`.

use ef_core::graph::ComponentGraph;
use ef_core::models::{NodeId, UnresolvedReason};
use ef_core::parsers::ArgValue;
use heck::ToSnakeCase;
use indexmap::IndexMap;

/// Source of module-level string constants
pub trait Constants {
    fn constant(&self, name: &str) -> Option<String>;
}

impl Constants for IndexMap<String, String> {
    fn constant(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Constants visible in one module: its own, then those of directly imported modules
pub struct ModuleConstants<'a> {
    pub graph: &'a ComponentGraph,
    pub module: NodeId,
}

impl Constants for ModuleConstants<'_> {
    fn constant(&self, name: &str) -> Option<String> {
        let module = self.graph.module(self.module)?;
        if let Some(value) = module.facts.constants.get(name) {
            return Some(value.clone());
        }
        let (root, rest) = match name.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (name, None),
        };
        module.facts.import_of(root)?;
        let targets = self.graph.resolve_local(self.module, root);
        let [target] = targets.as_slice() else {
            return None;
        };
        let key = match (target.local.as_str(), rest) {
            ("*", Some(rest)) => rest.to_string(),
            ("*", None) => return None,
            (local, Some(rest)) => format!("{}.{}", local, rest),
            (local, None) => local.to_string(),
        };
        self.graph
            .module(target.module)
            .and_then(|m| m.facts.constants.get(&key).cloned())
    }
}

enum Piece {
    Lit(String),
    /// Runtime expression, as source text
    Dyn(String),
}

/// Normalizes a URL argument into an endpoint template
pub fn endpoint_template(
    value: &ArgValue,
    constants: &dyn Constants,
) -> Result<String, UnresolvedReason> {
    let mut pieces = Vec::new();
    collect_pieces(value, constants, &mut pieces)?;
    pieces.retain(|p| !matches!(p, Piece::Lit(s) if s.is_empty()));

    // a leading runtime expression followed by a path is a base URL
    if matches!(pieces.first(), Some(Piece::Dyn(_))) {
        match pieces.get(1) {
            Some(Piece::Lit(next)) if next.starts_with('/') => {
                pieces.remove(0);
            }
            _ => return Err(UnresolvedReason::DynamicUrl),
        }
    }
    if !pieces.iter().any(|p| matches!(p, Piece::Lit(s) if !s.is_empty())) {
        return Err(UnresolvedReason::DynamicUrl);
    }
    Ok(render(&pieces))
}

fn collect_pieces(
    value: &ArgValue,
    constants: &dyn Constants,
    out: &mut Vec<Piece>,
) -> Result<(), UnresolvedReason> {
    match value {
        ArgValue::Str(s) => out.push(Piece::Lit(s.clone())),
        ArgValue::Template { quasis, exprs } => {
            for (i, quasi) in quasis.iter().enumerate() {
                out.push(Piece::Lit(quasi.clone()));
                if let Some(expr) = exprs.get(i) {
                    out.push(match constants.constant(expr) {
                        Some(value) => Piece::Lit(value),
                        None => Piece::Dyn(expr.clone()),
                    });
                }
            }
        }
        ArgValue::Ident(name) | ArgValue::Member(name) => match constants.constant(name) {
            Some(value) => out.push(Piece::Lit(value)),
            None => return Err(UnresolvedReason::DynamicUrl),
        },
        ArgValue::Concat(items) => {
            for item in items {
                match item {
                    ArgValue::Ident(name) | ArgValue::Member(name) => {
                        out.push(match constants.constant(name) {
                            Some(value) => Piece::Lit(value),
                            None => Piece::Dyn(name.clone()),
                        })
                    }
                    ArgValue::Call { callee, args } if is_encoder(callee) => {
                        out.push(Piece::Dyn(arg_text(args)))
                    }
                    ArgValue::Other(text) => out.push(Piece::Dyn(text.clone())),
                    other => collect_pieces(other, constants, out)?,
                }
            }
        }
        _ => return Err(UnresolvedReason::DynamicUrl),
    }
    Ok(())
}

fn is_encoder(callee: &str) -> bool {
    matches!(callee, "encodeURIComponent" | "encodeURI" | "String" | "Number")
}

fn arg_text(args: &[ArgValue]) -> String {
    match args.first() {
        Some(ArgValue::Ident(name)) | Some(ArgValue::Member(name)) => name.clone(),
        Some(ArgValue::Other(text)) => text.clone(),
        _ => "value".to_string(),
    }
}

const MARK: char = '\u{1}';

fn render(pieces: &[Piece]) -> String {
    // dynamic parts become `MARK<n>MARK` so the path can be cut like plain text
    let mut raw = String::new();
    let mut dynamic = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Lit(s) => raw.push_str(s),
            Piece::Dyn(expr) => {
                raw.push(MARK);
                raw.push_str(&dynamic.len().to_string());
                raw.push(MARK);
                dynamic.push(expr.as_str());
            }
        }
    }

    let path = strip_origin(&raw);
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trailing_slash = path.len() > 1 && path.ends_with('/');

    // (segment pieces, placeholder source names)
    let mut segments: Vec<Vec<Result<String, usize>>> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let mut parts = Vec::new();
        if let Some(param) = segment.strip_prefix(':') {
            parts.push(Err(names.len()));
            names.push(param.to_string());
        } else if segment.chars().all(|c| c.is_ascii_digit()) {
            parts.push(Err(names.len()));
            names.push("id".to_string());
        } else {
            for (i, chunk) in segment.split(MARK).enumerate() {
                if i % 2 == 0 {
                    if !chunk.is_empty() {
                        parts.push(Ok(chunk.to_string()));
                    }
                } else {
                    let expr = chunk
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| dynamic.get(n))
                        .copied()
                        .unwrap_or("value");
                    parts.push(Err(names.len()));
                    names.push(expression_name(expr));
                }
            }
        }
        segments.push(parts);
    }

    let names = placeholder_names(&names);
    let mut out = String::new();
    for parts in &segments {
        out.push('/');
        for part in parts {
            match part {
                Ok(text) => out.push_str(text),
                Err(idx) => {
                    out.push('{');
                    out.push_str(&names[*idx]);
                    out.push('}');
                }
            }
        }
    }
    if out.is_empty() {
        out.push('/');
    } else if trailing_slash {
        out.push('/');
    }
    out
}

fn strip_origin(raw: &str) -> &str {
    let rest = match raw.split_once("://") {
        Some((scheme, rest)) if !scheme.contains('/') => rest,
        _ => match raw.strip_prefix("//") {
            Some(rest) => rest,
            None => return raw,
        },
    };
    match rest.find('/') {
        Some(pos) => &rest[pos..],
        None => "",
    }
}

/// Last identifier of an expression: `user.id` -> `id`, `params.userId` -> `userId`
fn expression_name(expr: &str) -> String {
    let name = expr
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .filter(|token| {
            !token.is_empty()
                && !token.starts_with(|c: char| c.is_ascii_digit())
                && !matches!(*token, "toString" | "String" | "encodeURIComponent" | "encodeURI")
        })
        .last()
        .unwrap_or("value");
    name.trim_start_matches('$').to_string()
}

fn is_id_like(name: &str) -> bool {
    name == "id" || name == "ID" || name.ends_with("Id") || name.ends_with("_id") || name.ends_with("ID")
}

/// `{id}` for a single identifier-like name, snake case otherwise or when
/// several placeholders would collapse to `{id}`
fn placeholder_names(raw: &[String]) -> Vec<String> {
    let id_like = raw.iter().filter(|n| is_id_like(n)).count();
    let mut used: IndexMap<String, usize> = IndexMap::new();
    raw.iter()
        .map(|name| {
            let base = if is_id_like(name) && id_like == 1 {
                "id".to_string()
            } else {
                let snake = name.to_snake_case();
                if snake.is_empty() {
                    "value".to_string()
                } else {
                    snake
                }
            };
            let count = used.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tpl(quasis: &[&str], exprs: &[&str]) -> ArgValue {
        ArgValue::Template {
            quasis: quasis.iter().map(|s| s.to_string()).collect(),
            exprs: exprs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn template(value: &ArgValue) -> Result<String, UnresolvedReason> {
        let mut constants = IndexMap::new();
        constants.insert("API.users".to_string(), "/api/users".to_string());
        constants.insert("BASE".to_string(), "https://api.example.com/v1".to_string());
        endpoint_template(value, &constants)
    }

    #[test]
    fn test_literal_paths() {
        assert_eq!(template(&ArgValue::Str("/api/todos/".into())), Ok("/api/todos/".into()));
        assert_eq!(
            template(&ArgValue::Str("https://api.example.com/users?page=2".into())),
            Ok("/users".into())
        );
        assert_eq!(template(&ArgValue::Str("api//items".into())), Ok("/api/items".into()));
        assert_eq!(template(&ArgValue::Str("/users/:userId".into())), Ok("/users/{id}".into()));
        assert_eq!(template(&ArgValue::Str("/users/42/".into())), Ok("/users/{id}/".into()));
    }

    #[test]
    fn test_template_placeholders() {
        assert_eq!(template(&tpl(&["/todos/", "/"], &["todo.id"])), Ok("/todos/{id}/".into()));
        assert_eq!(
            template(&tpl(&["/users/", "/posts/", ""], &["userId", "postId"])),
            Ok("/users/{user_id}/posts/{post_id}".into())
        );
        assert_eq!(
            template(&tpl(&["/search/", ""], &["searchTerm"])),
            Ok("/search/{search_term}".into())
        );
        assert_eq!(
            template(&tpl(&["", "/users/", ""], &["process.env.API_URL", "id"])),
            Ok("/users/{id}".into())
        );
    }

    #[test]
    fn test_constants_and_concatenation() {
        assert_eq!(template(&ArgValue::Member("API.users".into())), Ok("/api/users".into()));
        assert_eq!(
            template(&ArgValue::Concat(vec![
                ArgValue::Ident("BASE".into()),
                ArgValue::Str("/orders/".into()),
                ArgValue::Ident("orderId".into()),
            ])),
            Ok("/v1/orders/{id}".into())
        );
        assert_eq!(
            template(&tpl(&["", "/items"], &["BASE"])),
            Ok("/v1/items".into())
        );
    }

    #[test]
    fn test_dynamic_urls_are_unresolved() {
        assert_eq!(
            template(&ArgValue::Ident("url".into())),
            Err(UnresolvedReason::DynamicUrl)
        );
        assert_eq!(
            template(&tpl(&["", ""], &["endpoint"])),
            Err(UnresolvedReason::DynamicUrl)
        );
        assert_eq!(
            template(&ArgValue::Call {
                callee: "buildUrl".into(),
                args: vec![]
            }),
            Err(UnresolvedReason::DynamicUrl)
        );
    }
}
