//! Test-selector audit: classifies JSX elements, validates existing selector
//! attributes and synthesizes missing ones.

use ef_core::graph::{file_stem_name, SourceModule};
use ef_core::models::{
    render_selector_value, ElementTier, FileAudit, NamingViolation, TestSelectorCandidate,
    ViolationKind,
};
use ef_core::naming::{compose_selector, kebab_tokens, static_selector_part, validate_selector};
use ef_core::parsers::{AttrValue, JsxAttribute, JsxElementInfo, ModuleFacts, TypeScriptParser};
use ef_core::rewrite::TextEdit;
use ef_core::{naming::DEFAULT_GENERIC_SELECTORS, EfError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const INTERACTIVE_TAGS: &[&str] = &["button", "a", "input", "select", "textarea", "form"];
const CONTAINER_TAGS: &[&str] = &["table", "ul", "ol", "dialog", "nav", "section", "article"];
const REPEATED_TAGS: &[&str] = &["li", "tr"];

/// Grouping constructs that never carry a selector
const STRUCTURAL_COMPONENTS: &[&str] = &[
    "Fragment", "React.Fragment", "Suspense", "React.Suspense", "StrictMode", "Outlet", "Routes",
    "Route", "Switch", "Redirect", "Navigate", "Helmet", "Trans",
];

/// Attributes consulted for the purpose segment, in order
const PURPOSE_ATTRIBUTES: &[&str] = &["name", "aria-label", "label", "placeholder", "title", "alt", "id"];

/// Naming and classification rules for selector attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorRules {
    /// Attribute written by the patcher
    pub attribute: String,
    /// Attributes accepted as existing selectors
    pub aliases: Vec<String>,
    /// Kebab-case values still rejected as placeholders
    pub generic_values: Vec<String>,
    /// Component-library names treated as interactive
    pub library_components: Vec<String>,
    /// Name suffixes marking a component as interactive (`SubmitButton`)
    pub library_kind_suffixes: Vec<String>,
    /// Components treated as structural containers
    pub container_components: Vec<String>,
    /// Layout components that never carry a selector
    pub presentational_wrappers: Vec<String>,
    pub max_purpose_words: usize,
}

impl Default for SelectorRules {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            attribute: "data-testid".to_string(),
            aliases: strings(&["data-cy", "data-test"]),
            generic_values: strings(DEFAULT_GENERIC_SELECTORS),
            library_components: strings(&[
                "Button", "IconButton", "LoadingButton", "Fab", "TextField", "Input", "Select",
                "Checkbox", "Switch", "Radio", "Slider", "Autocomplete", "DatePicker", "Link",
                "NavLink", "MenuItem", "Tab", "Dropdown",
            ]),
            library_kind_suffixes: strings(&[
                "Button", "Input", "Field", "Select", "Checkbox", "Switch", "Radio", "Slider",
                "Picker", "Link", "Toggle", "Dropdown", "MenuItem",
            ]),
            container_components: strings(&[
                "Table", "DataGrid", "List", "Modal", "Dialog", "Drawer", "Menu", "Tabs",
                "Accordion", "Form",
            ]),
            presentational_wrappers: strings(&[
                "Box", "Stack", "Grid", "Flex", "Container", "Center", "Spacer", "Divider",
                "Paper", "Layout",
            ]),
            max_purpose_words: 3,
        }
    }
}

impl SelectorRules {
    /// Every attribute that counts as a selector, primary first
    pub fn selector_attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.attribute.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }

    fn library_suffix<'n>(&self, name: &'n str) -> Option<&'n str> {
        if self.library_components.iter().any(|c| c == name) {
            return Some(name);
        }
        self.library_kind_suffixes
            .iter()
            .find(|suffix| name.ends_with(suffix.as_str()))
            .map(|suffix| &name[name.len() - suffix.len()..])
    }
}

/// Selector attribute present on an element
struct ExistingSelector<'e> {
    attribute: &'e JsxAttribute,
    /// Value as written; template literals without their backticks
    value: String,
    /// Computed at runtime, nothing to validate
    dynamic: bool,
}

pub struct SelectorAuditor<'a> {
    rules: &'a SelectorRules,
}

impl<'a> SelectorAuditor<'a> {
    pub fn new(rules: &'a SelectorRules) -> Self {
        Self { rules }
    }

    pub fn audit_module(&self, module: &SourceModule) -> FileAudit {
        self.audit_facts(&module.facts, &module.display, &file_stem_name(&module.path))
    }

    /// Parses `source` and audits it; used to re-check patched text
    pub fn audit_source(&self, source: &str, path: &Path, display: &str) -> Result<FileAudit, EfError> {
        let facts = TypeScriptParser::new().scan_source(source, path, display)?;
        Ok(self.audit_facts(&facts, display, &file_stem_name(path)))
    }

    pub fn audit_facts(&self, facts: &ModuleFacts, shown: &str, stem: &str) -> FileAudit {
        let in_scope: Vec<(&JsxElementInfo, ElementTier)> = facts
            .jsx
            .iter()
            .filter_map(|element| self.classify(element).map(|tier| (element, tier)))
            .collect();

        // static parts of existing values are reserved before anything is synthesized
        let mut taken: HashSet<String> = HashSet::new();
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        let mut existing_values = Vec::new();
        for element in &facts.jsx {
            if let Some(existing) = self.existing(element) {
                let base = static_selector_part(&existing.value);
                if !existing.dynamic && element.loops.is_empty() {
                    *occurrences.entry(base.clone()).or_insert(0) += 1;
                }
                existing_values.push((element.location.clone(), base.clone()));
                taken.insert(base);
            }
        }

        let mut audit = FileAudit {
            file: shown.to_string(),
            existing_values,
            ..FileAudit::default()
        };
        let mut seen_values: HashSet<String> = HashSet::new();
        for (element, tier) in in_scope {
            let context = element.component.clone().unwrap_or_else(|| stem.to_string());
            let kind = self.element_kind(element, tier);
            let disambiguators: Vec<String> = element
                .loops
                .iter()
                .map(|l| l.disambiguator().to_string())
                .collect();

            match self.existing(element) {
                None => {
                    let base = unique(self.synthesize(element, &context, &kind, stem), &mut taken);
                    let mut edits = vec![TextEdit::insert(
                        element.insert_at,
                        format!(" {}", render_attribute(&self.rules.attribute, &base, &disambiguators)),
                    )];
                    for ctx in element.loops.iter().filter(|l| l.needs_index()) {
                        edits.extend(ctx.index_edits.iter().cloned());
                    }
                    audit.candidates.push(TestSelectorCandidate {
                        file: shown.to_string(),
                        element: element.tag.clone(),
                        element_kind: kind,
                        location: element.location.clone(),
                        tier,
                        existing: None,
                        suggested: base,
                        disambiguators,
                        edits,
                    });
                }
                Some(existing) => {
                    let base = static_selector_part(&existing.value);
                    let violation = if existing.dynamic {
                        None
                    } else {
                        validate_selector(&existing.value, &self.rules.generic_values).or_else(|| {
                            let repeated = element.loops.is_empty()
                                && occurrences.get(&base).copied().unwrap_or(0) > 1
                                && !seen_values.insert(base.clone());
                            repeated.then_some(ViolationKind::Duplicate)
                        })
                    };

                    if let Some(kind_of_violation) = violation {
                        let suggested =
                            unique(self.synthesize(element, &context, &kind, stem), &mut taken);
                        let replacement =
                            render_attribute(&existing.attribute.name, &suggested, &disambiguators);
                        let mut edits = vec![TextEdit::replace(
                            existing.attribute.start,
                            existing.attribute.end,
                            replacement,
                        )];
                        for ctx in element.loops.iter().filter(|l| l.needs_index()) {
                            edits.extend(ctx.index_edits.iter().cloned());
                        }
                        audit.violations.push(NamingViolation {
                            file: shown.to_string(),
                            element: element.tag.clone(),
                            location: element.location.clone(),
                            attribute: existing.attribute.name.clone(),
                            current: existing.value.clone(),
                            suggested: render_selector_value(&suggested, &disambiguators),
                            kind: kind_of_violation,
                            edits,
                        });
                    }

                    audit.candidates.push(TestSelectorCandidate {
                        file: shown.to_string(),
                        element: element.tag.clone(),
                        element_kind: kind,
                        location: element.location.clone(),
                        tier,
                        existing: Some(existing.value.clone()),
                        suggested: base,
                        disambiguators,
                        edits: Vec::new(),
                    });
                }
            }
        }

        tracing::debug!(
            file = %shown,
            candidates = audit.candidates.len(),
            missing = audit.missing().count(),
            violations = audit.violations.len(),
            "Audited selectors"
        );
        audit
    }

    /// Tier of an element, `None` when it is out of scope
    pub fn classify(&self, element: &JsxElementInfo) -> Option<ElementTier> {
        let tag = element.tag.as_str();
        let last = tag.rsplit('.').next().unwrap_or(tag);
        if tag.is_empty()
            || element.inside_svg
            || STRUCTURAL_COMPONENTS.contains(&tag)
            || last.ends_with("Provider")
            || last.ends_with("Consumer")
            || last.ends_with("Router")
            || last.ends_with("Icon")
            || self.rules.presentational_wrappers.iter().any(|w| w == last)
        {
            return None;
        }

        let has_handler = element.handlers().next().is_some();
        if element.is_intrinsic() {
            if tag == "input" && element.static_attr("type") == Some("hidden") {
                return None;
            }
            if INTERACTIVE_TAGS.contains(&tag) || has_handler {
                return Some(ElementTier::InteractivePrimitive);
            }
            if CONTAINER_TAGS.contains(&tag)
                || (REPEATED_TAGS.contains(&tag) && !element.loops.is_empty())
            {
                return Some(ElementTier::StructuralContainer);
            }
            if !rendered_expressions(element).is_empty() {
                return Some(ElementTier::DisplayDynamic);
            }
            return None;
        }

        if self.rules.library_suffix(last).is_some() {
            return Some(ElementTier::LibraryInteractive);
        }
        if self.rules.container_components.iter().any(|c| c == last) {
            return Some(ElementTier::StructuralContainer);
        }
        None
    }

    fn existing<'e>(&self, element: &'e JsxElementInfo) -> Option<ExistingSelector<'e>> {
        let attribute = self
            .rules
            .selector_attributes()
            .find_map(|name| element.attribute(name))?;
        let (value, dynamic) = match &attribute.value {
            AttrValue::Str(s) => (s.clone(), false),
            AttrValue::Expr(expr) => match expr
                .strip_prefix('`')
                .and_then(|inner| inner.strip_suffix('`'))
            {
                Some(inner) => (inner.to_string(), false),
                None => (expr.clone(), true),
            },
            AttrValue::Flag => (String::new(), false),
        };
        Some(ExistingSelector {
            attribute,
            value,
            dynamic,
        })
    }

    /// Kind token used as the last segment of a value
    fn element_kind(&self, element: &JsxElementInfo, tier: ElementTier) -> String {
        let tag = element.tag.as_str();
        if element.is_intrinsic() {
            let kind = match tag {
                "a" => "link",
                "input" => match element.static_attr("type") {
                    Some("checkbox") => "checkbox",
                    Some("radio") => "radio",
                    Some("submit") | Some("button") => "button",
                    _ => "input",
                },
                "ul" | "ol" => "list",
                "li" => "item",
                "tr" => "row",
                "td" | "th" => "cell",
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
                "img" => "image",
                "button" | "select" | "textarea" | "form" | "table" | "dialog" | "nav"
                | "section" | "article" | "label" => tag,
                _ if tier == ElementTier::InteractivePrimitive => "action",
                _ => "text",
            };
            return kind.to_string();
        }

        let last = tag.rsplit('.').next().unwrap_or(tag);
        let source = match tier {
            ElementTier::LibraryInteractive => self.rules.library_suffix(last).unwrap_or(last),
            _ => last,
        };
        match source {
            "Field" | "TextField" => "input".to_string(),
            other => kebab_tokens(other).last().cloned().unwrap_or_else(|| "element".to_string()),
        }
    }

    fn synthesize(&self, element: &JsxElementInfo, context: &str, kind: &str, stem: &str) -> String {
        let purpose = self.purpose(element);
        let mut value = compose_selector(context, &purpose, kind);
        if value.split('-').filter(|s| !s.is_empty()).count() < 2 {
            value = compose_selector(stem, &value, "element");
        }
        value
    }

    /// Purpose words, from the most to the least descriptive source
    fn purpose(&self, element: &JsxElementInfo) -> String {
        let raw = PURPOSE_ATTRIBUTES
            .iter()
            .find_map(|name| element.static_attr(name).filter(|v| !v.trim().is_empty()))
            .map(str::to_string)
            .or_else(|| handler_purpose(element))
            .or_else(|| {
                element
                    .static_attr("href")
                    .or_else(|| element.static_attr("to"))
                    .map(link_purpose)
            })
            .or_else(|| {
                (element.tag == "input")
                    .then(|| element.static_attr("type"))
                    .flatten()
                    .filter(|t| *t != "text")
                    .map(str::to_string)
            })
            .or_else(|| (!element.text.trim().is_empty()).then(|| element.text.clone()))
            .or_else(|| rendered_expressions(element).first().map(|e| last_identifier(e)))
            .unwrap_or_default();

        kebab_tokens(&raw)
            .into_iter()
            .take(self.rules.max_purpose_words)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Rendered expressions that are text, not nested markup or callbacks
fn rendered_expressions(element: &JsxElementInfo) -> Vec<&str> {
    element
        .dynamic_children
        .iter()
        .map(|s| s.as_str())
        .filter(|e| !e.contains("=>"))
        .collect()
}

/// Reserves `base`, or the first free `base-N`
fn unique(base: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// `data-testid="x"` or ``data-testid={`x-${item.id}`}`` inside iterations
pub fn render_attribute(attribute: &str, base: &str, disambiguators: &[String]) -> String {
    if disambiguators.is_empty() {
        format!("{}=\"{}\"", attribute, base)
    } else {
        format!("{}={{`{}`}}", attribute, render_selector_value(base, disambiguators))
    }
}

/// Purpose from an event handler: `handleSubmit` -> `submit`, `() => remove(id)` -> `remove`
fn handler_purpose(element: &JsxElementInfo) -> Option<String> {
    let preferred = ["onSubmit", "onClick", "onChange"];
    let handler = preferred
        .iter()
        .find_map(|name| element.attribute(name))
        .or_else(|| element.handlers().next())?;
    let AttrValue::Expr(expr) = &handler.value else {
        return None;
    };
    let expr = expr.trim();
    let name = match expr.split_once("=>") {
        Some((_, body)) => first_called(body)?,
        None if expr.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.') => {
            expr.rsplit('.').next()?.to_string()
        }
        None => first_called(expr)?,
    };
    let trimmed = strip_verb_prefix(&name);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn strip_verb_prefix(name: &str) -> &str {
    for prefix in ["handle", "on", "set"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
                return rest;
            }
        }
    }
    name
}

/// First identifier called in an expression (`{ remove(todo.id); }` -> `remove`)
fn first_called(text: &str) -> Option<String> {
    let bytes: Vec<char> = text.chars().collect();
    let mut start = None;
    for (i, c) in bytes.iter().enumerate() {
        let ident_char = c.is_alphanumeric() || *c == '_' || *c == '$';
        match (start, ident_char) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                let ident: String = bytes[s..i].iter().collect();
                let rest: String = bytes[i..].iter().collect();
                if rest.trim_start().starts_with('(') && !is_keyword(&ident) {
                    return Some(ident);
                }
                start = None;
            }
            _ => {}
        }
    }
    None
}

fn is_keyword(word: &str) -> bool {
    matches!(word, "if" | "await" | "async" | "return" | "function" | "void" | "typeof")
}

/// Last path segment of a link target; the root is `home`
fn link_purpose(target: &str) -> String {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    path.rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.starts_with(':'))
        .unwrap_or("home")
        .to_string()
}

/// `todo.title` -> `title`, `formatDate(order.createdAt)` -> `createdAt`
fn last_identifier(expr: &str) -> String {
    expr.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|t| !t.is_empty() && !t.starts_with(|c: char| c.is_ascii_digit()))
        .filter(|t| !matches!(*t, "length" | "toString" | "toFixed" | "toLocaleString"))
        .last()
        .unwrap_or("value")
        .to_string()
}
