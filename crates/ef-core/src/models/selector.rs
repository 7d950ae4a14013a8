use crate::models::Location;
use crate::rewrite::TextEdit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification tier, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementTier {
    InteractivePrimitive,
    LibraryInteractive,
    StructuralContainer,
    DisplayDynamic,
}

impl fmt::Display for ElementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementTier::InteractivePrimitive => "interactive-primitive",
            ElementTier::LibraryInteractive => "library-interactive",
            ElementTier::StructuralContainer => "structural-container",
            ElementTier::DisplayDynamic => "display-dynamic",
        };
        f.write_str(s)
    }
}

/// An in-scope element together with its current and proposed selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSelectorCandidate {
    pub file: String,
    /// Tag or component name as written (`button`, `IconButton`)
    pub element: String,
    /// Kind token used as the last name segment (`button`, `input`, `row`)
    pub element_kind: String,
    pub location: Location,
    pub tier: ElementTier,
    /// Current selector value, `None` when the attribute is missing
    pub existing: Option<String>,
    /// Static part of the synthesized value, unique within the file
    pub suggested: String,
    /// Per-item expressions appended inside iterations, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disambiguators: Vec<String>,
    /// Edits inserting the attribute; empty when `existing` is set
    #[serde(skip)]
    pub edits: Vec<TextEdit>,
}

impl TestSelectorCandidate {
    pub fn is_missing(&self) -> bool {
        self.existing.is_none()
    }

    /// Attribute value as it will be rendered in source
    pub fn rendered_value(&self) -> String {
        render_selector_value(&self.suggested, &self.disambiguators)
    }
}

/// Renders a selector value, switching to a template literal when per-item
/// disambiguators are present.
pub fn render_selector_value(base: &str, disambiguators: &[String]) -> String {
    if disambiguators.is_empty() {
        return base.to_string();
    }
    let mut value = base.to_string();
    for expr in disambiguators {
        value.push_str("-${");
        value.push_str(expr);
        value.push('}');
    }
    value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    NotKebabCase,
    GenericPlaceholder,
    TooFewSegments,
    Duplicate,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::NotKebabCase => "not kebab-case",
            ViolationKind::GenericPlaceholder => "generic placeholder",
            ViolationKind::TooFewSegments => "too few segments",
            ViolationKind::Duplicate => "duplicate in file",
        };
        f.write_str(s)
    }
}

/// Existing selector value that breaks the naming convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingViolation {
    pub file: String,
    pub element: String,
    pub location: Location,
    /// Attribute carrying the value (`data-testid`, `data-cy`)
    pub attribute: String,
    pub current: String,
    pub suggested: String,
    pub kind: ViolationKind,
    /// Edit replacing the attribute, applied only in rename mode
    #[serde(skip)]
    pub edits: Vec<TextEdit>,
}

/// Audit result for one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileAudit {
    pub file: String,
    pub candidates: Vec<TestSelectorCandidate>,
    pub violations: Vec<NamingViolation>,
    /// Static part of every selector value already in the file, by element
    #[serde(skip)]
    pub existing_values: Vec<(Location, String)>,
}

impl FileAudit {
    pub fn missing(&self) -> impl Iterator<Item = &TestSelectorCandidate> {
        self.candidates.iter().filter(|c| c.is_missing())
    }

    pub fn present_count(&self) -> usize {
        self.candidates.iter().filter(|c| !c.is_missing()).count()
    }
}
