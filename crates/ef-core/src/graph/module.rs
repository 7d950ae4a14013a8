use crate::models::NodeId;
use crate::parsers::{ImportKind, ModuleFacts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Role a module plays in the component tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleRole {
    /// Entry point
    Page,
    /// Renders JSX or exports a PascalCase function
    Component,
    /// Service, hook or utility module
    Module,
}

/// Parsed source file inside the source roots
#[derive(Debug, Clone)]
pub struct SourceModule {
    /// Canonical path
    pub path: PathBuf,
    /// Project-relative path with forward slashes
    pub display: String,
    pub facts: ModuleFacts,
    /// Source text as analyzed
    pub source: Arc<str>,
    /// blake3 of `source`
    pub hash: String,
    pub role: ModuleRole,
    /// Set when the file could not be parsed; such a module has no facts and no edges
    pub parse_failed: bool,
    /// Import depth from the closest entry point
    pub depth: usize,
    /// Specifiers that could not be resolved
    pub unresolved_imports: Vec<String>,
}

impl SourceModule {
    pub fn new(path: PathBuf, display: String, facts: ModuleFacts, source: String) -> Self {
        let hash = crate::rewrite::content_hash(&source);
        Self {
            path,
            display,
            facts,
            source: Arc::from(source),
            hash,
            role: ModuleRole::Module,
            parse_failed: false,
            depth: 0,
            unresolved_imports: Vec::new(),
        }
    }

    /// Placeholder for a file that failed to parse
    pub fn failed(path: PathBuf, display: String, source: String) -> Self {
        let mut module = Self::new(path, display, ModuleFacts::default(), source);
        module.parse_failed = true;
        module
    }

    /// Component name used in reports: the rendered component, else the file stem
    pub fn component_name(&self) -> String {
        self.facts
            .primary_component()
            .unwrap_or_else(|| file_stem_name(&self.path))
    }

    pub fn is_component_like(&self) -> bool {
        matches!(self.role, ModuleRole::Page | ModuleRole::Component)
    }
}

/// File stem, using the parent directory for `index.*` files
pub fn file_stem_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let stem = stem.split('.').next().unwrap_or(stem);
    if matches!(stem, "index" | "page" | "route" | "layout") {
        if let Some(parent) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
        {
            return parent.to_string();
        }
    }
    stem.to_string()
}

/// Node of the component graph
#[derive(Debug, Clone)]
pub enum GraphNode {
    Module(Box<SourceModule>),
    /// Package or file outside the source roots; never parsed
    External { name: String },
}

impl GraphNode {
    pub fn as_module(&self) -> Option<&SourceModule> {
        match self {
            GraphNode::Module(module) => Some(module.as_ref()),
            GraphNode::External { .. } => None,
        }
    }
}

/// Import edge; `order` is the position of the import in the importing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub specifier: String,
    pub kind: ImportKind,
    pub order: usize,
    pub line: usize,
}

/// Where an import specifier of a module leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget<'a> {
    Module(NodeId),
    External(&'a str),
    Unresolved,
}

/// Declaration a symbol resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolTarget {
    pub module: NodeId,
    /// Local name inside `module`
    pub local: String,
}
