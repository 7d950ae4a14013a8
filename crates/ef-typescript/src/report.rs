//! Inventory and coverage documents for a full, change-set or path scoped run.

use crate::analysis::{Analysis, Analyzer};
use ef_core::graph::{ComponentGraph, ModuleRole};
use ef_core::models::{
    CallEntry, CoverageCounts, CoverageReport, EndpointCaller, EndpointEntry, HttpMethod,
    InventoryDocument, MissingSelectorRow, NamingViolationRow, NodeId, PageInventory,
    SubcomponentInventory,
};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Part of the project a run reports on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every entry point
    Full,
    /// Files of an externally supplied change set
    ChangeSet(Vec<PathBuf>),
    /// Source files under one path
    SinglePath(PathBuf),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Full => f.write_str("full"),
            Scope::ChangeSet(paths) => write!(f, "changes ({} files)", paths.len()),
            Scope::SinglePath(path) => write!(f, "path {}", path.display()),
        }
    }
}

pub struct ReportEmitter<'a> {
    graph: &'a ComponentGraph,
    analyzer: Analyzer<'a>,
    /// Project root, for relative change-set paths
    root: PathBuf,
}

impl<'a> ReportEmitter<'a> {
    pub fn new(graph: &'a ComponentGraph, analyzer: Analyzer<'a>, root: impl Into<PathBuf>) -> Self {
        Self {
            graph,
            analyzer,
            root: root.into(),
        }
    }

    /// Analyzes the scope and builds both documents
    pub fn emit(&self, scope: &Scope) -> (InventoryDocument, CoverageReport) {
        let analysis = self.analyze(scope);
        self.documents(scope, &analysis)
    }

    pub fn analyze(&self, scope: &Scope) -> Analysis {
        let roots = self.roots(scope);
        info!(scope = %scope, roots = roots.len(), "Analyzing");
        self.analyzer.analyze(&roots)
    }

    /// Traversal roots of a scope.
    ///
    /// Scoped runs start from the selected modules that a full run reaches,
    /// so their output never covers a file the full run would not. Selected
    /// modules below another selected module are folded into it, and
    /// selected modules importing each other keep one representative.
    pub fn roots(&self, scope: &Scope) -> Vec<NodeId> {
        let entries = self.graph.entry_points().to_vec();
        let selected: Vec<NodeId> = match scope {
            Scope::Full => return entries,
            Scope::ChangeSet(paths) => {
                let wanted: HashSet<PathBuf> = paths.iter().map(|p| self.normalize(p)).collect();
                let mut found = Vec::new();
                for path in &wanted {
                    match self.graph.node_for_path(path) {
                        Some(id) => found.push(id),
                        None => warn!(path = %path.display(), "Changed file is not part of the component graph"),
                    }
                }
                found
            }
            Scope::SinglePath(prefix) => {
                let prefix = self.normalize(prefix);
                self.graph
                    .modules()
                    .filter(|(_, m)| m.path.starts_with(&prefix))
                    .map(|(id, _)| id)
                    .collect()
            }
        };

        let reachable: HashSet<NodeId> = entries
            .iter()
            .flat_map(|e| self.graph.reachable_from(*e))
            .collect();
        let mut roots: Vec<NodeId> = selected
            .into_iter()
            .filter(|id| reachable.contains(id))
            .collect();
        roots.sort_by(|a, b| self.display(*a).cmp(self.display(*b)));
        roots.dedup();

        // roots that reach each other form one group; the group's first
        // member (by display path) stands for it unless an outside root
        // reaches the group
        let reach: Vec<HashSet<NodeId>> = roots
            .iter()
            .map(|r| self.graph.reachable_from(*r).into_iter().collect())
            .collect();
        let mutual = |i: usize, j: usize| reach[i].contains(&roots[j]) && reach[j].contains(&roots[i]);
        let mut folded = Vec::new();
        let mut grouped: HashSet<usize> = HashSet::new();
        for i in 0..roots.len() {
            if !grouped.insert(i) {
                continue;
            }
            let group: Vec<usize> = (i..roots.len()).filter(|&j| j == i || mutual(i, j)).collect();
            grouped.extend(group.iter().copied());
            let reached_from_outside = (0..roots.len())
                .filter(|j| !group.contains(j))
                .any(|j| reach[j].contains(&roots[i]));
            if !reached_from_outside {
                folded.push(roots[i]);
            }
        }
        folded
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        crate::path_resolver::normalize_path(&absolute)
    }

    fn display(&self, id: NodeId) -> &str {
        self.graph
            .module(id)
            .map(|m| m.display.as_str())
            .unwrap_or_default()
    }

    /// Builds the documents of an already analyzed scope
    pub fn documents(&self, scope: &Scope, analysis: &Analysis) -> (InventoryDocument, CoverageReport) {
        let label = scope.to_string();
        let files: BTreeSet<&str> = analysis.files.iter().map(|f| f.as_str()).collect();
        let mut diagnostics = self.graph.diagnostics.clone();
        diagnostics.retain_files(|file| files.contains(file));

        let inventory = InventoryDocument {
            scope: label.clone(),
            pages: self.pages(analysis),
            endpoints: endpoint_index(analysis),
            unresolved: analysis
                .calls
                .iter()
                .filter(|c| !c.is_resolved())
                .cloned()
                .collect(),
            third_party: analysis.third_party.clone(),
            diagnostics: diagnostics.clone(),
        };
        let coverage = coverage_report(label, analysis, diagnostics);
        (inventory, coverage)
    }

    fn pages(&self, analysis: &Analysis) -> IndexMap<String, PageInventory> {
        let mut pages = IndexMap::new();
        for tree in &analysis.trees {
            let Some(page) = self.graph.module(tree.root) else {
                continue;
            };
            let subcomponents = tree
                .modules
                .iter()
                .filter(|id| **id != tree.root)
                .filter_map(|id| self.graph.module(*id))
                .filter(|m| m.role != ModuleRole::Module || analysis.calls_in(&m.display).next().is_some())
                .map(|m| SubcomponentInventory {
                    name: m.component_name(),
                    file: m.display.clone(),
                    api_calls: analysis.calls_in(&m.display).map(CallEntry::from).collect(),
                })
                .collect();
            pages.insert(
                page.display.clone(),
                PageInventory {
                    file: page.display.clone(),
                    component: page.component_name(),
                    api_calls: analysis.calls_in(&page.display).map(CallEntry::from).collect(),
                    subcomponents,
                },
            );
        }
        pages
    }
}

fn endpoint_index(analysis: &Analysis) -> Vec<EndpointEntry> {
    let mut index: BTreeMap<(String, HttpMethod), BTreeSet<EndpointCaller>> = BTreeMap::new();
    for call in analysis.calls.iter().filter(|c| c.is_resolved()) {
        if let (Some(endpoint), Some(method)) = (&call.endpoint, call.method) {
            index
                .entry((endpoint.clone(), method))
                .or_default()
                .insert(EndpointCaller {
                    component: call.component.clone(),
                    file: call.file.clone(),
                });
        }
    }
    index
        .into_iter()
        .map(|((endpoint, method), callers)| EndpointEntry {
            endpoint,
            method,
            callers: callers.into_iter().collect(),
        })
        .collect()
}

fn coverage_report(
    scope: String,
    analysis: &Analysis,
    diagnostics: ef_core::models::Diagnostics,
) -> CoverageReport {
    let mut counts = CoverageCounts {
        files_analyzed: analysis.files.len(),
        api_calls: analysis.calls.iter().filter(|c| c.is_resolved()).count(),
        unresolved_calls: analysis.calls.iter().filter(|c| !c.is_resolved()).count(),
        resolution_errors: diagnostics.resolution_errors.len(),
        parse_failures: diagnostics.parse_failures.len(),
        write_conflicts: diagnostics.write_conflicts.len(),
        patch_failures: diagnostics.patch_failures.len(),
        ..CoverageCounts::default()
    };

    let mut missing_selectors = Vec::new();
    let mut naming_violations = Vec::new();
    for audit in analysis.audits.values() {
        counts.elements_in_scope += audit.candidates.len();
        counts.selectors_present += audit.present_count();
        for candidate in audit.missing() {
            counts.selectors_missing += 1;
            missing_selectors.push(MissingSelectorRow {
                file: candidate.file.clone(),
                location: candidate.location.to_string(),
                element: candidate.element.clone(),
                tier: candidate.tier.to_string(),
                suggested: candidate.rendered_value(),
            });
        }
        for violation in &audit.violations {
            naming_violations.push(NamingViolationRow {
                file: violation.file.clone(),
                location: violation.location.to_string(),
                current: violation.current.clone(),
                suggested: violation.suggested.clone(),
                kind: violation.kind.to_string(),
            });
        }
    }
    counts.naming_violations = naming_violations.len();
    counts.coverage_percent = if counts.elements_in_scope == 0 {
        100.0
    } else {
        let ratio = counts.selectors_present as f64 / counts.elements_in_scope as f64;
        (ratio * 1000.0).round() / 10.0
    };

    CoverageReport {
        scope,
        files: analysis.files.clone(),
        counts,
        missing_selectors,
        naming_violations,
        diagnostics,
    }
}
