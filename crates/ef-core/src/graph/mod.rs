//! Component graph: petgraph arena of source modules keyed by canonical path.
//!
//! Built once, sequentially, and read-only afterwards. Every later stage holds
//! [`NodeId`] references into it.

pub mod module;

pub use module::*;

use crate::models::{Diagnostics, NodeId};
use crate::parsers::{EndpointDefinition, ImportKind, ImportedName};
use indexmap::IndexMap;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction, Graph};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Re-export chains longer than this are not followed
pub const MAX_REEXPORT_DEPTH: usize = 10;

pub type ModuleGraph = Graph<GraphNode, ImportEdge, Directed, u32>;

#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    graph: ModuleGraph,
    paths: IndexMap<PathBuf, NodeId>,
    externals: IndexMap<String, NodeId>,
    entry_points: Vec<NodeId>,
    /// Exported name -> declarations, per module
    symbols: HashMap<NodeId, IndexMap<String, Vec<SymbolTarget>>>,
    /// `builder.query` / `builder.mutation` definitions by endpoint name
    definitions: IndexMap<String, Vec<(NodeId, EndpointDefinition)>>,
    pub diagnostics: Diagnostics,
}

impl ComponentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module, or returns the existing node for the same canonical path
    pub fn add_module(&mut self, module: SourceModule) -> NodeId {
        if let Some(id) = self.paths.get(&module.path) {
            return *id;
        }
        let path = module.path.clone();
        let id = NodeId::from(self.graph.add_node(GraphNode::Module(Box::new(module))));
        self.paths.insert(path, id);
        id
    }

    /// Adds an opaque leaf, deduplicated by name
    pub fn add_external(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.externals.get(name) {
            return *id;
        }
        let id = NodeId::from(self.graph.add_node(GraphNode::External {
            name: name.to_string(),
        }));
        self.externals.insert(name.to_string(), id);
        id
    }

    pub fn add_import(&mut self, from: NodeId, to: NodeId, edge: ImportEdge) {
        let duplicate = self
            .graph
            .edges_connecting(*from, *to)
            .any(|e| e.weight().specifier == edge.specifier);
        if !duplicate {
            self.graph.add_edge(*from, *to, edge);
        }
    }

    pub fn module(&self, id: NodeId) -> Option<&SourceModule> {
        self.graph.node_weight(*id).and_then(GraphNode::as_module)
    }

    pub fn module_mut(&mut self, id: NodeId) -> Option<&mut SourceModule> {
        match self.graph.node_weight_mut(*id) {
            Some(GraphNode::Module(module)) => Some(module.as_mut()),
            _ => None,
        }
    }

    pub fn external_name(&self, id: NodeId) -> Option<&str> {
        match self.graph.node_weight(*id) {
            Some(GraphNode::External { name }) => Some(name),
            _ => None,
        }
    }

    pub fn node_for_path(&self, path: &Path) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    pub fn node_for_display(&self, display: &str) -> Option<NodeId> {
        self.modules()
            .find(|(_, m)| m.display == display)
            .map(|(id, _)| id)
    }

    /// Modules in insertion order
    pub fn modules(&self) -> impl Iterator<Item = (NodeId, &SourceModule)> {
        self.paths
            .values()
            .filter_map(move |id| self.module(*id).map(|m| (*id, m)))
    }

    /// Modules ordered by display path
    pub fn sorted_modules(&self) -> Vec<(NodeId, &SourceModule)> {
        let mut modules: Vec<_> = self.modules().collect();
        modules.sort_by(|a, b| a.1.display.cmp(&b.1.display));
        modules
    }

    pub fn module_count(&self) -> usize {
        self.paths.len()
    }

    pub fn external_names(&self) -> impl Iterator<Item = &str> {
        self.externals.keys().map(|s| s.as_str())
    }

    pub fn entry_points(&self) -> &[NodeId] {
        &self.entry_points
    }

    /// Sets entry points, ordered by display path
    pub fn set_entry_points(&mut self, mut entries: Vec<NodeId>) {
        entries.sort_by(|a, b| self.display(*a).cmp(self.display(*b)));
        entries.dedup();
        self.entry_points = entries;
    }

    pub fn is_entry_point(&self, id: NodeId) -> bool {
        self.entry_points.contains(&id)
    }

    fn display(&self, id: NodeId) -> &str {
        self.module(id).map(|m| m.display.as_str()).unwrap_or_default()
    }

    /// Outgoing import edges in source order
    pub fn imports(&self, id: NodeId) -> Vec<(NodeId, &ImportEdge)> {
        let mut edges: Vec<(NodeId, &ImportEdge)> = self
            .graph
            .edges_directed(*id, Direction::Outgoing)
            .map(|e| (NodeId::from(e.target()), e.weight()))
            .collect();
        edges.sort_by_key(|(_, edge)| edge.order);
        edges
    }

    /// Internal modules imported by `id`, in import order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.imports(id)
            .into_iter()
            .map(|(target, _)| target)
            .filter(|target| self.module(*target).is_some() && seen.insert(*target))
            .collect()
    }

    /// Modules importing `id`, ordered by display path
    pub fn importers(&self, id: NodeId) -> Vec<NodeId> {
        let mut importers: Vec<NodeId> = self
            .graph
            .neighbors_directed(*id, Direction::Incoming)
            .map(NodeId::from)
            .collect();
        importers.sort_by(|a, b| self.display(*a).cmp(self.display(*b)));
        importers.dedup();
        importers
    }

    /// Internal modules reachable from `start` (included), depth-first in import order.
    /// Each module appears once even when reachable through a cycle.
    pub fn reachable_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if self.module(id).is_none() || !visited.insert(id) {
                continue;
            }
            order.push(id);
            for child in self.children(id).into_iter().rev() {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Where an import specifier written in module `id` leads
    pub fn import_target(&self, id: NodeId, specifier: &str) -> Option<ImportTarget<'_>> {
        if let Some(target) = self
            .imports(id)
            .into_iter()
            .find(|(_, edge)| edge.specifier == specifier)
            .map(|(target, _)| target)
        {
            return Some(match self.external_name(target) {
                Some(name) => ImportTarget::External(name),
                None => ImportTarget::Module(target),
            });
        }
        self.module(id)
            .filter(|m| m.unresolved_imports.iter().any(|s| s == specifier))
            .map(|_| ImportTarget::Unresolved)
    }

    /// Declarations an exported name of module `id` resolves to, following re-exports
    pub fn resolve_export(&self, id: NodeId, name: &str) -> Vec<SymbolTarget> {
        if let Some(targets) = self.symbols.get(&id).and_then(|exports| exports.get(name)) {
            return targets.clone();
        }
        let mut out = Vec::new();
        self.collect_export(id, name, 0, &mut out, &mut HashSet::new());
        out.sort();
        out.dedup();
        out
    }

    /// Declarations a name in scope of module `id` resolves to: a local declaration
    /// or the export behind an import binding
    pub fn resolve_local(&self, id: NodeId, local: &str) -> Vec<SymbolTarget> {
        let mut out = Vec::new();
        self.collect_local(id, local, 0, &mut out, &mut HashSet::new());
        out.sort();
        out.dedup();
        out
    }

    fn collect_export(
        &self,
        id: NodeId,
        name: &str,
        depth: usize,
        out: &mut Vec<SymbolTarget>,
        seen: &mut HashSet<(NodeId, String)>,
    ) {
        if depth > MAX_REEXPORT_DEPTH || !seen.insert((id, name.to_string())) {
            return;
        }
        let Some(module) = self.module(id) else {
            return;
        };

        let mut found = false;
        for export in module.facts.exports.iter().filter(|e| e.name == name) {
            found = true;
            let local = export.local.as_deref().unwrap_or(name);
            match &export.source {
                Some(specifier) => {
                    if let Some(ImportTarget::Module(target)) = self.import_target(id, specifier) {
                        if local == "*" {
                            out.push(SymbolTarget {
                                module: target,
                                local: "*".to_string(),
                            });
                        } else {
                            self.collect_export(target, local, depth + 1, out, seen);
                        }
                    }
                }
                None => self.collect_local(id, local, depth, out, seen),
            }
        }

        if !found && name != "default" {
            for import in module
                .facts
                .imports
                .iter()
                .filter(|i| i.kind == ImportKind::ReExportAll)
            {
                if let Some(ImportTarget::Module(target)) = self.import_target(id, &import.specifier)
                {
                    self.collect_export(target, name, depth + 1, out, seen);
                }
            }
        }
    }

    fn collect_local(
        &self,
        id: NodeId,
        local: &str,
        depth: usize,
        out: &mut Vec<SymbolTarget>,
        seen: &mut HashSet<(NodeId, String)>,
    ) {
        let Some(module) = self.module(id) else {
            return;
        };
        let binding = module
            .facts
            .imports
            .iter()
            .filter(|i| i.kind == ImportKind::Static)
            .find_map(|i| i.bindings.iter().find(|b| b.local == local).map(|b| (i, b)));

        match binding {
            Some((import, binding)) => {
                if let Some(ImportTarget::Module(target)) = self.import_target(id, &import.specifier)
                {
                    match &binding.imported {
                        ImportedName::Named(name) => {
                            self.collect_export(target, name, depth + 1, out, seen)
                        }
                        ImportedName::Default => {
                            self.collect_export(target, "default", depth + 1, out, seen)
                        }
                        ImportedName::Namespace => out.push(SymbolTarget {
                            module: target,
                            local: "*".to_string(),
                        }),
                    }
                }
            }
            None => out.push(SymbolTarget {
                module: id,
                local: local.to_string(),
            }),
        }
    }

    /// Endpoint definitions declared under `name` anywhere in the graph
    pub fn endpoint_definitions(&self, name: &str) -> &[(NodeId, EndpointDefinition)] {
        self.definitions
            .get(name)
            .map(|defs| defs.as_slice())
            .unwrap_or_default()
    }

    /// Derives roles, the exported-symbol index and the endpoint definition index.
    /// Called once after every module and edge is in place.
    pub fn finalize(&mut self) {
        let ids: Vec<NodeId> = self.paths.values().copied().collect();

        for id in &ids {
            let is_entry = self.is_entry_point(*id);
            if let Some(module) = self.module_mut(*id) {
                module.role = if is_entry {
                    ModuleRole::Page
                } else if module.facts.has_jsx()
                    || module.facts.exports.iter().any(|e| {
                        e.source.is_none()
                            && e.name.starts_with(|c: char| c.is_ascii_uppercase())
                            && module
                                .facts
                                .function(e.local.as_deref().unwrap_or(&e.name))
                                .is_some()
                    })
                {
                    ModuleRole::Component
                } else {
                    ModuleRole::Module
                };
            }
        }

        let mut symbols = HashMap::new();
        let mut definitions: IndexMap<String, Vec<(NodeId, EndpointDefinition)>> = IndexMap::new();
        for id in &ids {
            let Some(module) = self.module(*id) else {
                continue;
            };
            let mut exports = IndexMap::new();
            for export in module.facts.exports.iter().filter(|e| e.name != "*") {
                let mut out = Vec::new();
                self.collect_export(*id, &export.name, 0, &mut out, &mut HashSet::new());
                out.sort();
                out.dedup();
                exports.insert(export.name.clone(), out);
            }
            symbols.insert(*id, exports);

            for definition in module.facts.endpoint_definitions() {
                definitions
                    .entry(definition.name.clone())
                    .or_default()
                    .push((*id, definition));
            }
        }
        self.symbols = symbols;
        self.definitions = definitions;
        self.diagnostics.normalize();

        tracing::debug!(
            modules = self.module_count(),
            externals = self.externals.len(),
            entry_points = self.entry_points.len(),
            "Component graph finalized"
        );
    }
}
