use crate::discovery::{discover_sources, match_entry_points, ProjectLayout};
use crate::path_resolver::{normalize_path, Resolution, TypeScriptPathResolver};
use anyhow::Result;
use ef_core::graph::{ComponentGraph, ImportEdge, SourceModule};
use ef_core::models::{NodeId, ParseFailure, ResolutionError};
use ef_core::parsers::TypeScriptParser;
use ef_core::EfError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Builds the component graph by following imports from entry points
pub struct ModuleGraphBuilder {
    layout: ProjectLayout,
    resolver: TypeScriptPathResolver,
    parser: TypeScriptParser,
    graph: ComponentGraph,
    /// Canonical paths already loaded
    visited: HashSet<PathBuf>,
    depth_warned: bool,
}

impl ModuleGraphBuilder {
    pub fn new(layout: ProjectLayout) -> Self {
        let resolver = TypeScriptPathResolver::new(&layout.root)
            .with_source_roots(&layout.resolved_source_roots())
            .with_aliases(&layout.aliases);
        Self {
            layout,
            resolver,
            parser: TypeScriptParser::new(),
            graph: ComponentGraph::new(),
            visited: HashSet::new(),
            depth_warned: false,
        }
    }

    /// Discovers sources and entry points, then builds the graph.
    ///
    /// When no file matches the entry globs, every source file is loaded and
    /// the files nothing imports become the entry points.
    pub fn build_project(layout: ProjectLayout) -> Result<ComponentGraph> {
        if !layout.root.exists() {
            return Err(EfError::InputUnavailable {
                path: layout.root.clone(),
            }
            .into());
        }
        let files = discover_sources(&layout)?;
        let entries = match_entry_points(&layout, &files)?;
        info!(
            files = files.len(),
            entry_points = entries.len(),
            "Discovered sources"
        );

        if !entries.is_empty() {
            return Self::new(layout).build(&entries);
        }

        warn!("No file matches the entry point globs; inferring entry points from the import graph");
        let mut builder = Self::new(layout);
        for file in &files {
            builder.load_tree(file);
        }
        let roots: Vec<NodeId> = builder
            .graph
            .modules()
            .filter(|(id, m)| !m.parse_failed && builder.graph.importers(*id).is_empty())
            .map(|(id, _)| id)
            .collect();
        Ok(builder.finish(roots))
    }

    /// Builds the graph reachable from `entries`
    pub fn build(mut self, entries: &[PathBuf]) -> Result<ComponentGraph> {
        let mut entries: Vec<PathBuf> = entries.iter().map(|e| normalize_path(e)).collect();
        entries.sort();
        entries.dedup();

        let mut roots = Vec::new();
        for entry in &entries {
            if !entry.is_file() {
                return Err(EfError::InputUnavailable {
                    path: entry.clone(),
                }
                .into());
            }
            roots.push(self.load_tree(entry));
        }
        Ok(self.finish(roots))
    }

    fn finish(mut self, roots: Vec<NodeId>) -> ComponentGraph {
        self.graph.set_entry_points(roots);
        self.graph.finalize();
        info!(
            modules = self.graph.module_count(),
            entry_points = self.graph.entry_points().len(),
            resolution_errors = self.graph.diagnostics.resolution_errors.len(),
            parse_failures = self.graph.diagnostics.parse_failures.len(),
            "Component graph built"
        );
        self.graph
    }

    /// Loads `root` and everything it imports; each module is loaded once
    fn load_tree(&mut self, root: &Path) -> NodeId {
        let (root_id, is_new) = self.load_module(root, 0);
        if !is_new {
            return root_id;
        }
        let mut stack = vec![(root_id, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if let Some(max_depth) = self.layout.max_recursion_depth {
                if depth >= max_depth {
                    if !self.depth_warned {
                        warn!(
                            max_depth,
                            module = self.graph.module(id).map(|m| m.display.as_str()).unwrap_or_default(),
                            "Maximum import depth reached, not descending further"
                        );
                        self.depth_warned = true;
                    }
                    continue;
                }
            }
            let mut discovered = self.expand(id, depth);
            // keep source order when popping
            discovered.reverse();
            stack.extend(discovered.into_iter().map(|child| (child, depth + 1)));
        }
        root_id
    }

    /// Returns the node for `path`, parsing it on first sight
    fn load_module(&mut self, path: &Path, depth: usize) -> (NodeId, bool) {
        let path = normalize_path(path);
        if self.visited.contains(&path) {
            if let Some(id) = self.graph.node_for_path(&path) {
                return (id, false);
            }
        }
        self.visited.insert(path.clone());
        let shown = self.layout.display_path(&path);

        let mut module = match std::fs::read_to_string(&path) {
            Ok(source) => match self.parser.scan_source(&source, &path, &shown) {
                Ok(facts) => SourceModule::new(path.clone(), shown.clone(), facts, source),
                Err(err) => {
                    warn!(file = %shown, error = %err, "Parse failed, keeping module without facts");
                    self.graph.diagnostics.parse_failures.push(ParseFailure {
                        file: shown.clone(),
                        message: err.to_string(),
                    });
                    SourceModule::failed(path.clone(), shown.clone(), source)
                }
            },
            Err(err) => {
                warn!(file = %shown, error = %err, "Cannot read module");
                self.graph.diagnostics.parse_failures.push(ParseFailure {
                    file: shown.clone(),
                    message: err.to_string(),
                });
                SourceModule::failed(path.clone(), shown.clone(), String::new())
            }
        };
        module.depth = depth;
        debug!(file = %shown, depth, "Loaded module");
        (self.graph.add_module(module), true)
    }

    /// Resolves the imports of `id`, adding edges; returns newly loaded modules
    fn expand(&mut self, id: NodeId, depth: usize) -> Vec<NodeId> {
        let Some(module) = self.graph.module(id) else {
            return Vec::new();
        };
        let importer = module.path.clone();
        let importer_display = module.display.clone();
        let imports: Vec<_> = module
            .facts
            .imports
            .iter()
            .map(|i| (i.specifier.clone(), i.kind, i.line))
            .collect();

        let mut discovered = Vec::new();
        for (order, (specifier, kind, line)) in imports.into_iter().enumerate() {
            let edge = ImportEdge {
                specifier: specifier.clone(),
                kind,
                order,
                line,
            };
            match self.resolver.resolve(&specifier, &importer) {
                Resolution::File(path) => {
                    let (child, is_new) = self.load_module(&path, depth + 1);
                    self.graph.add_import(id, child, edge);
                    if is_new {
                        discovered.push(child);
                    }
                }
                Resolution::External(name) => {
                    let leaf = self.graph.add_external(&name);
                    self.graph.add_import(id, leaf, edge);
                }
                Resolution::Missing(reason) => {
                    debug!(importer = %importer_display, specifier = %specifier, "Unresolved import");
                    self.graph.diagnostics.resolution_errors.push(ResolutionError {
                        importer: importer_display.clone(),
                        specifier: specifier.clone(),
                        line,
                        reason,
                    });
                    if let Some(module) = self.graph.module_mut(id) {
                        module.unresolved_imports.push(specifier);
                    }
                }
            }
        }
        discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_cycle_is_represented_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/pages/P.tsx", "import { A } from '../components/A';\nexport default function P() { return <A />; }\n");
        write(root, "src/components/A.tsx", "import { B } from './B';\nexport function A() { return <B />; }\n");
        write(root, "src/components/B.tsx", "import { A } from './A';\nexport function B() { return <div><A /></div>; }\n");

        let graph = ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap();

        assert_eq!(graph.module_count(), 3);
        assert_eq!(graph.entry_points().len(), 1);
        let entry = graph.entry_points()[0];
        let reachable = graph.reachable_from(entry);
        assert_eq!(reachable.len(), 3);

        let a = graph.node_for_display("src/components/A.tsx").unwrap();
        let importers: Vec<String> = graph
            .importers(a)
            .iter()
            .map(|id| graph.module(*id).unwrap().display.clone())
            .collect();
        assert_eq!(importers, vec!["src/components/B.tsx", "src/pages/P.tsx"]);
    }

    #[test]
    fn test_unresolved_and_external_imports() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/pages/Home.tsx",
            "import React from 'react';\nimport { useQuery } from '@tanstack/react-query';\nimport { Gone } from './Gone';\nimport type { User } from '../types';\nimport './home.css';\nexport default function Home() { return <Gone />; }\n",
        );
        write(root, "src/pages/home.css", "");

        let graph = ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap();

        assert_eq!(graph.module_count(), 1);
        let mut externals: Vec<&str> = graph.external_names().collect();
        externals.sort();
        assert_eq!(externals, vec!["@tanstack/react-query", "react", "src/pages/home.css"]);
        assert_eq!(graph.diagnostics.resolution_errors.len(), 1);
        assert_eq!(graph.diagnostics.resolution_errors[0].specifier, "./Gone");
        assert_eq!(graph.diagnostics.resolution_errors[0].line, 3);
    }

    #[test]
    fn test_parse_failure_keeps_node() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/pages/Home.tsx", "import { Broken } from '../components/Broken';\nimport { Ok } from '../components/Ok';\nexport default function Home() { return <Ok />; }\n");
        write(root, "src/components/Broken.tsx", "export function Broken( { return <div>; }\n");
        write(root, "src/components/Ok.tsx", "export function Ok() { return <p>ok</p>; }\n");

        let graph = ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap();

        assert_eq!(graph.module_count(), 3);
        let broken = graph.node_for_display("src/components/Broken.tsx").unwrap();
        assert!(graph.module(broken).unwrap().parse_failed);
        assert!(graph.children(broken).is_empty());
        assert_eq!(graph.diagnostics.parse_failures.len(), 1);
    }

    #[test]
    fn test_entry_points_inferred_without_matching_globs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/App.tsx", "import { List } from './List';\nexport default function App() { return <List />; }\n");
        write(root, "src/List.tsx", "export function List() { return <ul />; }\n");

        let graph = ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap();

        let entries: Vec<&str> = graph
            .entry_points()
            .iter()
            .map(|id| graph.module(*id).unwrap().display.as_str())
            .collect();
        assert_eq!(entries, vec!["src/App.tsx"]);
    }

    #[test]
    fn test_max_depth_stops_descent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/pages/Home.tsx", "import { A } from '../a';\nexport default function Home() { return <A />; }\n");
        write(root, "src/a.tsx", "import { B } from './b';\nexport function A() { return <B />; }\n");
        write(root, "src/b.tsx", "export function B() { return <i />; }\n");

        let layout = ProjectLayout {
            max_recursion_depth: Some(1),
            ..ProjectLayout::for_root(root)
        };
        let graph = ModuleGraphBuilder::build_project(layout).unwrap();

        assert_eq!(graph.module_count(), 2);
        assert!(graph.node_for_display("src/b.tsx").is_none());
    }
}
