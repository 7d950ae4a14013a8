//! Parallel analysis of the component trees below a set of roots.
//!
//! One task per root walks the modules it reaches; every module is analyzed
//! by whichever task claims it first. Tasks only read the graph and fold
//! their results into a shared accumulator, so the outcome does not depend on
//! scheduling once the results are sorted.

use crate::api_extractor::{ApiCallExtractor, Extraction};
use crate::selector_audit::{SelectorAuditor, SelectorRules};
use ef_core::catalog::{CallShapeCatalog, IntegrationCatalog};
use ef_core::graph::ComponentGraph;
use ef_core::models::{ApiCallSite, FileAudit, NodeId, ThirdPartyUsage};
use globset::GlobSet;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use tracing::debug;

/// Modules below one root, in traversal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTree {
    pub root: NodeId,
    pub modules: Vec<NodeId>,
}

/// Everything analysis produced for one scope
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub trees: Vec<RootTree>,
    /// Deduplicated and sorted call sites
    pub calls: Vec<ApiCallSite>,
    pub third_party: ThirdPartyUsage,
    /// Selector audits by display path
    pub audits: BTreeMap<String, FileAudit>,
    /// Display paths of every analyzed module
    pub files: Vec<String>,
}

impl Analysis {
    pub fn calls_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ApiCallSite> + 'a {
        self.calls.iter().filter(move |c| c.file == file)
    }
}

#[derive(Default)]
struct Accumulator {
    trees: Vec<RootTree>,
    extraction: Extraction,
    audits: BTreeMap<String, FileAudit>,
}

pub struct Analyzer<'a> {
    graph: &'a ComponentGraph,
    extractor: ApiCallExtractor<'a>,
    rules: &'a SelectorRules,
    /// Files never audited (tests, stories)
    audit_exclude: &'a GlobSet,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        graph: &'a ComponentGraph,
        catalog: &'a CallShapeCatalog,
        integrations: &'a IntegrationCatalog,
        rules: &'a SelectorRules,
        audit_exclude: &'a GlobSet,
    ) -> Self {
        Self {
            graph,
            extractor: ApiCallExtractor::new(catalog, integrations),
            rules,
            audit_exclude,
        }
    }

    /// Analyzes every module reachable from `roots`
    pub fn analyze(&self, roots: &[NodeId]) -> Analysis {
        let claimed: Mutex<HashSet<NodeId>> = Mutex::new(HashSet::new());
        let accumulator: Mutex<Accumulator> = Mutex::new(Accumulator::default());
        let auditor = SelectorAuditor::new(self.rules);

        roots.par_iter().for_each(|root| {
            let modules = self.graph.reachable_from(*root);
            let mine: Vec<NodeId> = match claimed.lock() {
                Ok(mut claimed) => modules.iter().copied().filter(|id| claimed.insert(*id)).collect(),
                Err(_) => return,
            };

            let mut extraction = Extraction::default();
            let mut audits = Vec::new();
            for id in &mine {
                let Some(module) = self.graph.module(*id) else {
                    continue;
                };
                extraction.merge(Extraction {
                    calls: self.extractor.extract_module(self.graph, *id),
                    third_party: self.extractor.third_party(module),
                });
                if !module.parse_failed
                    && module.is_component_like()
                    && !self.audit_exclude.is_match(&module.display)
                {
                    audits.push(auditor.audit_module(module));
                }
            }
            debug!(root = ?root, modules = modules.len(), analyzed = mine.len(), "Analyzed tree");

            if let Ok(mut acc) = accumulator.lock() {
                acc.trees.push(RootTree {
                    root: *root,
                    modules,
                });
                acc.extraction.merge(extraction);
                for audit in audits {
                    acc.audits.insert(audit.file.clone(), audit);
                }
            }
        });

        let Accumulator {
            mut trees,
            extraction,
            audits,
        } = accumulator.into_inner().unwrap_or_default();
        let order: Vec<NodeId> = roots.to_vec();
        trees.sort_by_key(|t| order.iter().position(|r| *r == t.root));

        let mut files: Vec<String> = trees
            .iter()
            .flat_map(|t| t.modules.iter())
            .filter_map(|id| self.graph.module(*id).map(|m| m.display.clone()))
            .collect();
        files.sort();
        files.dedup();

        Analysis {
            trees,
            calls: extraction.calls,
            third_party: extraction.third_party,
            audits,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{build_globset, ProjectLayout};
    use crate::graph_builder::ModuleGraphBuilder;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_shared_component_analyzed_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/pages/A.tsx", "import { Shared } from '../components/Shared';\nexport default function A() { return <Shared />; }\n");
        write(root, "src/pages/B.tsx", "import { Shared } from '../components/Shared';\nexport default function B() { return <section><Shared /></section>; }\n");
        write(
            root,
            "src/components/Shared.tsx",
            "export function Shared() {\n  const load = () => fetch('/api/items');\n  return <button onClick={load}>Load</button>;\n}\n",
        );

        let graph = ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap();
        let catalog = CallShapeCatalog::default();
        let integrations = IntegrationCatalog::default();
        let rules = SelectorRules::default();
        let exclude = build_globset(&["**/*.test.*".to_string()]).unwrap();
        let analyzer = Analyzer::new(&graph, &catalog, &integrations, &rules, &exclude);

        let first = analyzer.analyze(graph.entry_points());
        let second = analyzer.analyze(graph.entry_points());

        assert_eq!(first.trees.len(), 2);
        assert_eq!(first.calls.len(), 1);
        assert_eq!(first.calls[0].endpoint.as_deref(), Some("/api/items"));
        assert_eq!(first.files, vec!["src/components/Shared.tsx", "src/pages/A.tsx", "src/pages/B.tsx"]);
        assert_eq!(first.audits["src/components/Shared.tsx"].candidates.len(), 1);
        assert_eq!(first.calls, second.calls);
        assert_eq!(first.files, second.files);
    }
}
