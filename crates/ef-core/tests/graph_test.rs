use std::path::{Path, PathBuf};

use ef_core::graph::{ComponentGraph, ImportEdge, ModuleRole, SourceModule, SymbolTarget};
use ef_core::models::NodeId;
use ef_core::parsers::{ImportKind, TypeScriptParser};

fn add(graph: &mut ComponentGraph, display: &str, source: &str) -> NodeId {
    let facts = TypeScriptParser::new()
        .scan_source(source, Path::new(display), display)
        .expect("fixture should parse");
    let path = PathBuf::from("/project").join(display);
    graph.add_module(SourceModule::new(path, display.to_string(), facts, source.to_string()))
}

fn link(graph: &mut ComponentGraph, from: NodeId, to: NodeId, specifier: &str, kind: ImportKind, order: usize) {
    graph.add_import(
        from,
        to,
        ImportEdge {
            specifier: specifier.to_string(),
            kind,
            order,
            line: order + 1,
        },
    );
}

#[test]
fn barrel_exports_resolve_to_declarations() {
    let mut graph = ComponentGraph::new();
    let page = add(
        &mut graph,
        "src/pages/Home.tsx",
        "import { Button, Card } from '../components';\nexport default function Home() { return <Card><Button /></Card>; }\n",
    );
    let barrel = add(
        &mut graph,
        "src/components/index.ts",
        "export { Button } from './Button';\nexport * from './Card';\n",
    );
    let button = add(
        &mut graph,
        "src/components/Button.tsx",
        "export function Button() { return <button>Go</button>; }\n",
    );
    let card = add(
        &mut graph,
        "src/components/Card.tsx",
        "export function Card({ children }) { return <section>{children}</section>; }\n",
    );
    link(&mut graph, page, barrel, "../components", ImportKind::Static, 0);
    link(&mut graph, barrel, button, "./Button", ImportKind::ReExport, 0);
    link(&mut graph, barrel, card, "./Card", ImportKind::ReExportAll, 1);
    graph.set_entry_points(vec![page]);
    graph.finalize();

    assert_eq!(
        graph.resolve_local(page, "Button"),
        vec![SymbolTarget {
            module: button,
            local: "Button".to_string(),
        }]
    );
    assert_eq!(
        graph.resolve_local(page, "Card"),
        vec![SymbolTarget {
            module: card,
            local: "Card".to_string(),
        }]
    );
    assert_eq!(graph.module(page).unwrap().role, ModuleRole::Page);
    assert_eq!(graph.module(button).unwrap().role, ModuleRole::Component);
    assert_eq!(graph.module(barrel).unwrap().role, ModuleRole::Module);
}

#[test]
fn cycles_are_traversed_once() {
    let mut graph = ComponentGraph::new();
    let page = add(
        &mut graph,
        "src/pages/P.tsx",
        "import { A } from '../components/A';\nexport default function P() { return <A />; }\n",
    );
    let a = add(
        &mut graph,
        "src/components/A.tsx",
        "import { B } from './B';\nexport function A() { return <B />; }\n",
    );
    let b = add(
        &mut graph,
        "src/components/B.tsx",
        "import { A } from './A';\nexport function B() { return <div><A /></div>; }\n",
    );
    link(&mut graph, page, a, "../components/A", ImportKind::Static, 0);
    link(&mut graph, a, b, "./B", ImportKind::Static, 0);
    link(&mut graph, b, a, "./A", ImportKind::Static, 0);
    // same specifier twice is one edge
    link(&mut graph, b, a, "./A", ImportKind::Static, 0);
    graph.set_entry_points(vec![page]);
    graph.finalize();

    assert_eq!(graph.reachable_from(page), vec![page, a, b]);
    assert_eq!(graph.reachable_from(b), vec![b, a]);
    assert_eq!(graph.children(b), vec![a]);
    assert_eq!(graph.importers(a), vec![b, page]);
}

#[test]
fn externals_are_leaves() {
    let mut graph = ComponentGraph::new();
    let page = add(
        &mut graph,
        "src/pages/Q.tsx",
        "import axios from 'axios';\nexport default function Q() { return <p />; }\n",
    );
    let axios = graph.add_external("axios");
    assert_eq!(graph.add_external("axios"), axios);
    link(&mut graph, page, axios, "axios", ImportKind::Static, 0);
    graph.set_entry_points(vec![page]);
    graph.finalize();

    assert_eq!(graph.external_name(axios), Some("axios"));
    assert!(graph.children(page).is_empty());
    assert_eq!(graph.reachable_from(page), vec![page]);
    assert_eq!(graph.module_count(), 1);
}
