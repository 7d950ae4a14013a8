use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ef_core::graph::{ComponentGraph, ImportEdge, SourceModule};
use ef_core::parsers::{ImportKind, TypeScriptParser};
use std::path::{Path, PathBuf};

const MODULES: usize = 200;

fn module_source(i: usize) -> String {
    let next = (i + 1) % MODULES;
    format!(
        "import {{ Widget{next} }} from './Widget{next}';\n\
         export function Widget{i}() {{\n\
           const {{ data }} = useQuery({{ queryKey: ['w{i}'], queryFn: () => fetch('/api/widgets/{i}') }});\n\
           return <div><Widget{next} /><button onClick={{() => save(data)}}>Save</button></div>;\n\
         }}\n"
    )
}

/// Ring of modules: every module imports the next one, the last one closes the cycle
fn build_ring(parser: &TypeScriptParser) -> ComponentGraph {
    let mut graph = ComponentGraph::new();
    let ids: Vec<_> = (0..MODULES)
        .map(|i| {
            let display = format!("src/Widget{i}.tsx");
            let path = PathBuf::from(format!("/bench/{display}"));
            let source = module_source(i);
            let facts = parser
                .scan_source(&source, Path::new(&display), &display)
                .unwrap_or_default();
            graph.add_module(SourceModule::new(path, display, facts, source))
        })
        .collect();
    for (i, id) in ids.iter().enumerate() {
        let next = (i + 1) % MODULES;
        graph.add_import(
            *id,
            ids[next],
            ImportEdge {
                specifier: format!("./Widget{next}"),
                kind: ImportKind::Static,
                order: 0,
                line: 1,
            },
        );
    }
    graph.set_entry_points(vec![ids[0]]);
    graph.finalize();
    graph
}

fn bench_graph_building(c: &mut Criterion) {
    let parser = TypeScriptParser::new();
    c.bench_function("component_graph_ring_build", |b| {
        b.iter(|| {
            black_box(build_ring(&parser));
        });
    });

    let graph = build_ring(&parser);
    let entry = graph.entry_points()[0];
    c.bench_function("component_graph_ring_traversal", |b| {
        b.iter(|| {
            black_box(graph.reachable_from(entry));
        });
    });
}

criterion_group!(benches, bench_graph_building);
criterion_main!(benches);
