use ef_core::catalog::{CallShapeCatalog, IntegrationCatalog};
use ef_core::graph::ComponentGraph;
use ef_core::models::{CoverageReport, HttpMethod, InventoryDocument};
use ef_typescript::{
    build_globset, plan_patch, Analyzer, ModuleGraphBuilder, PatchOptions, ProjectLayout,
    ReportEmitter, Scope, SelectorAuditor, SelectorRules,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn build(root: &Path) -> ComponentGraph {
    ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap()
}

fn run(root: &Path, scope: &Scope) -> (InventoryDocument, CoverageReport) {
    let graph = build(root);
    let catalog = CallShapeCatalog::default();
    let integrations = IntegrationCatalog::default();
    let rules = SelectorRules::default();
    let exclude = build_globset(&ProjectLayout::default().exclude).unwrap();
    let analyzer = Analyzer::new(&graph, &catalog, &integrations, &rules, &exclude);
    ReportEmitter::new(&graph, analyzer, root).emit(scope)
}

#[test]
fn test_import_cycle_lists_each_module_once() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "src/pages/P.tsx", "import { A } from '../components/A';\nexport default function P() { return <A />; }\n");
    write(root, "src/components/A.tsx", "import { B } from './B';\nexport function A() { return <B />; }\n");
    write(root, "src/components/B.tsx", "import { A } from './A';\nexport function B() { return <div><A /></div>; }\n");

    let (inventory, coverage) = run(root, &Scope::Full);

    assert_eq!(inventory.pages.len(), 1);
    let page = &inventory.pages["src/pages/P.tsx"];
    let subcomponents: Vec<&str> = page.subcomponents.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(subcomponents, vec!["A", "B"]);
    assert_eq!(
        coverage.files,
        vec!["src/components/A.tsx", "src/components/B.tsx", "src/pages/P.tsx"]
    );
}

#[test]
fn test_shared_endpoint_has_one_entry_with_two_callers() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "src/pages/Users.tsx",
        "import { UserCard } from '../components/UserCard';\nimport { UserBadge } from '../components/UserBadge';\nexport default function Users({ id }) { return <main><UserCard id={id} /><UserBadge id={id} /></main>; }\n",
    );
    write(
        root,
        "src/components/UserCard.tsx",
        "import axios from 'axios';\nexport function UserCard({ id }) {\n  useEffect(() => { axios.get(`/users/${id}/`); }, [id]);\n  return <article />;\n}\n",
    );
    write(
        root,
        "src/components/UserBadge.tsx",
        "export function UserBadge({ id }) {\n  const { data } = useSWR(`/users/${id}/`, fetcher);\n  return <span>{data?.name}</span>;\n}\n",
    );

    let (inventory, _) = run(root, &Scope::Full);

    let matching: Vec<_> = inventory
        .endpoints
        .iter()
        .filter(|e| e.endpoint == "/users/{id}/" && e.method == HttpMethod::Get)
        .collect();
    assert_eq!(matching.len(), 1);
    let callers: Vec<&str> = matching[0].callers.iter().map(|c| c.component.as_str()).collect();
    assert_eq!(callers, vec!["UserBadge", "UserCard"]);
}

#[test]
fn test_inventory_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "src/pages/Home.tsx", "import { Feed } from '../components/Feed';\nimport { Nav } from '../components/Nav';\nexport default function Home() {\n  useQuery({ queryKey: ['me'], queryFn: () => api.get('/me') });\n  return <><Nav /><Feed /></>;\n}\n");
    write(root, "src/components/Feed.tsx", "export function Feed() {\n  const post = () => fetch('/api/posts', { method: 'POST' });\n  const { data } = useQuery({ queryKey: ['posts'], queryFn: () => fetch('/api/posts') });\n  return <ul>{data.map(p => <li key={p.id}>{p.title}</li>)}<button onClick={post}>Post</button></ul>;\n}\n");
    write(root, "src/components/Nav.tsx", "export function Nav() { return <nav><a href=\"/\">Home</a><a href=\"/settings\">Settings</a></nav>; }\n");

    let (first_inventory, first_coverage) = run(root, &Scope::Full);
    let (second_inventory, second_coverage) = run(root, &Scope::Full);

    assert_eq!(
        serde_json::to_string_pretty(&first_inventory).unwrap(),
        serde_json::to_string_pretty(&second_inventory).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first_coverage).unwrap(),
        serde_json::to_string(&second_coverage).unwrap()
    );
}

#[test]
fn test_form_button_patch_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "src/pages/Signup.tsx",
        "import { SignupForm } from '../components/SignupForm';\nexport default function Signup() { return <SignupForm />; }\n",
    );
    write(
        root,
        "src/components/SignupForm.tsx",
        "export function SignupForm() {\n  return (\n    <div className=\"card\">\n      <p>Create an account</p>\n      <button>Sign up</button>\n    </div>\n  );\n}\n",
    );

    let graph = build(root);
    let rules = SelectorRules::default();
    let auditor = SelectorAuditor::new(&rules);
    let id = graph.node_for_display("src/components/SignupForm.tsx").unwrap();
    let module = graph.module(id).unwrap();
    let audit = auditor.audit_module(module);

    assert_eq!(audit.candidates.len(), 1);
    assert_eq!(audit.candidates[0].suggested, "signup-form-sign-up-button");
    plan_patch(module, &audit, PatchOptions::default())
        .unwrap()
        .commit()
        .unwrap();

    let patched = std::fs::read_to_string(root.join("src/components/SignupForm.tsx")).unwrap();
    assert!(patched.contains("<button data-testid=\"signup-form-sign-up-button\">Sign up</button>"));

    let graph = build(root);
    let id = graph.node_for_display("src/components/SignupForm.tsx").unwrap();
    let second = auditor.audit_module(graph.module(id).unwrap());
    assert_eq!(second.missing().count(), 0);
    assert!(second.violations.is_empty());
}

#[test]
fn test_iteration_instances_get_distinct_selectors() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "src/pages/Grid.tsx",
        "export default function Grid({ rows }) {\n  return (\n    <table>\n      {rows.map((row) => (\n        <tr>\n          {row.cells.map((cell) => <td onClick={() => select(cell)}>{cell.label}</td>)}\n        </tr>\n      ))}\n    </table>\n  );\n}\n",
    );

    let graph = build(root);
    let rules = SelectorRules::default();
    let id = graph.node_for_display("src/pages/Grid.tsx").unwrap();
    let module = graph.module(id).unwrap();
    let audit = SelectorAuditor::new(&rules).audit_module(module);

    let cell = audit.candidates.iter().find(|c| c.element == "td").unwrap();
    assert_eq!(cell.disambiguators, vec!["index".to_string(), "index2".to_string()]);
    let patched = plan_patch(module, &audit, PatchOptions::default()).unwrap().new_text;
    assert!(patched.contains("rows.map((row, index) =>"));
    assert!(patched.contains("row.cells.map((cell, index2) =>"));
    assert!(patched.contains("data-testid={`grid-select-cell-${index}-${index2}`}"));

    let rows = ["a", "b"];
    let cells = ["x", "y", "z"];
    let mut rendered = std::collections::HashSet::new();
    for (index, _) in rows.iter().enumerate() {
        for (index2, _) in cells.iter().enumerate() {
            rendered.insert(format!("grid-select-cell-{}-{}", index, index2));
        }
    }
    assert_eq!(rendered.len(), rows.len() * cells.len());
}

#[test]
fn test_comment_only_change_keeps_findings() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let component = |comment: &str| {
        format!(
            "export function Cart() {{\n  // {}\n  const checkout = () => fetch('/api/checkout/', {{ method: 'POST' }});\n  return <button onClick={{checkout}}>Checkout</button>;\n}}\n",
            comment
        )
    };
    write(root, "src/pages/Shop.tsx", "import { Cart } from '../components/Cart';\nexport default function Shop() { return <Cart />; }\n");
    write(root, "src/components/Cart.tsx", &component("sends the cart"));
    let scope = Scope::ChangeSet(vec![PathBuf::from("src/components/Cart.tsx")]);
    let (before_inventory, before_coverage) = run(root, &scope);

    write(root, "src/components/Cart.tsx", &component("submits the cart to the checkout API"));
    let (after_inventory, after_coverage) = run(root, &scope);

    assert_eq!(before_inventory, after_inventory);
    assert_eq!(before_coverage, after_coverage);
    assert_eq!(after_inventory.endpoints.len(), 1);
    assert_eq!(after_coverage.counts.selectors_missing, 1);
}

#[test]
fn test_change_set_files_are_subset_of_full_run() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "src/pages/A.tsx", "import { Shared } from '../components/Shared';\nexport default function A() { return <Shared />; }\n");
    write(root, "src/pages/B.tsx", "export default function B() { return <button onClick={go}>Go</button>; }\n");
    write(root, "src/components/Shared.tsx", "import { Leaf } from './Leaf';\nexport function Shared() { return <section><Leaf /></section>; }\n");
    write(root, "src/components/Leaf.tsx", "export function Leaf() { return <input name=\"q\" />; }\n");
    write(root, "src/components/Unused.tsx", "export function Unused() { return <button>Never</button>; }\n");

    let (full, full_coverage) = run(root, &Scope::Full);
    for changed in [
        vec!["src/components/Shared.tsx"],
        vec!["src/components/Leaf.tsx", "src/pages/A.tsx"],
        vec!["src/components/Unused.tsx"],
    ] {
        let scope = Scope::ChangeSet(changed.iter().map(PathBuf::from).collect());
        let (inventory, coverage) = run(root, &scope);
        assert!(inventory.files().is_subset(&full.files()));
        assert!(coverage.files.iter().all(|f| full_coverage.files.contains(f)));
        assert!(!coverage.files.contains(&"src/pages/B.tsx".to_string()));
    }
}

#[test]
fn test_changed_import_cycle_survives_unrelated_change() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "src/pages/P.tsx",
        "import { A } from '../components/A';\nimport { C } from '../components/C';\nexport default function P() { return <main><A /><C /></main>; }\n",
    );
    write(root, "src/components/A.tsx", "import { B } from './B';\nexport function A() { return <B />; }\n");
    write(root, "src/components/B.tsx", "import { A } from './A';\nexport function B() { return <div><A /></div>; }\n");
    write(root, "src/components/C.tsx", "export function C() { return <button onClick={save}>Save</button>; }\n");

    let changed = ["src/components/A.tsx", "src/components/B.tsx", "src/components/C.tsx"];
    let (_, coverage) = run(root, &Scope::ChangeSet(changed.iter().map(PathBuf::from).collect()));
    assert_eq!(coverage.files, changed.to_vec());

    // the page reaches the whole cycle, so it alone stands for every change
    let mut with_page: Vec<PathBuf> = changed.iter().map(PathBuf::from).collect();
    with_page.push(PathBuf::from("src/pages/P.tsx"));
    let (_, coverage) = run(root, &Scope::ChangeSet(with_page));
    assert_eq!(
        coverage.files,
        vec!["src/components/A.tsx", "src/components/B.tsx", "src/components/C.tsx", "src/pages/P.tsx"]
    );
}
