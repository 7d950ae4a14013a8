use std::fs;

use anyhow::Result;
use ef_cli::commands::mocks::run_mocks;
use ef_cli::config::{Config, DEFAULT_CONFIG_FILE};
use ef_mock::{MockFormat, MockSet, RouteAction, RouteKind};

fn create_temp_project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let tmp_dir = tempfile::tempdir().expect("failed to create temp dir");
    for (path, content) in files {
        let full_path = tmp_dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&full_path, content).expect("failed to write file");
    }
    tmp_dir
}

fn todo_project() -> tempfile::TempDir {
    create_temp_project(&[
        (
            "src/pages/Todos.tsx",
            "import posthog from 'posthog-js';\nexport default function Todos() {\n  const { data } = useQuery({ queryKey: ['todos'], queryFn: () => fetch('/api/todos/') });\n  const add = () => fetch('/api/todos/', { method: 'POST' });\n  posthog.capture('todos_viewed');\n  return <button onClick={add}>Add</button>;\n}\n",
        ),
        (
            DEFAULT_CONFIG_FILE,
            "[mocks]\nwire_case = \"camel-case\"\n\n[output]\nmocks = \"e2e/fixtures/mocks.json\"\n",
        ),
    ])
}

fn load(project: &tempfile::TempDir) -> Config {
    let path = project.path().join(DEFAULT_CONFIG_FILE);
    Config::load(path.to_str().unwrap(), None).expect("config should load")
}

#[test]
fn mocks_follow_the_inventory() -> Result<()> {
    let project = todo_project();
    let config = load(&project);

    let summary = run_mocks(&config, None, None)?;

    assert_eq!(summary.format, MockFormat::Json);
    assert_eq!(summary.path, project.path().join("e2e/fixtures/mocks.json"));
    let written: MockSet = serde_json::from_str(&fs::read_to_string(&summary.path)?)?;
    assert_eq!(written.routes, summary.set.routes);

    let list = written.route("get-api-todos").expect("collection route");
    match &list.action {
        RouteAction::Fulfill { status, body: Some(body), .. } => {
            assert_eq!(*status, 200);
            assert!(body.get("results").is_some());
        }
        other => panic!("unexpected action {:?}", other),
    }
    let create = written.route("post-api-todos").expect("create route");
    assert!(matches!(create.action, RouteAction::Fulfill { status: 201, .. }));
    assert_eq!(written.routes_of(RouteKind::TelemetryBlock).count(), 1);
    Ok(())
}

#[test]
fn output_extension_selects_the_format() -> Result<()> {
    let project = todo_project();
    let config = load(&project);
    let output = project.path().join("playwright/mocks.ts");

    let summary = run_mocks(&config, None, Some(output.clone()))?;

    assert_eq!(summary.format, MockFormat::Playwright);
    let module = fs::read_to_string(&output)?;
    assert!(module.contains("installMocks"));
    assert!(module.contains("page.route"));

    let explicit = run_mocks(&config, Some(MockFormat::Yaml), None)?;
    assert_eq!(explicit.path, project.path().join("e2e/fixtures/mocks.yaml"));
    let parsed: MockSet = serde_yaml::from_str(&fs::read_to_string(&explicit.path)?)?;
    assert_eq!(parsed.routes.len(), explicit.set.routes.len());
    Ok(())
}
