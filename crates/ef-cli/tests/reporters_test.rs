use std::fs;

use anyhow::Result;
use ef_cli::reporters::{write_inventory, JsonReporter, MarkdownReporter};
use ef_core::models::{
    ApiCallSite, CoverageCounts, CoverageReport, HookKind, InventoryDocument, Location,
    MissingSelectorRow, ResolutionStatus, UnresolvedReason,
};

fn unresolved_call(component: &str, reason: UnresolvedReason) -> ApiCallSite {
    let file = format!("src/pages/{}.tsx", component);
    ApiCallSite {
        endpoint: None,
        method: None,
        hook_kind: HookKind::Client,
        component: component.to_string(),
        location: Location::new(file.clone(), 7, 5),
        file,
        status: ResolutionStatus::Unresolved(reason),
        callee: "axios.get".to_string(),
    }
}

fn build_documents() -> (CoverageReport, InventoryDocument) {
    let inventory = InventoryDocument {
        scope: "full".to_string(),
        unresolved: vec![
            unresolved_call("Search", UnresolvedReason::DynamicUrl),
            unresolved_call("Orders", UnresolvedReason::DynamicUrl),
        ],
        ..InventoryDocument::default()
    };
    let coverage = CoverageReport {
        scope: "full".to_string(),
        files: vec!["src/pages/Search.tsx".to_string()],
        counts: CoverageCounts {
            files_analyzed: 1,
            elements_in_scope: 2,
            selectors_present: 1,
            selectors_missing: 1,
            coverage_percent: 50.0,
            api_calls: 2,
            unresolved_calls: 2,
            ..CoverageCounts::default()
        },
        missing_selectors: vec![MissingSelectorRow {
            file: "src/pages/Search.tsx".to_string(),
            location: "src/pages/Search.tsx:9:12".to_string(),
            element: "button".to_string(),
            tier: "text".to_string(),
            suggested: "search-submit-button".to_string(),
        }],
        ..CoverageReport::default()
    };
    (coverage, inventory)
}

#[test]
fn json_reporter_produces_extended_summary() -> Result<()> {
    let tmp_dir = tempfile::tempdir()?;
    let output_path = tmp_dir.path().join("reports/coverage.json");
    let (coverage, inventory) = build_documents();

    JsonReporter.generate(&coverage, &inventory, output_path.to_str().unwrap())?;

    let content = fs::read_to_string(&output_path)?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let summary = &json["summary"];
    assert_eq!(summary["scope"], "full");
    assert_eq!(summary["selectors_missing"], 1);
    assert_eq!(summary["unresolved_total"], 2);
    assert_eq!(summary["unresolved_by_reason"]["dynamic-url"], 2);
    assert_eq!(json["unresolved"].as_array().map(Vec::len), Some(2));
    assert!(json.get("timestamp").is_some());
    Ok(())
}

#[test]
fn markdown_reporter_lists_rows_and_recommendations() -> Result<()> {
    let tmp_dir = tempfile::tempdir()?;
    let output_path = tmp_dir.path().join("coverage.md");
    let (coverage, inventory) = build_documents();

    MarkdownReporter.generate(&coverage, &inventory, output_path.to_str().unwrap())?;

    let content = fs::read_to_string(&output_path)?;
    assert!(content.contains("- **Selector Coverage**: 50.0%"));
    assert!(content.contains("| src/pages/Search.tsx | src/pages/Search.tsx:9:12 | `button` | text | `search-submit-button` |"));
    assert!(content.contains("## Unresolved API Calls"));
    assert!(content.contains("| src/pages/Orders.tsx:7:5 | Orders | `axios.get` | unresolved:dynamic-url |"));
    assert!(content.contains("2 call(s) `dynamic-url`"));
    assert!(content.contains("e2e-forge scan --fix"));
    Ok(())
}

#[test]
fn inventory_file_is_byte_stable() -> Result<()> {
    let tmp_dir = tempfile::tempdir()?;
    let output_path = tmp_dir.path().join("inventory.json");
    let (_, inventory) = build_documents();

    write_inventory(&inventory, output_path.to_str().unwrap())?;
    let first = fs::read_to_string(&output_path)?;
    write_inventory(&inventory, output_path.to_str().unwrap())?;

    assert_eq!(first, fs::read_to_string(&output_path)?);
    assert!(first.ends_with("}\n"));
    let parsed: InventoryDocument = serde_json::from_str(&first)?;
    assert_eq!(parsed, inventory);
    Ok(())
}
