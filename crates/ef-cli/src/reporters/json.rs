use anyhow::{Context, Result};
use ef_core::models::{CoverageReport, InventoryDocument, ResolutionStatus};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// JSON report generator
pub struct JsonReporter;

impl JsonReporter {
    /// Generates a JSON coverage report
    pub fn generate(
        &self,
        coverage: &CoverageReport,
        inventory: &InventoryDocument,
        output_path: &str,
    ) -> Result<()> {
        let report = serde_json::json!({
            "version": "1.0.0",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "summary": Self::build_summary(coverage, inventory),
            "coverage": coverage,
            "unresolved": inventory.unresolved,
        });

        let json_string = serde_json::to_string_pretty(&report)?;
        super::ensure_parent(output_path)?;
        fs::write(Path::new(output_path), json_string)
            .with_context(|| format!("Failed to write report: {}", output_path))?;
        Ok(())
    }

    fn build_summary(coverage: &CoverageReport, inventory: &InventoryDocument) -> serde_json::Value {
        let mut unresolved_by_reason: BTreeMap<&'static str, usize> = BTreeMap::new();
        for site in &inventory.unresolved {
            if let ResolutionStatus::Unresolved(reason) = site.status {
                *unresolved_by_reason.entry(reason.as_str()).or_insert(0) += 1;
            }
        }
        let integrations: Vec<&str> = inventory
            .third_party
            .integrations
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        let telemetry: Vec<&str> = inventory
            .third_party
            .telemetry
            .iter()
            .map(|t| t.name.as_str())
            .collect();

        serde_json::json!({
            "scope": coverage.scope,
            "pages": inventory.pages.len(),
            "endpoints": inventory.endpoints.len(),
            "coverage_percent": coverage.counts.coverage_percent,
            "selectors_missing": coverage.counts.selectors_missing,
            "naming_violations": coverage.counts.naming_violations,
            "unresolved_total": coverage.unresolved_total(),
            "unresolved_by_reason": unresolved_by_reason,
            "third_party": {
                "integrations": integrations,
                "telemetry": telemetry,
            },
        })
    }
}

/// Writes the inventory document; no timestamp so unchanged trees give
/// byte-identical files
pub fn write_inventory(inventory: &InventoryDocument, output_path: &str) -> Result<()> {
    let mut json_string = serde_json::to_string_pretty(inventory)?;
    json_string.push('\n');
    super::ensure_parent(output_path)?;
    fs::write(Path::new(output_path), json_string)
        .with_context(|| format!("Failed to write inventory: {}", output_path))?;
    Ok(())
}
