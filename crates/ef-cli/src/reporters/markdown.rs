use anyhow::{Context, Result};
use ef_core::models::{CoverageReport, InventoryDocument, ResolutionStatus, UnresolvedReason};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Longest callee text shown in the unresolved-call table
const MAX_CALLEE_LEN: usize = 60;

/// Markdown report generator
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// Writes the report to `output_path`
    pub fn generate(
        &self,
        coverage: &CoverageReport,
        inventory: &InventoryDocument,
        output_path: &str,
    ) -> Result<()> {
        let report = self.render(coverage, inventory);
        super::ensure_parent(output_path)?;
        fs::write(Path::new(output_path), report)
            .with_context(|| format!("Failed to write report: {}", output_path))?;
        Ok(())
    }

    pub fn render(&self, coverage: &CoverageReport, inventory: &InventoryDocument) -> String {
        let mut report = String::new();
        let counts = &coverage.counts;

        report.push_str("# Test Selector Coverage Report\n\n");
        report.push_str(&format!(
            "## Run Date\n{}\n\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        report.push_str(&format!("## Scope\n{}\n\n", coverage.scope));

        report.push_str("## Statistics\n\n");
        report.push_str(&format!("- **Files Analyzed**: {}\n", counts.files_analyzed));
        report.push_str(&format!("- **Elements In Scope**: {}\n", counts.elements_in_scope));
        report.push_str(&format!("  - With Selector: {}\n", counts.selectors_present));
        report.push_str(&format!("  - Missing Selector: {}\n", counts.selectors_missing));
        report.push_str(&format!(
            "- **Selector Coverage**: {:.1}%\n",
            counts.coverage_percent
        ));
        report.push_str(&format!("- **Naming Violations**: {}\n", counts.naming_violations));
        report.push_str(&format!("- **API Calls**: {}\n", counts.api_calls));
        report.push_str(&format!("  - Unresolved: {}\n", counts.unresolved_calls));
        report.push_str(&format!("- **Endpoints**: {}\n", inventory.endpoints.len()));
        report.push_str(&format!("- **Resolution Errors**: {}\n", counts.resolution_errors));
        report.push_str(&format!("- **Parse Failures**: {}\n", counts.parse_failures));
        if counts.write_conflicts > 0 {
            report.push_str(&format!("- **Write Conflicts**: {}\n", counts.write_conflicts));
        }
        if counts.patch_failures > 0 {
            report.push_str(&format!("- **Patch Failures**: {}\n", counts.patch_failures));
        }
        report.push_str("\n---\n\n");

        report.push_str("## Missing Selectors\n\n");
        if coverage.missing_selectors.is_empty() {
            report.push_str("Every element in scope carries a selector.\n\n");
        } else {
            report.push_str("| File | Location | Element | Tier | Suggested |\n");
            report.push_str("|------|----------|---------|------|-----------|\n");
            for row in &coverage.missing_selectors {
                report.push_str(&format!(
                    "| {} | {} | `{}` | {} | `{}` |\n",
                    escape_cell(&row.file),
                    escape_cell(&row.location),
                    escape_cell(&row.element),
                    row.tier,
                    escape_cell(&row.suggested)
                ));
            }
            report.push('\n');
        }

        report.push_str("## Naming Violations\n\n");
        if coverage.naming_violations.is_empty() {
            report.push_str("No existing selector breaks the naming convention.\n\n");
        } else {
            report.push_str("| File | Location | Current | Suggested | Problem |\n");
            report.push_str("|------|----------|---------|-----------|---------|\n");
            for row in &coverage.naming_violations {
                report.push_str(&format!(
                    "| {} | {} | `{}` | `{}` | {} |\n",
                    escape_cell(&row.file),
                    escape_cell(&row.location),
                    escape_cell(&row.current),
                    escape_cell(&row.suggested),
                    row.kind
                ));
            }
            report.push('\n');
        }

        if !inventory.unresolved.is_empty() {
            report.push_str("## Unresolved API Calls\n\n");
            report.push_str("| Location | Component | Callee | Reason |\n");
            report.push_str("|----------|-----------|--------|--------|\n");
            for site in &inventory.unresolved {
                report.push_str(&format!(
                    "| {} | {} | `{}` | {} |\n",
                    escape_cell(&site.location.to_string()),
                    escape_cell(&site.component),
                    escape_cell(&Self::truncate_string_safe(&site.callee, MAX_CALLEE_LEN)),
                    site.status
                ));
            }
            report.push('\n');
        }

        if !coverage.diagnostics.is_empty() {
            report.push_str("## Diagnostics\n\n");
            for error in &coverage.diagnostics.resolution_errors {
                report.push_str(&format!(
                    "- Unresolved import `{}` in `{}:{}` ({})\n",
                    error.specifier, error.importer, error.line, error.reason
                ));
            }
            for failure in &coverage.diagnostics.parse_failures {
                report.push_str(&format!(
                    "- Parse failure in `{}`: {}\n",
                    failure.file, failure.message
                ));
            }
            for conflict in &coverage.diagnostics.write_conflicts {
                report.push_str(&format!(
                    "- `{}` changed after analysis and was not patched\n",
                    conflict.file
                ));
            }
            for failure in &coverage.diagnostics.patch_failures {
                report.push_str(&format!(
                    "- Patching `{}` failed: {}\n",
                    failure.file, failure.message
                ));
            }
            report.push('\n');
        }

        let recommendations = Self::generate_recommendations(coverage, inventory);
        if !recommendations.is_empty() {
            report.push_str("## Recommendations\n\n");
            for recommendation in recommendations {
                report.push_str(&format!("- {}\n", recommendation));
            }
            report.push('\n');
        }

        report
    }

    /// Truncates a string safely at UTF-8 character boundaries
    fn truncate_string_safe(s: &str, max_len: usize) -> String {
        if s.len() <= max_len {
            return s.to_string();
        }
        let mut truncate_at = max_len;
        while truncate_at > 0 && !s.is_char_boundary(truncate_at) {
            truncate_at -= 1;
        }
        format!("{}...", &s[..truncate_at])
    }

    fn generate_recommendations(coverage: &CoverageReport, inventory: &InventoryDocument) -> Vec<String> {
        let mut recommendations = Vec::new();
        if coverage.counts.selectors_missing > 0 {
            recommendations.push(format!(
                "Run `e2e-forge scan --fix` to add {} missing selector(s), or `--interactive` to review each one.",
                coverage.counts.selectors_missing
            ));
        }
        if coverage.counts.naming_violations > 0 {
            recommendations.push(
                "Run `e2e-forge scan --fix --rename-invalid` to rename selectors that break the convention."
                    .to_string(),
            );
        }

        let mut reasons: BTreeMap<UnresolvedReason, usize> = BTreeMap::new();
        for site in &inventory.unresolved {
            if let ResolutionStatus::Unresolved(reason) = site.status {
                *reasons.entry(reason).or_insert(0) += 1;
            }
        }
        for (reason, count) in reasons {
            let advice = match reason {
                UnresolvedReason::DynamicUrl => "build URLs from literal templates so endpoints can be derived",
                UnresolvedReason::MissingUrl => "pass the URL at the call site",
                UnresolvedReason::UnknownMethod => "name the HTTP method literally",
                UnresolvedReason::AmbiguousWrapper => "give wrappers with different targets distinct names",
                UnresolvedReason::AmbiguousHook => "rename generated hooks that match several endpoints",
                UnresolvedReason::MissingDefinition => "add the API definition module to the source roots",
                UnresolvedReason::UnresolvedImport => "configure an alias for the wrapper's import path",
            };
            recommendations.push(format!("{} call(s) `{}`: {}.", count, reason.as_str(), advice));
        }
        recommendations
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(MarkdownReporter::truncate_string_safe("abc", 5), "abc");
        assert_eq!(MarkdownReporter::truncate_string_safe("héllo", 2), "h...");
    }

    #[test]
    fn test_empty_report_has_no_recommendations() {
        let report = MarkdownReporter.render(&CoverageReport::default(), &InventoryDocument::default());
        assert!(report.contains("## Statistics"));
        assert!(report.contains("Every element in scope carries a selector."));
        assert!(!report.contains("## Recommendations"));
    }
}
