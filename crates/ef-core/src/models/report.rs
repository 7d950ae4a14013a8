use crate::models::{
    ApiCallSite, Diagnostics, HookKind, HttpMethod, ResolutionStatus, ThirdPartyUsage,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Call entry as listed under a page or subcomponent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEntry {
    pub endpoint: Option<String>,
    pub method: Option<HttpMethod>,
    pub hook_kind: HookKind,
    pub component: String,
    pub status: ResolutionStatus,
    pub line: usize,
}

impl From<&ApiCallSite> for CallEntry {
    fn from(site: &ApiCallSite) -> Self {
        Self {
            endpoint: site.endpoint.clone(),
            method: site.method,
            hook_kind: site.hook_kind,
            component: site.component.clone(),
            status: site.status,
            line: site.location.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcomponentInventory {
    pub name: String,
    pub file: String,
    pub api_calls: Vec<CallEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInventory {
    pub file: String,
    pub component: String,
    pub api_calls: Vec<CallEntry>,
    pub subcomponents: Vec<SubcomponentInventory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointCaller {
    pub component: String,
    pub file: String,
}

/// One entry per distinct (endpoint, method)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub endpoint: String,
    pub method: HttpMethod,
    pub callers: Vec<EndpointCaller>,
}

/// Pages to calls and subcomponents, plus the flat endpoint index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDocument {
    pub scope: String,
    pub pages: IndexMap<String, PageInventory>,
    pub endpoints: Vec<EndpointEntry>,
    pub unresolved: Vec<ApiCallSite>,
    /// Integrations and telemetry destinations the mock synthesizer stubs out
    #[serde(default)]
    pub third_party: ThirdPartyUsage,
    pub diagnostics: Diagnostics,
}

impl InventoryDocument {
    /// Every source file the document mentions
    pub fn files(&self) -> BTreeSet<String> {
        let mut files = BTreeSet::new();
        for page in self.pages.values() {
            files.insert(page.file.clone());
            for sub in &page.subcomponents {
                files.insert(sub.file.clone());
            }
        }
        for site in &self.unresolved {
            files.insert(site.file.clone());
        }
        files
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageCounts {
    pub files_analyzed: usize,
    pub elements_in_scope: usize,
    pub selectors_present: usize,
    pub selectors_missing: usize,
    pub coverage_percent: f64,
    pub naming_violations: usize,
    pub api_calls: usize,
    pub unresolved_calls: usize,
    pub resolution_errors: usize,
    pub parse_failures: usize,
    pub write_conflicts: usize,
    pub patch_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSelectorRow {
    pub file: String,
    pub location: String,
    pub element: String,
    pub tier: String,
    pub suggested: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingViolationRow {
    pub file: String,
    pub location: String,
    pub current: String,
    pub suggested: String,
    pub kind: String,
}

/// Selector coverage and diagnostics for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub scope: String,
    pub files: Vec<String>,
    pub counts: CoverageCounts,
    pub missing_selectors: Vec<MissingSelectorRow>,
    pub naming_violations: Vec<NamingViolationRow>,
    pub diagnostics: Diagnostics,
}

impl CoverageReport {
    /// Unresolved call sites plus unresolvable imports
    pub fn unresolved_total(&self) -> usize {
        self.counts.unresolved_calls + self.counts.resolution_errors
    }
}
