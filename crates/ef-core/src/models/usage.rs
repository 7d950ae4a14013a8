use crate::catalog::IntegrationCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Third-party SDK observed in the analyzed modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationUsage {
    pub name: String,
    pub category: IntegrationCategory,
    /// Package specifiers as imported
    pub packages: BTreeSet<String>,
    /// Imported bindings and member names actually used
    pub members: BTreeSet<String>,
    pub components: BTreeSet<String>,
}

/// Analytics destination observed through a package import or URL literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryUsage {
    pub name: String,
    /// Package specifiers or URL literals that revealed it
    pub evidence: BTreeSet<String>,
}

/// Integrations and telemetry found during extraction, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyUsage {
    pub integrations: Vec<IntegrationUsage>,
    pub telemetry: Vec<TelemetryUsage>,
}

impl ThirdPartyUsage {
    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty() && self.telemetry.is_empty()
    }

    /// Folds another usage set in, merging entries with the same name
    pub fn merge(&mut self, other: ThirdPartyUsage) {
        for usage in other.integrations {
            match self.integrations.iter_mut().find(|u| u.name == usage.name) {
                Some(existing) => {
                    existing.packages.extend(usage.packages);
                    existing.members.extend(usage.members);
                    existing.components.extend(usage.components);
                }
                None => self.integrations.push(usage),
            }
        }
        for usage in other.telemetry {
            match self.telemetry.iter_mut().find(|u| u.name == usage.name) {
                Some(existing) => existing.evidence.extend(usage.evidence),
                None => self.telemetry.push(usage),
            }
        }
        self.integrations.sort_by(|a, b| a.name.cmp(&b.name));
        self.telemetry.sort_by(|a, b| a.name.cmp(&b.name));
    }
}
