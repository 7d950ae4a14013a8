//! Stand-ins for third-party SDKs and blocking rules for telemetry.

use crate::route::{MockRoute, RouteAction, RouteKind};
use ef_core::catalog::{IntegrationCatalog, IntegrationCategory};
use ef_core::models::ThirdPartyUsage;
use heck::ToKebabCase;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// SDK replacement exposing only what the application touches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStub {
    pub name: String,
    pub category: IntegrationCategory,
    pub packages: Vec<String>,
    /// Observed member -> canned value (`null` when the catalog has none)
    pub members: IndexMap<String, Value>,
    pub hosts: Vec<String>,
    pub components: Vec<String>,
}

/// Glob for every URL on `host`
pub fn host_pattern(host: &str) -> String {
    format!("*://{}/**", host)
}

/// Stubs plus host fulfill rules for the observed integrations
pub fn integration_stubs(
    usage: &ThirdPartyUsage,
    catalog: &IntegrationCatalog,
) -> (Vec<IntegrationStub>, Vec<MockRoute>) {
    let mut stubs = Vec::new();
    let mut routes = Vec::new();

    for observed in &usage.integrations {
        let Some(signature) = catalog.integrations.iter().find(|s| s.name == observed.name) else {
            warn!(integration = %observed.name, "Observed integration missing from catalog");
            continue;
        };
        let members: IndexMap<String, Value> = observed
            .members
            .iter()
            .map(|member| {
                let value = signature.members.get(member).cloned().unwrap_or(Value::Null);
                (member.clone(), value)
            })
            .collect();
        debug!(integration = %signature.name, members = members.len(), "Stubbed integration");

        for host in &signature.hosts {
            let mut route = MockRoute::new(
                format!("stub-{}-{}", signature.name, host.replace("*.", "").to_kebab_case()),
                None,
                host_pattern(host),
                RouteAction::Fulfill {
                    status: 200,
                    body: Some(json!({})),
                    delay_ms: 0,
                },
                RouteKind::IntegrationHost,
            );
            route.components = observed.components.iter().cloned().collect();
            routes.push(route);
        }

        stubs.push(IntegrationStub {
            name: signature.name.clone(),
            category: signature.category,
            packages: observed.packages.iter().cloned().collect(),
            members,
            hosts: signature.hosts.clone(),
            components: observed.components.iter().cloned().collect(),
        });
    }
    (stubs, routes)
}

/// Abort rules for observed destinations, or for every known one
pub fn telemetry_blocks(
    usage: &ThirdPartyUsage,
    catalog: &IntegrationCatalog,
    all_destinations: bool,
) -> Vec<MockRoute> {
    catalog
        .telemetry
        .iter()
        .filter(|d| all_destinations || usage.telemetry.iter().any(|t| t.name == d.name))
        .flat_map(|destination| {
            destination.hosts.iter().map(move |host| {
                MockRoute::new(
                    format!("block-{}-{}", destination.name, host.replace("*.", "").to_kebab_case()),
                    None,
                    host_pattern(host),
                    RouteAction::Abort,
                    RouteKind::TelemetryBlock,
                )
            })
        })
        .collect()
}
