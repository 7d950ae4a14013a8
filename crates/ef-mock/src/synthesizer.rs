//! Route synthesis from the endpoint inventory.

use crate::route::{MockRoute, MockSet, RouteAction, RouteKind};
use crate::schema::{is_collection, ResourceSchema};
use crate::stubs::{integration_stubs, telemetry_blocks};
use ef_core::catalog::IntegrationCatalog;
use ef_core::models::{ApiCallSite, HttpMethod, ThirdPartyUsage};
use ef_core::naming::{kebab, WireCase};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

fn default_url_prefix() -> String {
    "**".to_string()
}

fn default_page_size() -> usize {
    2
}

/// Mock generation settings (`[mocks]` in the config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Prepended to every endpoint template
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Items in a generated collection page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Field naming of the real backend
    pub wire_case: WireCase,
    /// Resource name -> field names, replacing the built-in table
    pub resources: IndexMap<String, Vec<String>>,
    pub overrides: Vec<EndpointOverride>,
    /// Abort every known telemetry destination, observed or not
    pub block_all_telemetry: bool,
    pub default_delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_url_prefix(),
            page_size: default_page_size(),
            wire_case: WireCase::default(),
            resources: IndexMap::new(),
            overrides: Vec::new(),
            block_all_telemetry: false,
            default_delay_ms: 0,
        }
    }
}

/// Replaces parts of the generated response for one endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointOverride {
    /// Endpoint template as it appears in the inventory
    pub endpoint: String,
    /// Applies to every method when absent
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub paginated: Option<bool>,
    /// Literal body, sent as written
    #[serde(default)]
    pub body: Option<Value>,
}

impl EndpointOverride {
    fn applies_to(&self, endpoint: &str, method: HttpMethod) -> bool {
        self.endpoint == endpoint && self.method.map_or(true, |m| m == method)
    }
}

pub struct MockSynthesizer<'a> {
    config: &'a MockConfig,
    catalog: &'a IntegrationCatalog,
}

impl<'a> MockSynthesizer<'a> {
    pub fn new(config: &'a MockConfig, catalog: &'a IntegrationCatalog) -> Self {
        Self { config, catalog }
    }

    /// One route per resolved (endpoint, method), plus telemetry blocks and
    /// integration stubs
    pub fn synthesize(&self, calls: &[ApiCallSite], usage: &ThirdPartyUsage) -> MockSet {
        let mut endpoints: BTreeMap<(String, HttpMethod), BTreeSet<String>> = BTreeMap::new();
        for call in calls.iter().filter(|c| c.is_resolved()) {
            let (Some(endpoint), Some(method)) = (&call.endpoint, call.method) else {
                continue;
            };
            endpoints
                .entry((endpoint.clone(), method))
                .or_default()
                .insert(call.component.clone());
        }

        let mut ids = HashSet::new();
        let mut routes: Vec<MockRoute> = endpoints
            .into_iter()
            .map(|((endpoint, method), components)| {
                let mut route = self.endpoint_route(&endpoint, method);
                route.id = unique_id(&mut ids, route.id);
                route.components = components.into_iter().collect();
                route
            })
            .collect();

        routes.extend(telemetry_blocks(usage, self.catalog, self.config.block_all_telemetry));
        let (stubs, host_routes) = integration_stubs(usage, self.catalog);
        routes.extend(host_routes);

        let set = MockSet::new(routes, stubs);
        info!(
            routes = set.routes.len(),
            stubs = set.stubs.len(),
            "Synthesized mocks"
        );
        set
    }

    fn endpoint_route(&self, endpoint: &str, method: HttpMethod) -> MockRoute {
        // later entries win
        let overrides: Vec<&EndpointOverride> = self
            .config
            .overrides
            .iter()
            .filter(|o| o.applies_to(endpoint, method))
            .collect();
        let collection = is_collection(endpoint);
        let paginated = overrides
            .iter()
            .rev()
            .find_map(|o| o.paginated)
            .unwrap_or(collection);
        let (status, body) = self.default_response(endpoint, method, collection, paginated);
        let status = overrides.iter().rev().find_map(|o| o.status).unwrap_or(status);
        let body = overrides.iter().rev().find_map(|o| o.body.clone()).or(body);
        let delay_ms = overrides
            .iter()
            .rev()
            .find_map(|o| o.delay_ms)
            .unwrap_or(self.config.default_delay_ms);
        if !overrides.is_empty() {
            debug!(endpoint, method = %method, "Applied endpoint override");
        }

        MockRoute::new(
            route_id(endpoint, method),
            Some(method),
            self.pattern(endpoint),
            RouteAction::Fulfill {
                status,
                body,
                delay_ms,
            },
            RouteKind::Endpoint,
        )
    }

    fn default_response(
        &self,
        endpoint: &str,
        method: HttpMethod,
        collection: bool,
        paginated: bool,
    ) -> (u16, Option<Value>) {
        let schema = ResourceSchema::infer(endpoint, &self.config.resources);
        let wire = self.config.wire_case;
        match method {
            HttpMethod::Get if collection && paginated => (200, Some(self.page(&schema))),
            HttpMethod::Get if collection => (
                200,
                Some(Value::Array(
                    (1..=self.config.page_size).map(|n| schema.instance(n, wire)).collect(),
                )),
            ),
            HttpMethod::Get => (200, Some(schema.instance(1, wire))),
            HttpMethod::Post => (201, Some(schema.instance(1, wire))),
            HttpMethod::Put | HttpMethod::Patch => (200, Some(schema.instance(1, wire))),
            HttpMethod::Delete => (204, None),
            HttpMethod::Head | HttpMethod::Options => (200, None),
        }
    }

    /// `{count, next, previous, results}` with `page_size` items
    fn page(&self, schema: &ResourceSchema) -> Value {
        let wire = self.config.wire_case;
        let results: Vec<Value> = (1..=self.config.page_size)
            .map(|n| schema.instance(n, wire))
            .collect();
        let mut envelope = Map::new();
        envelope.insert(wire.apply("count"), Value::from(results.len()));
        envelope.insert(wire.apply("next"), Value::Null);
        envelope.insert(wire.apply("previous"), Value::Null);
        envelope.insert(wire.apply("results"), Value::Array(results));
        Value::Object(envelope)
    }

    /// Placeholders become single-segment wildcards behind the prefix
    pub fn pattern(&self, endpoint: &str) -> String {
        let path: Vec<&str> = endpoint
            .split('/')
            .map(|segment| if segment.starts_with('{') { "*" } else { segment })
            .collect();
        let path = path.join("/");
        let prefix = self.config.url_prefix.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", prefix, path)
        } else {
            format!("{}/{}", prefix, path)
        }
    }
}

/// `get-api-todos-id`
fn route_id(endpoint: &str, method: HttpMethod) -> String {
    let path = kebab(endpoint);
    if path.is_empty() {
        format!("{}-root", method.as_str().to_lowercase())
    } else {
        format!("{}-{}", method.as_str().to_lowercase(), path)
    }
}

fn unique_id(taken: &mut HashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    candidate
}
