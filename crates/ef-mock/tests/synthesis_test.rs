use ef_core::catalog::{IntegrationCatalog, IntegrationCategory};
use ef_core::models::{
    ApiCallSite, HookKind, HttpMethod, IntegrationUsage, Location, ResolutionStatus,
    TelemetryUsage, ThirdPartyUsage,
};
use ef_core::naming::WireCase;
use ef_mock::{MockConfig, MockFormat, MockSet, MockSynthesizer, RouteAction, RouteKind};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn call(endpoint: &str, method: HttpMethod, component: &str) -> ApiCallSite {
    let file = format!("src/components/{}.tsx", component);
    ApiCallSite {
        endpoint: Some(endpoint.to_string()),
        method: Some(method),
        hook_kind: HookKind::Query,
        component: component.to_string(),
        location: Location::new(file.clone(), 4, 9),
        file,
        status: ResolutionStatus::Resolved,
        callee: "useQuery".to_string(),
    }
}

fn body_of<'a>(set: &'a MockSet, id: &str) -> &'a Value {
    match &set.route(id).unwrap().action {
        RouteAction::Fulfill { body: Some(body), .. } => body,
        other => panic!("unexpected action {:?}", other),
    }
}

fn assert_keys(value: &Value, wire: WireCase) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                assert!(wire.matches(key), "key '{}' is not {:?}", key, wire);
                assert_keys(nested, wire);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| assert_keys(item, wire)),
        _ => {}
    }
}

#[test]
fn test_collection_get_returns_pagination_envelope() {
    let config = MockConfig::default();
    let catalog = IntegrationCatalog::default();
    let set = MockSynthesizer::new(&config, &catalog).synthesize(
        &[call("/items/", HttpMethod::Get, "ItemList")],
        &ThirdPartyUsage::default(),
    );

    let route = set.route("get-items").unwrap();
    assert_eq!(route.pattern, "**/items/");
    assert_eq!(route.components, vec!["ItemList".to_string()]);
    let body = body_of(&set, "get-items");
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["next"], Value::Null);
    assert_eq!(body["previous"], Value::Null);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"][1]["id"], json!(2));
}

#[test]
fn test_payload_keys_follow_wire_convention() {
    let catalog = IntegrationCatalog::default();
    let calls = [
        call("/users/", HttpMethod::Get, "Users"),
        call("/users/{id}/", HttpMethod::Put, "UserForm"),
        call("/orders/{id}/order-items/", HttpMethod::Get, "OrderLines"),
    ];
    for wire in [WireCase::SnakeCase, WireCase::CamelCase, WireCase::PascalCase, WireCase::KebabCase] {
        let config = MockConfig {
            wire_case: wire,
            ..MockConfig::default()
        };
        let set = MockSynthesizer::new(&config, &catalog).synthesize(&calls, &ThirdPartyUsage::default());
        for route in set.routes_of(RouteKind::Endpoint) {
            if let RouteAction::Fulfill { body: Some(body), .. } = &route.action {
                assert_keys(body, wire);
            }
        }
    }

    let config = MockConfig {
        wire_case: WireCase::CamelCase,
        ..MockConfig::default()
    };
    let set = MockSynthesizer::new(&config, &catalog).synthesize(&calls, &ThirdPartyUsage::default());
    assert!(body_of(&set, "put-users-id").get("firstName").is_some());
    assert!(body_of(&set, "put-users-id").get("first_name").is_none());
}

#[test]
fn test_shared_endpoint_is_one_route_and_specific_routes_come_first() {
    let config = MockConfig::default();
    let catalog = IntegrationCatalog::default();
    let set = MockSynthesizer::new(&config, &catalog).synthesize(
        &[
            call("/users/{id}/", HttpMethod::Get, "UserCard"),
            call("/users/{id}/", HttpMethod::Get, "UserBadge"),
            call("/users/me/", HttpMethod::Get, "Header"),
        ],
        &ThirdPartyUsage::default(),
    );

    assert_eq!(set.routes.len(), 2);
    assert_eq!(set.routes[0].id, "get-users-me");
    assert_eq!(
        set.route("get-users-id").unwrap().components,
        vec!["UserBadge".to_string(), "UserCard".to_string()]
    );
    assert_eq!(
        set.resolve(HttpMethod::Get, "http://localhost:5173/users/me/").map(|r| r.id.as_str()),
        Some("get-users-me")
    );
    assert_eq!(
        set.resolve(HttpMethod::Get, "http://localhost:5173/users/7/").map(|r| r.id.as_str()),
        Some("get-users-id")
    );
}

#[test]
fn test_third_party_traffic_never_reaches_network() {
    let usage = ThirdPartyUsage {
        integrations: vec![IntegrationUsage {
            name: "stripe".to_string(),
            category: IntegrationCategory::Payment,
            packages: BTreeSet::from(["@stripe/stripe-js".to_string()]),
            members: BTreeSet::from(["loadStripe".to_string(), "confirmCardPayment".to_string()]),
            components: BTreeSet::from(["Checkout".to_string()]),
        }],
        telemetry: vec![TelemetryUsage {
            name: "posthog".to_string(),
            evidence: BTreeSet::from(["posthog-js".to_string()]),
        }],
    };
    let config = MockConfig::default();
    let catalog = IntegrationCatalog::default();
    let set = MockSynthesizer::new(&config, &catalog).synthesize(&[], &usage);

    let blocked = set.resolve(HttpMethod::Post, "https://eu.posthog.com/capture/").unwrap();
    assert_eq!(blocked.action, RouteAction::Abort);
    let stubbed = set.resolve(HttpMethod::Post, "https://api.stripe.com/v1/payment_intents").unwrap();
    assert_eq!(stubbed.kind, RouteKind::IntegrationHost);
    assert!(set.resolve(HttpMethod::Get, "https://www.google-analytics.com/collect").is_none());

    assert_eq!(set.stubs.len(), 1);
    let members: Vec<&str> = set.stubs[0].members.keys().map(|k| k.as_str()).collect();
    assert_eq!(members, vec!["confirmCardPayment", "loadStripe"]);
}

#[test]
fn test_written_fixtures_are_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let config = MockConfig::default();
    let catalog = IntegrationCatalog::default();
    let calls = [
        call("/todos/", HttpMethod::Get, "TodoList"),
        call("/todos/", HttpMethod::Post, "TodoForm"),
        call("/todos/{id}/", HttpMethod::Delete, "TodoItem"),
    ];

    for format in [MockFormat::Json, MockFormat::Yaml, MockFormat::Playwright] {
        let path = temp_dir.path().join(format!("mocks.{}", format.extension()));
        let first = format
            .render(&MockSynthesizer::new(&config, &catalog).synthesize(&calls, &ThirdPartyUsage::default()))
            .unwrap();
        std::fs::write(&path, &first).unwrap();
        let second = format
            .render(&MockSynthesizer::new(&config, &catalog).synthesize(&calls, &ThirdPartyUsage::default()))
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), second);
    }

    let yaml = std::fs::read_to_string(temp_dir.path().join("mocks.yaml")).unwrap();
    let parsed: MockSet = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed.routes.len(), 3);
    let delete = parsed.route("delete-todos-id").unwrap();
    assert_eq!(
        delete.action,
        RouteAction::Fulfill {
            status: 204,
            body: None,
            delay_ms: 0
        }
    );
}
