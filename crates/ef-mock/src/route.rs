use crate::stubs::IntegrationStub;
use ef_core::models::HttpMethod;
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Priority of a pattern with no wildcard segment
const BASE_PRIORITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteKind {
    Endpoint,
    TelemetryBlock,
    IntegrationHost,
}

/// What an intercepted request gets back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteAction {
    Fulfill {
        status: u16,
        /// Absent for responses without content (204)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        #[serde(default, skip_serializing_if = "is_zero")]
        delay_ms: u64,
    },
    Abort,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Route interception rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockRoute {
    pub id: String,
    /// `None` matches every method
    pub method: Option<HttpMethod>,
    /// URL glob: `*` stays within one segment, `**` spans segments
    pub pattern: String,
    pub action: RouteAction,
    pub priority: u32,
    pub kind: RouteKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

impl MockRoute {
    pub fn new(
        id: impl Into<String>,
        method: Option<HttpMethod>,
        pattern: impl Into<String>,
        action: RouteAction,
        kind: RouteKind,
    ) -> Self {
        let pattern = pattern.into();
        Self {
            id: id.into(),
            method,
            priority: priority_of(&pattern),
            pattern,
            action,
            kind,
            components: Vec::new(),
        }
    }

    pub fn matcher(&self) -> Option<GlobMatcher> {
        match GlobBuilder::new(&self.pattern).literal_separator(true).build() {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                warn!(route = %self.id, pattern = %self.pattern, error = %e, "Invalid route pattern");
                None
            }
        }
    }

    /// Whether a request is intercepted; query and fragment are ignored
    pub fn matches(&self, method: HttpMethod, url: &str) -> bool {
        if self.method.is_some_and(|m| m != method) {
            return false;
        }
        let target = url.split(['?', '#']).next().unwrap_or(url);
        self.matcher().is_some_and(|m| m.is_match(target))
    }
}

/// Fewer wildcard segments rank higher
pub fn priority_of(pattern: &str) -> u32 {
    let wildcards = pattern.split('/').filter(|s| s.contains('*')).count() as u32;
    BASE_PRIORITY.saturating_sub(wildcards)
}

/// Routes and integration stubs for one application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockSet {
    /// Most specific first, declaration order among equals
    pub routes: Vec<MockRoute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stubs: Vec<IntegrationStub>,
}

impl MockSet {
    /// Builds a set from routes in declaration order
    pub fn new(mut routes: Vec<MockRoute>, stubs: Vec<IntegrationStub>) -> Self {
        // stable: equal priorities keep declaration order
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { routes, stubs }
    }

    /// Route that answers a request
    pub fn resolve(&self, method: HttpMethod, url: &str) -> Option<&MockRoute> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(method, url))
            .max_by(|(ia, a), (ib, b)| a.priority.cmp(&b.priority).then(ib.cmp(ia)))
            .map(|(_, r)| r)
    }

    pub fn route(&self, id: &str) -> Option<&MockRoute> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn routes_of(&self, kind: RouteKind) -> impl Iterator<Item = &MockRoute> {
        self.routes.iter().filter(move |r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(id: &str, method: HttpMethod, pattern: &str) -> MockRoute {
        MockRoute::new(
            id,
            Some(method),
            pattern,
            RouteAction::Fulfill {
                status: 200,
                body: None,
                delay_ms: 0,
            },
            RouteKind::Endpoint,
        )
    }

    #[test]
    fn test_specific_pattern_wins() {
        let set = MockSet::new(
            vec![
                ok("detail", HttpMethod::Get, "**/users/*/"),
                ok("me", HttpMethod::Get, "**/users/me/"),
            ],
            Vec::new(),
        );

        assert_eq!(set.routes[0].id, "me");
        assert_eq!(set.resolve(HttpMethod::Get, "/users/me/").map(|r| r.id.as_str()), Some("me"));
        assert_eq!(
            set.resolve(HttpMethod::Get, "http://localhost:3000/users/42/?expand=1")
                .map(|r| r.id.as_str()),
            Some("detail")
        );
        assert!(set.resolve(HttpMethod::Delete, "/users/42/").is_none());
    }

    #[test]
    fn test_equal_specificity_uses_declaration_order() {
        let set = MockSet::new(
            vec![
                ok("first", HttpMethod::Get, "**/a/*/c"),
                ok("second", HttpMethod::Get, "**/a/b/*"),
            ],
            Vec::new(),
        );
        assert_eq!(set.resolve(HttpMethod::Get, "/a/b/c").map(|r| r.id.as_str()), Some("first"));
    }

    #[test]
    fn test_wildcard_stays_in_segment() {
        let route = ok("list", HttpMethod::Get, "**/items/*");
        assert!(route.matches(HttpMethod::Get, "/api/items/7"));
        assert!(!route.matches(HttpMethod::Get, "/api/items/7/children"));
    }

    #[test]
    fn test_any_method_host_rule() {
        let route = MockRoute::new(
            "block-segment",
            None,
            "*://*.segment.io/**",
            RouteAction::Abort,
            RouteKind::TelemetryBlock,
        );
        assert!(route.matches(HttpMethod::Post, "https://api.segment.io/v1/t"));
        assert!(!route.matches(HttpMethod::Post, "https://segment.io.evil.test/v1/t"));
    }
}
