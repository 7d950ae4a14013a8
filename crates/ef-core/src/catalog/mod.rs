//! Configurable catalogs: call shapes recognized as network access and
//! signatures of third-party integrations.

pub mod integrations;

pub use integrations::*;

use crate::models::{HookKind, HttpMethod};
use crate::parsers::Call;
use serde::{Deserialize, Serialize};

/// Where a hook invocation gets its endpoint from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSource {
    /// URL, query function or key passed at the call site
    #[default]
    Arguments,
    /// Endpoint declared elsewhere (`builder.query`) and named by the hook
    Definition,
}

/// Structural pattern a call expression can match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CallShape {
    /// `useQuery(...)`, `useMutation(...)`, `use*Query()`
    HookInvocation {
        /// Callee name; `*` matches any run of characters
        name: String,
        kind: HookKind,
        #[serde(default)]
        source: EndpointSource,
    },
    /// `fetch(url)`, `axios.get(url)`, `api.post(url, body)`
    BareClientCall {
        object: String,
        /// Fixed method; derived from the property or request options when absent
        #[serde(default)]
        method: Option<HttpMethod>,
    },
    /// Custom function forwarding to one of the other shapes
    WrappedHook {
        pattern: String,
        #[serde(default = "default_wrapped_targets")]
        resolves_to: Vec<HookKind>,
    },
}

fn default_wrapped_targets() -> Vec<HookKind> {
    vec![HookKind::Query, HookKind::Mutation, HookKind::Client]
}

/// Client properties that issue a request
pub const CLIENT_METHODS: &[&str] = &[
    "get", "post", "put", "patch", "delete", "head", "options", "request",
];

impl CallShape {
    /// Lower is more specific: exact hook < wrapped hook < bare client
    pub fn rank(&self) -> u8 {
        match self {
            CallShape::HookInvocation { .. } => 0,
            CallShape::WrappedHook { .. } => 1,
            CallShape::BareClientCall { .. } => 2,
        }
    }

    /// Structural predicate over a scanned call
    pub fn matches(&self, call: &Call) -> bool {
        if call.is_new {
            return false;
        }
        match self {
            CallShape::HookInvocation { name, .. } => call.is_plain() && glob_match(name, &call.name),
            CallShape::BareClientCall { object, .. } => {
                if call.is_plain() {
                    return &call.name == object;
                }
                call.base_object.as_deref() == Some(object.as_str())
                    && call
                        .property
                        .as_deref()
                        .map(|p| CLIENT_METHODS.contains(&p))
                        .unwrap_or(false)
                    && call.name.split('.').count() == 2
            }
            CallShape::WrappedHook { pattern, .. } => {
                let name = if call.is_plain() {
                    Some(call.name.as_str())
                } else if call.name.split('.').count() == 2 {
                    call.property.as_deref()
                } else {
                    None
                };
                name.map(|n| glob_match(pattern, n)).unwrap_or(false)
            }
        }
    }
}

/// Ordered list of call shapes; order breaks ties between equally specific matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallShapeCatalog {
    pub shapes: Vec<CallShape>,
}

impl Default for CallShapeCatalog {
    fn default() -> Self {
        let hook = |name: &str, kind: HookKind, source: EndpointSource| CallShape::HookInvocation {
            name: name.to_string(),
            kind,
            source,
        };
        let client = |object: &str| CallShape::BareClientCall {
            object: object.to_string(),
            method: None,
        };
        let wrapped = |pattern: &str, resolves_to: Vec<HookKind>| CallShape::WrappedHook {
            pattern: pattern.to_string(),
            resolves_to,
        };

        let mut shapes = vec![
            hook("useQuery", HookKind::Query, EndpointSource::Arguments),
            hook("useSuspenseQuery", HookKind::Query, EndpointSource::Arguments),
            hook("useInfiniteQuery", HookKind::Query, EndpointSource::Arguments),
            hook("useSWR", HookKind::Query, EndpointSource::Arguments),
            hook("useSWRImmutable", HookKind::Query, EndpointSource::Arguments),
            hook("useSWRInfinite", HookKind::Query, EndpointSource::Arguments),
            hook("useFetch", HookKind::Query, EndpointSource::Arguments),
            hook("useAxios", HookKind::Query, EndpointSource::Arguments),
            hook("useMutation", HookKind::Mutation, EndpointSource::Arguments),
            hook("useSWRMutation", HookKind::Mutation, EndpointSource::Arguments),
            hook("useLazy*Query", HookKind::Query, EndpointSource::Definition),
            hook("use*Query", HookKind::Query, EndpointSource::Definition),
            hook("use*Mutation", HookKind::Mutation, EndpointSource::Definition),
        ];
        shapes.extend(
            [
                "fetch",
                "axios",
                "ky",
                "api",
                "apiClient",
                "client",
                "http",
                "httpClient",
                "request",
                "instance",
                "axiosInstance",
            ]
            .into_iter()
            .map(client),
        );
        shapes.push(wrapped("use*", default_wrapped_targets()));
        shapes.extend(
            [
                "fetch*", "get*", "load*", "create*", "update*", "delete*", "remove*", "save*",
                "post*", "put*", "patch*", "submit*",
            ]
            .into_iter()
            .map(|p| wrapped(p, vec![HookKind::Client])),
        );
        Self { shapes }
    }
}

impl CallShapeCatalog {
    /// Matching shapes, best first: by rank, then declaration order
    pub fn candidates<'a>(&'a self, call: &Call) -> Vec<(usize, &'a CallShape)> {
        let mut matches: Vec<(usize, &CallShape)> = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, shape)| shape.matches(call))
            .collect();
        matches.sort_by_key(|(idx, shape)| (shape.rank(), *idx));
        matches
    }

    /// Best non-wrapper match; used inside wrapper bodies where only one level is followed
    pub fn direct_match<'a>(&'a self, call: &Call) -> Option<&'a CallShape> {
        self.candidates(call)
            .into_iter()
            .map(|(_, shape)| shape)
            .find(|shape| !matches!(shape, CallShape::WrappedHook { .. }))
    }
}

/// Glob over plain names where `*` matches any (possibly empty) run of characters
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !name.starts_with(first) || name.len() < first.len() + last.len() || !name.ends_with(last) {
        return false;
    }
    let mut rest = &name[first.len()..name.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}
