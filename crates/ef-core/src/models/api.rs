use crate::models::Location;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    /// Convenient method to get Option
    pub fn from_str_opt(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(HttpMethod::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(HttpMethod::Post)
        } else if s.eq_ignore_ascii_case("PUT") {
            Ok(HttpMethod::Put)
        } else if s.eq_ignore_ascii_case("PATCH") {
            Ok(HttpMethod::Patch)
        } else if s.eq_ignore_ascii_case("DELETE") {
            Ok(HttpMethod::Delete)
        } else if s.eq_ignore_ascii_case("OPTIONS") {
            Ok(HttpMethod::Options)
        } else if s.eq_ignore_ascii_case("HEAD") {
            Ok(HttpMethod::Head)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a call site reaches the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Data-fetch hook (`useQuery`, `useSWR`, generated `use*Query`)
    Query,
    /// Mutation hook (`useMutation`, generated `use*Mutation`)
    Mutation,
    /// Bare network client (`fetch`, `axios.get`, `api.post`)
    Client,
    /// Custom function forwarding to one of the above
    Wrapped,
}

impl HookKind {
    /// Method used when the call site does not name one
    pub fn default_method(&self) -> HttpMethod {
        match self {
            HookKind::Mutation => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookKind::Query => "query",
            HookKind::Mutation => "mutation",
            HookKind::Client => "client",
            HookKind::Wrapped => "wrapped",
        };
        f.write_str(s)
    }
}

/// Why a call site could not be turned into an endpoint template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnresolvedReason {
    /// URL argument is computed at runtime
    DynamicUrl,
    /// No URL argument or definition at all
    MissingUrl,
    /// HTTP method is computed at runtime
    UnknownMethod,
    /// Wrapper symbol resolves to more than one definition
    AmbiguousWrapper,
    /// Generated hook name matches several endpoint definitions
    AmbiguousHook,
    /// Generated hook has no endpoint definition in the graph
    MissingDefinition,
    /// Wrapper is imported from a module that could not be resolved
    UnresolvedImport,
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedReason::DynamicUrl => "dynamic-url",
            UnresolvedReason::MissingUrl => "missing-url",
            UnresolvedReason::UnknownMethod => "unknown-method",
            UnresolvedReason::AmbiguousWrapper => "ambiguous-wrapper",
            UnresolvedReason::AmbiguousHook => "ambiguous-hook",
            UnresolvedReason::MissingDefinition => "missing-definition",
            UnresolvedReason::UnresolvedImport => "unresolved-import",
        }
    }
}

impl FromStr for UnresolvedReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynamic-url" => Ok(UnresolvedReason::DynamicUrl),
            "missing-url" => Ok(UnresolvedReason::MissingUrl),
            "unknown-method" => Ok(UnresolvedReason::UnknownMethod),
            "ambiguous-wrapper" => Ok(UnresolvedReason::AmbiguousWrapper),
            "ambiguous-hook" => Ok(UnresolvedReason::AmbiguousHook),
            "missing-definition" => Ok(UnresolvedReason::MissingDefinition),
            "unresolved-import" => Ok(UnresolvedReason::UnresolvedImport),
            _ => Err(()),
        }
    }
}

/// `resolved` or `unresolved:<reason>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolutionStatus {
    Resolved,
    Unresolved(UnresolvedReason),
}

impl ResolutionStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionStatus::Resolved)
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStatus::Resolved => f.write_str("resolved"),
            ResolutionStatus::Unresolved(reason) => write!(f, "unresolved:{}", reason.as_str()),
        }
    }
}

impl Serialize for ResolutionStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResolutionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == "resolved" {
            return Ok(ResolutionStatus::Resolved);
        }
        raw.strip_prefix("unresolved:")
            .and_then(|reason| reason.parse().ok())
            .map(ResolutionStatus::Unresolved)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown resolution status '{}'", raw)))
    }
}

/// One network call site attributed to a page or component module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiCallSite {
    /// Normalized endpoint template (`/users/{id}/`), absent when unresolved
    pub endpoint: Option<String>,
    pub method: Option<HttpMethod>,
    pub hook_kind: HookKind,
    /// Display name of the originating component
    pub component: String,
    /// Project-relative path of the originating module
    pub file: String,
    pub location: Location,
    pub status: ResolutionStatus,
    /// Callee text as written at the call site
    pub callee: String,
}

impl ApiCallSite {
    /// Identity used for deduplication of resolved call sites: endpoint
    /// template, method and originating component
    pub fn dedup_key(&self) -> (String, Option<HttpMethod>, String) {
        (
            self.endpoint.clone().unwrap_or_default(),
            self.method,
            self.component.clone(),
        )
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("Patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert!("fetch".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_resolution_status_serializes_as_tagged_string() {
        let status = ResolutionStatus::Unresolved(UnresolvedReason::DynamicUrl);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"unresolved:dynamic-url\"");

        let back: ResolutionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
        assert_eq!(
            serde_json::to_string(&ResolutionStatus::Resolved).unwrap(),
            "\"resolved\""
        );
    }
}
