//! API call extraction.
//!
//! Call facts of every page and component module are matched against the
//! call-shape catalog. Wrappers and generated hooks are followed through the
//! graph's symbol index, exactly one level deep.

use crate::endpoint::{endpoint_template, ModuleConstants};
use ef_core::catalog::{CallShape, CallShapeCatalog, EndpointSource, IntegrationCatalog};
use ef_core::graph::{ComponentGraph, ImportTarget, SourceModule, SymbolTarget};
use ef_core::models::{
    ApiCallSite, HookKind, HttpMethod, IntegrationUsage, NodeId, ResolutionStatus,
    TelemetryUsage, ThirdPartyUsage, UnresolvedReason,
};
use ef_core::parsers::{ArgValue, Call, ImportedName};
use heck::ToLowerCamelCase;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

const ANY_KIND: &[HookKind] = &[HookKind::Query, HookKind::Mutation, HookKind::Client];

/// Config keys of data hooks that carry the fetching function
const FETCHER_KEYS: &[&str] = &["queryFn", "mutationFn", "fetcher", "fn"];

/// Result of extraction over a set of modules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub calls: Vec<ApiCallSite>,
    pub third_party: ThirdPartyUsage,
}

impl Extraction {
    pub fn merge(&mut self, other: Extraction) {
        self.calls.extend(other.calls);
        self.calls = dedup_and_sort(std::mem::take(&mut self.calls));
        self.third_party.merge(other.third_party);
    }
}

/// How one call site reaches the network
#[derive(Debug, Clone, PartialEq)]
struct Interpretation {
    kind: HookKind,
    endpoint: Option<String>,
    method: Option<HttpMethod>,
    status: ResolutionStatus,
}

impl Interpretation {
    fn unresolved(kind: HookKind, method: Option<HttpMethod>, reason: UnresolvedReason) -> Self {
        Self {
            kind,
            endpoint: None,
            method,
            status: ResolutionStatus::Unresolved(reason),
        }
    }

    fn from_parts(
        kind: HookKind,
        endpoint: Result<String, UnresolvedReason>,
        method: Result<HttpMethod, UnresolvedReason>,
    ) -> Self {
        match (endpoint, method) {
            (Ok(endpoint), Ok(method)) => Self {
                kind,
                endpoint: Some(endpoint),
                method: Some(method),
                status: ResolutionStatus::Resolved,
            },
            (Err(reason), method) => Self::unresolved(kind, method.ok(), reason),
            (Ok(_), Err(reason)) => Self::unresolved(kind, None, reason),
        }
    }

    fn same_target(&self, other: &Interpretation) -> bool {
        self.endpoint == other.endpoint && self.method == other.method && self.status == other.status
    }
}

/// Module being analyzed, with the graph it lives in
struct Scope<'g> {
    graph: &'g ComponentGraph,
    id: NodeId,
    module: &'g SourceModule,
}

impl<'g> Scope<'g> {
    fn of(graph: &'g ComponentGraph, id: NodeId) -> Option<Self> {
        graph.module(id).map(|module| Self { graph, id, module })
    }

    fn template(&self, value: &ArgValue) -> Result<String, UnresolvedReason> {
        endpoint_template(
            value,
            &ModuleConstants {
                graph: self.graph,
                module: self.id,
            },
        )
    }

    /// Calls nested in the arguments of `call`
    fn nested(&self, call: &Call) -> impl Iterator<Item = &'g Call> + '_ {
        let id = call.id;
        self.module
            .facts
            .calls
            .iter()
            .filter(move |c| c.id > id && self.module.facts.is_descendant(c, id))
    }
}

pub struct ApiCallExtractor<'a> {
    catalog: &'a CallShapeCatalog,
    integrations: &'a IntegrationCatalog,
}

impl<'a> ApiCallExtractor<'a> {
    pub fn new(catalog: &'a CallShapeCatalog, integrations: &'a IntegrationCatalog) -> Self {
        Self {
            catalog,
            integrations,
        }
    }

    /// Extracts from every module of the graph
    pub fn extract(&self, graph: &ComponentGraph) -> Extraction {
        let ids: Vec<NodeId> = graph.sorted_modules().into_iter().map(|(id, _)| id).collect();
        self.extract_modules(graph, &ids)
    }

    /// Extracts from the given modules; call sites come from pages and
    /// components only, third-party usage from every module
    pub fn extract_modules(&self, graph: &ComponentGraph, ids: &[NodeId]) -> Extraction {
        let mut calls = Vec::new();
        let mut third_party = ThirdPartyUsage::default();
        for id in ids {
            calls.extend(self.extract_module(graph, *id));
            if let Some(module) = graph.module(*id) {
                third_party.merge(self.third_party(module));
            }
        }
        Extraction {
            calls: dedup_and_sort(calls),
            third_party,
        }
    }

    /// Call sites of one page or component module, in source order
    pub fn extract_module(&self, graph: &ComponentGraph, id: NodeId) -> Vec<ApiCallSite> {
        let Some(scope) = Scope::of(graph, id) else {
            return Vec::new();
        };
        if scope.module.parse_failed || !scope.module.is_component_like() {
            return Vec::new();
        }

        let facts = &scope.module.facts;
        let mut claimed: Vec<usize> = Vec::new();
        let mut sites = Vec::new();
        for call in &facts.calls {
            if claimed.iter().any(|ancestor| facts.is_descendant(call, *ancestor)) {
                continue;
            }
            if let Some(found) = self.interpret(&scope, call, 0) {
                claimed.push(call.id);
                sites.push(ApiCallSite {
                    endpoint: found.endpoint,
                    method: found.method,
                    hook_kind: found.kind,
                    component: component_of(scope.module, call),
                    file: scope.module.display.clone(),
                    location: call.location.clone(),
                    status: found.status,
                    callee: call.name.clone(),
                });
            }
        }
        debug!(file = %scope.module.display, calls = sites.len(), "Extracted call sites");
        sites
    }

    /// Best interpretation among the matching shapes; wrappers that lead
    /// nowhere fall through to the next candidate
    fn interpret(&self, scope: &Scope<'_>, call: &Call, depth: usize) -> Option<Interpretation> {
        for (_, shape) in self.catalog.candidates(call) {
            let found = match shape {
                CallShape::HookInvocation {
                    kind,
                    source: EndpointSource::Arguments,
                    ..
                } => Some(self.hook_arguments(scope, call, *kind, depth)),
                CallShape::HookInvocation {
                    kind,
                    source: EndpointSource::Definition,
                    ..
                } => self
                    .hook_definition(scope, call)
                    .or_else(|| {
                        if depth > 0 {
                            return None;
                        }
                        self.follow_wrapper(scope, call, ANY_KIND, depth)
                            .map(|found| Interpretation {
                                kind: HookKind::Wrapped,
                                ..found
                            })
                    })
                    .or_else(|| {
                        Some(Interpretation::unresolved(
                            *kind,
                            Some(kind.default_method()),
                            UnresolvedReason::MissingDefinition,
                        ))
                    }),
                CallShape::BareClientCall { method, .. } => Some(self.client(scope, call, *method)),
                CallShape::WrappedHook { resolves_to, .. } => {
                    if depth > 0 {
                        None
                    } else {
                        self.follow_wrapper(scope, call, resolves_to, depth)
                            .map(|found| Interpretation {
                                kind: HookKind::Wrapped,
                                ..found
                            })
                    }
                }
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// `fetch(url, init)`, `axios.get(url)`, `axios(config)`, `api.request(config)`
    fn client(&self, scope: &Scope<'_>, call: &Call, fixed: Option<HttpMethod>) -> Interpretation {
        let first = call.arguments.first();
        let (url, method_arg) = match first {
            Some(config @ ArgValue::Object(_)) => (config.property("url"), config.property("method")),
            other => (
                other,
                call.arguments.get(1).and_then(|init| init.property("method")),
            ),
        };

        let method = match fixed {
            Some(method) => Ok(method),
            None => client_method(call, method_arg),
        };
        let endpoint = match url {
            Some(value) => scope.template(value),
            None => Err(UnresolvedReason::MissingUrl),
        };
        Interpretation::from_parts(HookKind::Client, endpoint, method)
    }

    /// `useQuery`, `useSWR`, `useMutation` and friends: the URL comes from a
    /// client call inside the arguments, the key, or the fetching function
    fn hook_arguments(
        &self,
        scope: &Scope<'_>,
        call: &Call,
        kind: HookKind,
        depth: usize,
    ) -> Interpretation {
        let mut fallback = None;

        for inner in scope.nested(call) {
            if let Some(CallShape::BareClientCall { method, .. }) = self.catalog.direct_match(inner) {
                let found = Interpretation {
                    kind,
                    ..self.client(scope, inner, *method)
                };
                if found.status.is_resolved() {
                    return found;
                }
                fallback.get_or_insert(found);
            }
        }

        if let Some(url) = hook_url(call) {
            let found = Interpretation::from_parts(kind, scope.template(url), Ok(kind.default_method()));
            if found.status.is_resolved() {
                return found;
            }
            fallback.get_or_insert(found);
        }

        if depth == 0 {
            let mut references: Vec<&str> = fetcher_references(call);
            references.extend(
                scope
                    .nested(call)
                    .filter(|c| c.is_plain() && !c.is_new)
                    .map(|c| c.name.as_str()),
            );
            for name in references {
                let targets = scope.graph.resolve_local(scope.id, name);
                if let [target] = targets.as_slice() {
                    if let Some(found) = self.body(scope.graph, target, ANY_KIND, depth + 1) {
                        return Interpretation { kind, ..found };
                    }
                }
            }
        }

        fallback.unwrap_or_else(|| {
            Interpretation::unresolved(kind, Some(kind.default_method()), UnresolvedReason::MissingUrl)
        })
    }

    /// Generated `use<Name>Query` / `use<Name>Mutation` hooks; `None` when no
    /// definition carries the name
    fn hook_definition(&self, scope: &Scope<'_>, call: &Call) -> Option<Interpretation> {
        let name = definition_name(&call.name)?;
        let all = scope.graph.endpoint_definitions(&name);
        let candidates: Vec<_> = if all.len() > 1 {
            // prefer the module the hook is imported from
            let origins: HashSet<NodeId> = scope
                .graph
                .resolve_local(scope.id, &call.name)
                .into_iter()
                .map(|t| t.module)
                .collect();
            let local: Vec<_> = all.iter().filter(|(id, _)| origins.contains(id)).collect();
            if local.is_empty() {
                all.iter().collect()
            } else {
                local
            }
        } else {
            all.iter().collect()
        };

        match candidates.as_slice() {
            [] => None,
            [(module, definition)] => {
                let def_scope = Scope::of(scope.graph, *module)?;
                let endpoint = match &definition.url {
                    Some(url) => def_scope.template(url),
                    None => Err(UnresolvedReason::MissingUrl),
                };
                let method = match &definition.method {
                    Some(value) => value
                        .as_str()
                        .and_then(HttpMethod::from_str_opt)
                        .ok_or(UnresolvedReason::UnknownMethod),
                    None => Ok(definition.kind.default_method()),
                };
                Some(Interpretation::from_parts(definition.kind, endpoint, method))
            }
            _ => Some(Interpretation::unresolved(
                definition_kind(&call.name),
                None,
                UnresolvedReason::AmbiguousHook,
            )),
        }
    }

    /// Resolves the callee of a wrapper call to its declaration
    fn follow_wrapper(
        &self,
        scope: &Scope<'_>,
        call: &Call,
        resolves_to: &[HookKind],
        depth: usize,
    ) -> Option<Interpretation> {
        let segments: Vec<&str> = call.name.split('.').collect();
        let targets: Vec<SymbolTarget> = match segments.as_slice() {
            [name] => scope.graph.resolve_local(scope.id, name),
            [base, property] => scope
                .graph
                .resolve_local(scope.id, base)
                .into_iter()
                .map(|target| SymbolTarget {
                    local: if target.local == "*" {
                        property.to_string()
                    } else {
                        format!("{}.{}", target.local, property)
                    },
                    module: target.module,
                })
                .collect(),
            _ => return None,
        };

        match targets.as_slice() {
            [] => {
                let (import, _) = scope.module.facts.import_of(call.root_ident())?;
                matches!(
                    scope.graph.import_target(scope.id, &import.specifier),
                    Some(ImportTarget::Unresolved)
                )
                .then(|| {
                    Interpretation::unresolved(
                        HookKind::Wrapped,
                        None,
                        UnresolvedReason::UnresolvedImport,
                    )
                })
            }
            [target] => self.body(scope.graph, target, resolves_to, depth + 1),
            _ => Some(Interpretation::unresolved(
                HookKind::Wrapped,
                None,
                UnresolvedReason::AmbiguousWrapper,
            )),
        }
    }

    /// Network access made by the body of a declaration. Several different
    /// targets make the wrapper ambiguous.
    fn body(
        &self,
        graph: &ComponentGraph,
        target: &SymbolTarget,
        resolves_to: &[HookKind],
        depth: usize,
    ) -> Option<Interpretation> {
        let scope = Scope::of(graph, target.module)?;
        let nested_prefix = format!("{}.", target.local);
        let facts = &scope.module.facts;

        let mut claimed: Vec<usize> = Vec::new();
        let mut found: Vec<Interpretation> = Vec::new();
        for call in facts.calls.iter().filter(|c| {
            c.caller
                .as_deref()
                .map(|caller| caller == target.local || caller.starts_with(&nested_prefix))
                .unwrap_or(false)
        }) {
            if claimed.iter().any(|ancestor| facts.is_descendant(call, *ancestor)) {
                continue;
            }
            if let Some(interpretation) = self.interpret(&scope, call, depth) {
                claimed.push(call.id);
                if resolves_to.contains(&interpretation.kind) {
                    found.push(interpretation);
                }
            }
        }

        let first = found.first()?.clone();
        if found.iter().all(|other| other.same_target(&first)) {
            Some(first)
        } else {
            Some(Interpretation::unresolved(
                HookKind::Wrapped,
                None,
                UnresolvedReason::AmbiguousWrapper,
            ))
        }
    }

    /// Integrations and telemetry destinations a module uses
    pub fn third_party(&self, module: &SourceModule) -> ThirdPartyUsage {
        let facts = &module.facts;
        let component = module.component_name();
        let mut usage = ThirdPartyUsage::default();

        for import in &facts.imports {
            if let Some(signature) = self.integrations.integration_for_package(&import.specifier) {
                let imported: HashMap<&str, &str> = import
                    .bindings
                    .iter()
                    .map(|b| {
                        let name = match &b.imported {
                            ImportedName::Named(name) => name.as_str(),
                            ImportedName::Default | ImportedName::Namespace => b.local.as_str(),
                        };
                        (b.local.as_str(), name)
                    })
                    .collect();

                let mut members = BTreeSet::new();
                let mut aliases: HashSet<&str> = imported.keys().copied().collect();
                for call in &facts.calls {
                    let root = call.root_ident();
                    if !aliases.contains(root) {
                        continue;
                    }
                    if call.is_plain() {
                        if let Some(name) = imported.get(root) {
                            members.insert(name.to_string());
                        }
                    } else if let Some(property) = &call.property {
                        members.insert(property.clone());
                    }
                    if let Some(alias) = &call.assigned_to {
                        aliases.insert(alias.as_str());
                    }
                }
                for element in &facts.jsx {
                    if let Some(name) = imported.get(element.tag_root()) {
                        members.insert(element.tag.replacen(element.tag_root(), name, 1));
                    }
                }

                usage.merge(ThirdPartyUsage {
                    integrations: vec![IntegrationUsage {
                        name: signature.name.clone(),
                        category: signature.category,
                        packages: BTreeSet::from([import.specifier.clone()]),
                        members,
                        components: BTreeSet::from([component.clone()]),
                    }],
                    telemetry: Vec::new(),
                });
            }

            if let Some(destination) = self.integrations.telemetry_for_package(&import.specifier) {
                usage.merge(telemetry(&destination.name, &import.specifier));
            }
        }

        for url in &facts.url_literals {
            if let Some(destination) = self.integrations.telemetry_for_url(url) {
                usage.merge(telemetry(&destination.name, url));
            }
        }
        usage
    }
}

fn telemetry(name: &str, evidence: &str) -> ThirdPartyUsage {
    ThirdPartyUsage {
        integrations: Vec::new(),
        telemetry: vec![TelemetryUsage {
            name: name.to_string(),
            evidence: BTreeSet::from([evidence.to_string()]),
        }],
    }
}

/// Component a call is attributed to: its enclosing PascalCase declaration,
/// else the module's component
fn component_of(module: &SourceModule, call: &Call) -> String {
    match call.owner() {
        Some(owner) if owner.starts_with(|c: char| c.is_ascii_uppercase()) => owner.to_string(),
        _ => module.component_name(),
    }
}

/// Method from the client property (`axios.post`) or the init/config `method`
fn client_method(call: &Call, method_arg: Option<&ArgValue>) -> Result<HttpMethod, UnresolvedReason> {
    if let Some(method) = call.property.as_deref().and_then(HttpMethod::from_str_opt) {
        return Ok(method);
    }
    match method_arg {
        None => Ok(HttpMethod::Get),
        Some(value) => value
            .as_str()
            .and_then(HttpMethod::from_str_opt)
            .ok_or(UnresolvedReason::UnknownMethod),
    }
}

/// URL passed to a data hook: first argument, `url` option, or a path-like key
fn hook_url(call: &Call) -> Option<&ArgValue> {
    let first = call.arguments.first()?;
    match first {
        ArgValue::Object(_) => first
            .property("url")
            .or_else(|| first.property("queryKey").and_then(path_key))
            .or_else(|| first.property("mutationKey").and_then(path_key)),
        ArgValue::Array(_) => path_key(first),
        // SWR key function
        ArgValue::Function { returns, .. } => returns.as_deref().and_then(path_key),
        ArgValue::Call { .. } | ArgValue::Other(_) => None,
        other => Some(other),
    }
}

fn path_key(value: &ArgValue) -> Option<&ArgValue> {
    match value {
        ArgValue::Array(items) => items.first().filter(|item| looks_like_path(item)),
        other => Some(other).filter(|v| looks_like_path(v)),
    }
}

fn looks_like_path(value: &ArgValue) -> bool {
    let is_path = |s: &str| s.starts_with('/') || s.contains("://");
    match value {
        ArgValue::Str(s) => is_path(s),
        ArgValue::Template { quasis, .. } => quasis.iter().any(|q| q.contains('/')),
        ArgValue::Concat(items) => items.iter().any(looks_like_path),
        _ => false,
    }
}

/// Function references handed to a data hook (`queryFn: fetchTodos`, `useSWR(key, fetcher)`)
fn fetcher_references(call: &Call) -> Vec<&str> {
    let mut out = Vec::new();
    for (i, arg) in call.arguments.iter().enumerate() {
        match arg {
            ArgValue::Ident(name) if i > 0 => out.push(name.as_str()),
            ArgValue::Object(props) => {
                for (key, value) in props {
                    match value {
                        ArgValue::Ident(name) if FETCHER_KEYS.contains(&key.as_str()) => {
                            out.push(name.as_str())
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// `useGetTodosQuery` -> `getTodos`, `useLazyGetTodoQuery` -> `getTodo`
fn definition_name(hook: &str) -> Option<String> {
    let rest = hook
        .strip_prefix("useLazy")
        .filter(|r| r.starts_with(|c: char| c.is_ascii_uppercase()))
        .or_else(|| hook.strip_prefix("use"))?;
    let rest = ["InfiniteQuery", "QueryState", "Query", "Mutation"]
        .iter()
        .find_map(|suffix| rest.strip_suffix(suffix))?;
    (!rest.is_empty()).then(|| rest.to_lower_camel_case())
}

fn definition_kind(hook: &str) -> HookKind {
    if hook.ends_with("Mutation") {
        HookKind::Mutation
    } else {
        HookKind::Query
    }
}

/// Resolved sites dedup by (endpoint, method, component) keeping the most
/// direct hook kind, then the first location; unresolved ones by
/// (component, location, callee)
fn dedup_and_sort(mut calls: Vec<ApiCallSite>) -> Vec<ApiCallSite> {
    calls.sort_by(|a, b| {
        (a.is_resolved(), a.dedup_key(), a.hook_kind, &a.location)
            .cmp(&(b.is_resolved(), b.dedup_key(), b.hook_kind, &b.location))
    });

    let mut seen_resolved = HashSet::new();
    let mut seen_unresolved = HashSet::new();
    calls.retain(|site| {
        if site.is_resolved() {
            seen_resolved.insert(site.dedup_key())
        } else {
            seen_unresolved.insert((site.component.clone(), site.location.clone(), site.callee.clone()))
        }
    });

    calls.sort_by(|a, b| {
        (&a.file, &a.location, &a.endpoint, a.method, a.hook_kind, &a.callee)
            .cmp(&(&b.file, &b.location, &b.endpoint, b.method, b.hook_kind, &b.callee))
    });
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProjectLayout;
    use crate::graph_builder::ModuleGraphBuilder;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn extract(root: &Path) -> Extraction {
        let graph = ModuleGraphBuilder::build_project(ProjectLayout::for_root(root)).unwrap();
        let catalog = CallShapeCatalog::default();
        let integrations = IntegrationCatalog::default();
        ApiCallExtractor::new(&catalog, &integrations).extract(&graph)
    }

    fn summary(extraction: &Extraction) -> Vec<(String, String, String, String)> {
        extraction
            .calls
            .iter()
            .map(|c| {
                (
                    c.method.map(|m| m.to_string()).unwrap_or_default(),
                    c.endpoint.clone().unwrap_or_default(),
                    c.hook_kind.to_string(),
                    c.status.to_string(),
                )
            })
            .collect()
    }

    fn row(method: &str, endpoint: &str, kind: &str) -> (String, String, String, String) {
        (method.into(), endpoint.into(), kind.into(), "resolved".into())
    }

    #[test]
    fn test_hooks_and_clients_in_a_page() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/pages/Todos.tsx",
            r#"
import axios from 'axios';
import { useQuery, useMutation } from '@tanstack/react-query';
import { api } from '../api/client';

export default function Todos() {
    const { data } = useQuery({
        queryKey: ['todos'],
        queryFn: () => api.get('/api/todos/'),
    });
    const add = useMutation({ mutationFn: (todo) => axios.post('/api/todos/', todo) });
    const remove = (id: number) => fetch(`/api/todos/${id}/`, { method: 'DELETE' });
    return <ul>{data?.map((t) => <li key={t.id}>{t.title}</li>)}</ul>;
}
"#,
        );
        write(root, "src/api/client.ts", "import axios from 'axios';\nexport const api = axios.create({ baseURL: '/' });\n");

        let extraction = extract(root);
        assert_eq!(
            summary(&extraction),
            vec![
                row("GET", "/api/todos/", "query"),
                row("POST", "/api/todos/", "mutation"),
                row("DELETE", "/api/todos/{id}/", "client"),
            ]
        );
        assert!(extraction.calls.iter().all(|c| c.component == "Todos"));
    }

    #[test]
    fn test_wrapper_resolved_one_level() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/hooks/useUser.ts",
            r#"
import useSWR from 'swr';
export function useUser(id: string) {
    return useSWR(`/api/users/${id}/`);
}
export async function fetchOrders() {
    const response = await fetch('/api/orders?page=1');
    return response.json();
}
"#,
        );
        write(
            root,
            "src/pages/Profile.tsx",
            r#"
import { useUser, fetchOrders } from '../hooks/useUser';
export default function Profile({ id }) {
    const { data } = useUser(id);
    useEffect(() => { fetchOrders(); }, []);
    return <h1>{data.name}</h1>;
}
"#,
        );

        let extraction = extract(root);
        assert_eq!(
            summary(&extraction),
            vec![
                row("GET", "/api/users/{id}/", "wrapped"),
                row("GET", "/api/orders", "wrapped"),
            ]
        );
    }

    #[test]
    fn test_generated_hooks_follow_definitions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/store/todoApi.ts",
            r#"
export const todoApi = createApi({
    endpoints: (builder) => ({
        getTodos: builder.query({ query: () => '/todos/' }),
        updateTodo: builder.mutation({
            query: ({ id, ...patch }) => ({ url: `/todos/${id}/`, method: 'PATCH', body: patch }),
        }),
    }),
});
export const { useGetTodosQuery, useUpdateTodoMutation } = todoApi;
"#,
        );
        write(
            root,
            "src/pages/Board.tsx",
            r#"
import { useGetTodosQuery, useUpdateTodoMutation, useGetBoardsQuery } from '../store/todoApi';
export default function Board() {
    const { data } = useGetTodosQuery();
    const [update] = useUpdateTodoMutation();
    const boards = useGetBoardsQuery();
    return <div>{data.length}</div>;
}
"#,
        );

        let extraction = extract(root);
        let statuses: Vec<_> = summary(&extraction);
        assert_eq!(statuses[0], row("GET", "/todos/", "query"));
        assert_eq!(statuses[1], row("PATCH", "/todos/{id}/", "mutation"));
        assert_eq!(statuses[2].3, "unresolved:missing-definition");
    }

    #[test]
    fn test_unresolved_reasons() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/pages/Search.tsx",
            r#"
import axios from 'axios';
import { loadResults } from '../missing/loader';
export default function Search({ url, verb }) {
    axios.get(url);
    fetch('/api/search', { method: verb });
    loadResults();
    return <div />;
}
"#,
        );

        let extraction = extract(root);
        let statuses: Vec<String> = extraction.calls.iter().map(|c| c.status.to_string()).collect();
        assert_eq!(
            statuses,
            vec![
                "unresolved:dynamic-url",
                "unresolved:unknown-method",
                "unresolved:unresolved-import",
            ]
        );
    }

    #[test]
    fn test_same_endpoint_deduplicated_per_component() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/pages/Users.tsx",
            r#"
export default function Users() {
    fetch('/api/users/');
    fetch('/api/users/');
    return <div />;
}
"#,
        );

        let extraction = extract(root);
        assert_eq!(extraction.calls.len(), 1);
        assert_eq!(extraction.calls[0].location.line, 3);
    }

    #[test]
    fn test_dedup_key_ignores_defining_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let header = "export function Header() {\n    fetch('/api/menu/');\n    return <nav />;\n}\n";
        write(root, "src/components/admin/Header.tsx", header);
        write(root, "src/components/shop/Header.tsx", header);

        let extraction = extract(root);
        assert_eq!(extraction.calls.len(), 1);
        assert_eq!(extraction.calls[0].component, "Header");
        assert_eq!(extraction.calls[0].file, "src/components/admin/Header.tsx");
    }

    #[test]
    fn test_third_party_usage() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/pages/Checkout.tsx",
            r#"
import { loadStripe } from '@stripe/stripe-js';
import { Elements } from '@stripe/react-stripe-js';
import posthog from 'posthog-js';
const stripePromise = loadStripe('pk_test');
export default function Checkout() {
    const pay = async () => {
        const stripe = await loadStripe('pk_test');
        await stripe.confirmCardPayment('secret');
    };
    posthog.capture('checkout');
    return <Elements stripe={stripePromise}><button onClick={pay}>Pay</button></Elements>;
}
"#,
        );

        let extraction = extract(root);
        let usage = &extraction.third_party;
        assert_eq!(usage.integrations.len(), 1);
        let stripe = &usage.integrations[0];
        assert_eq!(stripe.name, "stripe");
        assert_eq!(
            stripe.members.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Elements", "confirmCardPayment", "loadStripe"]
        );
        assert_eq!(usage.telemetry.len(), 1);
        assert_eq!(usage.telemetry[0].name, "posthog");
    }

    #[test]
    fn test_definition_name() {
        assert_eq!(definition_name("useGetTodosQuery").as_deref(), Some("getTodos"));
        assert_eq!(definition_name("useLazyGetTodoQuery").as_deref(), Some("getTodo"));
        assert_eq!(definition_name("useAddTodoMutation").as_deref(), Some("addTodo"));
        assert_eq!(definition_name("useQuery"), None);
    }
}
