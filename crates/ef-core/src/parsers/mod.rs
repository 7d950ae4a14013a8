pub mod location;
pub mod typescript;

pub use location::*;
pub use typescript::*;

use crate::models::{HookKind, Location};
use crate::rewrite::TextEdit;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import x from '...'`
    Static,
    /// `import '...'`
    SideEffect,
    /// `export { x } from '...'`
    ReExport,
    /// `export * from '...'`
    ReExportAll,
    /// `import('...')`
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportedName {
    Default,
    Namespace,
    Named(String),
}

/// Local name introduced by an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedName,
}

/// Module import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// Specifier as written (`./Button`, `@/api/client`, `react`)
    pub specifier: String,
    pub kind: ImportKind,
    pub bindings: Vec<ImportBinding>,
    pub line: usize,
}

/// Exported symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    /// Exported name, `default` for default exports
    pub name: String,
    /// Local declaration backing the export
    pub local: Option<String>,
    /// Specifier of the module it is re-exported from
    pub source: Option<String>,
}

/// Statically known shape of a call argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Str(String),
    /// Template literal split into raw quasis and expression texts
    Template {
        quasis: Vec<String>,
        exprs: Vec<String>,
    },
    Ident(String),
    /// Dotted member path (`API.users.list`)
    Member(String),
    Object(Vec<(String, ArgValue)>),
    Array(Vec<ArgValue>),
    Call {
        callee: String,
        args: Vec<ArgValue>,
    },
    Function {
        params: Vec<String>,
        returns: Option<Box<ArgValue>>,
    },
    /// `a + b + c`
    Concat(Vec<ArgValue>),
    /// Anything else, as source text
    Other(String),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            ArgValue::Template { quasis, exprs } if exprs.is_empty() => {
                quasis.first().map(|s| s.as_str())
            }
            _ => None,
        }
    }

    /// Looks up a property of an object literal
    pub fn property(&self, key: &str) -> Option<&ArgValue> {
        match self {
            ArgValue::Object(props) => props.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Identifier names referenced directly by this value or its object/array members
    pub fn referenced_idents(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_idents(&mut out);
        out
    }

    fn collect_idents<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ArgValue::Ident(name) => out.push(name),
            ArgValue::Object(props) => props.iter().for_each(|(_, v)| v.collect_idents(out)),
            ArgValue::Array(items) => items.iter().for_each(|v| v.collect_idents(out)),
            _ => {}
        }
    }
}

/// Function call (or `new` expression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Index of the call within its module, in source order
    pub id: usize,
    /// Innermost call whose arguments contain this call
    pub parent: Option<usize>,
    /// Dotted callee name (`axios.get`, `useQuery`)
    pub name: String,
    /// Root identifier of a member callee (`axios` in `axios.get`)
    pub base_object: Option<String>,
    /// Last property of a member callee (`get` in `axios.get`)
    pub property: Option<String>,
    pub arguments: Vec<ArgValue>,
    pub location: Location,
    pub start: usize,
    pub end: usize,
    /// Enclosing declarations joined by `.`
    pub caller: Option<String>,
    /// Variable or object key receiving the call result directly
    pub assigned_to: Option<String>,
    pub is_new: bool,
}

impl Call {
    /// Top-level declaration that contains the call
    pub fn owner(&self) -> Option<&str> {
        self.caller
            .as_deref()
            .and_then(|caller| caller.split('.').next())
    }

    /// Identifier the callee hangs off: the callee itself or the member root
    pub fn root_ident(&self) -> &str {
        self.base_object.as_deref().unwrap_or(&self.name)
    }

    pub fn is_plain(&self) -> bool {
        self.base_object.is_none()
    }
}

/// Top-level function-like declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<String>,
    pub line: usize,
    /// Body renders JSX
    pub renders_jsx: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Boolean attribute without a value
    Flag,
    Str(String),
    /// Expression inside braces, as source text
    Expr(String),
}

impl AttrValue {
    pub fn as_static(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsxAttribute {
    pub name: String,
    pub value: AttrValue,
    pub start: usize,
    pub end: usize,
}

/// Iteration (`items.map(...)`) enclosing an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopContext {
    pub id: usize,
    /// Iterated expression (`todos`, `data.results`)
    pub collection: String,
    pub item: Option<String>,
    /// Index parameter, existing or to be added
    pub index_name: String,
    pub has_index: bool,
    /// `key` expression of the loop's root element
    pub key: Option<String>,
    /// Edits adding the index parameter when it is missing
    pub index_edits: Vec<TextEdit>,
}

impl LoopContext {
    /// Expression that distinguishes one iteration from another
    pub fn disambiguator(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.index_name)
    }

    /// Whether using the disambiguator requires adding the index parameter
    pub fn needs_index(&self) -> bool {
        self.key.is_none() && !self.has_index
    }
}

/// JSX element occurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsxElementInfo {
    pub id: usize,
    pub tag: String,
    pub attributes: Vec<JsxAttribute>,
    /// Concatenated static text children
    pub text: String,
    /// Source text of rendered text expressions (`{todo.title}`)
    pub dynamic_children: Vec<String>,
    pub location: Location,
    /// Offset right after the tag name, where attributes can be inserted
    pub insert_at: usize,
    /// Innermost enclosing component
    pub component: Option<String>,
    /// Enclosing iterations, outermost first
    pub loops: Vec<LoopContext>,
    /// Root element of the innermost iteration
    pub is_loop_root: bool,
    pub inside_svg: bool,
}

impl JsxElementInfo {
    pub fn attribute(&self, name: &str) -> Option<&JsxAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn static_attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|a| a.value.as_static())
    }

    /// Event handler attributes (`onClick`, `onSubmit`)
    pub fn handlers(&self) -> impl Iterator<Item = &JsxAttribute> {
        self.attributes.iter().filter(|a| {
            a.name.len() > 2
                && a.name.starts_with("on")
                && a.name[2..].starts_with(|c: char| c.is_ascii_uppercase())
        })
    }

    pub fn is_intrinsic(&self) -> bool {
        self.tag.starts_with(|c: char| c.is_ascii_lowercase())
    }

    /// First identifier of the tag (`Form` in `Form.Control`)
    pub fn tag_root(&self) -> &str {
        self.tag.split('.').next().unwrap_or(&self.tag)
    }
}

/// `name: builder.query({ query: ... })` style endpoint declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub name: String,
    pub kind: HookKind,
    pub url: Option<ArgValue>,
    pub method: Option<ArgValue>,
    pub line: usize,
}

/// Everything the scanner extracts from one module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleFacts {
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub functions: Vec<FunctionInfo>,
    pub calls: Vec<Call>,
    pub jsx: Vec<JsxElementInfo>,
    /// Module-level string constants, object members flattened as `A.b`
    pub constants: IndexMap<String, String>,
    /// Absolute URL literals appearing anywhere in the module
    pub url_literals: Vec<String>,
    /// Local names declared at module level, functions or not
    pub declarations: Vec<String>,
}

impl ModuleFacts {
    pub fn has_jsx(&self) -> bool {
        !self.jsx.is_empty()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// Calls made inside a top-level declaration
    pub fn calls_in(&self, owner: &str) -> impl Iterator<Item = &Call> {
        let owner = owner.to_string();
        self.calls
            .iter()
            .filter(move |c| c.owner() == Some(owner.as_str()))
    }

    /// Whether `ancestor` contains `call` in its arguments, at any depth
    pub fn is_descendant(&self, call: &Call, ancestor: usize) -> bool {
        let mut current = call.parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.calls.get(id).and_then(|c| c.parent);
        }
        false
    }

    /// Import that introduces the given local name
    pub fn import_of(&self, local: &str) -> Option<(&Import, &ImportBinding)> {
        self.imports.iter().find_map(|import| {
            import
                .bindings
                .iter()
                .find(|b| b.local == local)
                .map(|b| (import, b))
        })
    }

    /// Name of the component this module primarily renders
    pub fn primary_component(&self) -> Option<String> {
        let is_pascal = |name: &str| name.starts_with(|c: char| c.is_ascii_uppercase());
        if let Some(local) = self
            .export("default")
            .and_then(|e| e.local.as_deref())
            .filter(|name| is_pascal(name))
        {
            return Some(local.to_string());
        }
        if let Some(export) = self.exports.iter().find(|e| {
            e.source.is_none()
                && is_pascal(&e.name)
                && self.function(e.local.as_deref().unwrap_or(&e.name)).is_some()
        }) {
            return Some(export.name.clone());
        }
        self.functions
            .iter()
            .find(|f| f.renders_jsx && is_pascal(&f.name))
            .map(|f| f.name.clone())
    }

    /// Endpoint declarations made through `builder.query` / `builder.mutation`
    pub fn endpoint_definitions(&self) -> Vec<EndpointDefinition> {
        self.calls
            .iter()
            .filter_map(|call| {
                let kind = match call.property.as_deref()? {
                    "query" | "infiniteQuery" => HookKind::Query,
                    "mutation" => HookKind::Mutation,
                    _ => return None,
                };
                call.base_object.as_ref()?;
                let name = call.assigned_to.clone()?;
                let config = call.arguments.first()?;
                let query = config.property("query").or_else(|| config.property("url"))?;
                let (url, method) = match query {
                    ArgValue::Function { returns, .. } => match returns.as_deref() {
                        Some(obj @ ArgValue::Object(_)) => {
                            (obj.property("url").cloned(), obj.property("method").cloned())
                        }
                        Some(other) => (Some(other.clone()), None),
                        None => (None, None),
                    },
                    other => (Some(other.clone()), None),
                };
                Some(EndpointDefinition {
                    name,
                    kind,
                    url,
                    method,
                    line: call.location.line,
                })
            })
            .collect()
    }
}
