use crate::error::EfError;
use crate::models::Location;
use crate::parsers::{
    ArgValue, AttrValue, Call, Export, FunctionInfo, Import, ImportBinding, ImportKind,
    ImportedName, JsxAttribute, JsxElementInfo, LocationConverter, LoopContext, ModuleFacts,
};
use crate::rewrite::TextEdit;
use std::collections::HashSet;
use std::path::Path;
use swc_common::{sync::Lrc, BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::*;
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};

/// Extensions the scanner understands
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

const MAX_ARG_DEPTH: usize = 5;

/// TypeScript/JavaScript parser producing [`ModuleFacts`] (via swc)
///
/// The syntax tree never leaves this type; callers only see the extracted
/// facts, which are plain owned data and can be shared across threads.
pub struct TypeScriptParser {
    source_map: SourceMap,
}

impl TypeScriptParser {
    /// Creates a new parser
    pub fn new() -> Self {
        Self {
            source_map: SourceMap::default(),
        }
    }

    /// Scans source text; `path` selects the syntax and `display` is used in locations
    pub fn scan_source(
        &self,
        source: &str,
        path: &Path,
        display: &str,
    ) -> Result<ModuleFacts, EfError> {
        let file_name: Lrc<FileName> = FileName::Real(path.to_path_buf()).into();
        let fm = self
            .source_map
            .new_source_file(file_name, source.to_string());

        let lexer = Lexer::new(
            syntax_for(path),
            Default::default(),
            StringInput::from(&*fm),
            None,
        );
        let mut parser = Parser::new_from(lexer);
        let module = parser.parse_module().map_err(|e| EfError::Parse {
            file: path.to_path_buf(),
            message: format!("{:?}", e.kind()),
        })?;

        let mut scanner = Scanner::new(source, fm.start_pos.0, display);
        for item in &module.body {
            scanner.scan_module_item(item);
        }
        Ok(scanner.finish())
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// JSX is only enabled for `.tsx` in TypeScript, where `<T>` would otherwise be ambiguous
fn syntax_for(path: &Path) -> Syntax {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ts") | Some("mts") | Some("cts") => Syntax::Typescript(TsSyntax {
            tsx: false,
            ..Default::default()
        }),
        Some("tsx") => Syntax::Typescript(TsSyntax {
            tsx: true,
            ..Default::default()
        }),
        _ => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
    }
}

fn is_pascal(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

fn unwrap_expr(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(p) => unwrap_expr(&p.expr),
        Expr::TsAs(e) => unwrap_expr(&e.expr),
        Expr::TsNonNull(e) => unwrap_expr(&e.expr),
        Expr::TsSatisfies(e) => unwrap_expr(&e.expr),
        Expr::TsConstAssertion(e) => unwrap_expr(&e.expr),
        Expr::TsTypeAssertion(e) => unwrap_expr(&e.expr),
        Expr::Await(a) => unwrap_expr(&a.arg),
        _ => expr,
    }
}

fn str_value(s: &Str) -> String {
    s.value.as_str().unwrap_or("").to_string()
}

fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.as_ref().to_string(),
        ModuleExportName::Str(s) => str_value(s),
    }
}

fn jsx_member_name(member: &JSXMemberExpr) -> String {
    let obj = match &member.obj {
        JSXObject::Ident(ident) => ident.sym.as_ref().to_string(),
        JSXObject::JSXMemberExpr(inner) => jsx_member_name(inner),
    };
    format!("{}.{}", obj, member.prop.sym.as_ref())
}

fn jsx_name(name: &JSXElementName) -> String {
    match name {
        JSXElementName::Ident(ident) => ident.sym.as_ref().to_string(),
        JSXElementName::JSXMemberExpr(member) => jsx_member_name(member),
        JSXElementName::JSXNamespacedName(ns) => {
            format!("{}:{}", ns.ns.sym.as_ref(), ns.name.sym.as_ref())
        }
    }
}

/// Dotted path of a plain member chain (`api.users.list`)
fn member_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.as_ref().to_string()),
        Expr::This(_) => Some("this".to_string()),
        Expr::Member(member) => {
            let base = member_path(&member.obj)?;
            match &member.prop {
                MemberProp::Ident(prop) => Some(format!("{}.{}", base, prop.sym.as_ref())),
                MemberProp::Computed(computed) => match computed.expr.as_ref() {
                    Expr::Lit(Lit::Str(s)) => Some(format!("{}.{}", base, str_value(s))),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

fn root_ident(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.as_ref().to_string()),
        Expr::This(_) => Some("this".to_string()),
        Expr::Member(member) => root_ident(&member.obj),
        Expr::Call(call) => match &call.callee {
            Callee::Expr(callee) => root_ident(callee),
            _ => None,
        },
        _ => None,
    }
}

fn pat_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(binding) => Some(binding.id.sym.as_ref().to_string()),
        Pat::Assign(assign) => pat_name(&assign.left),
        _ => None,
    }
}

/// End of a parameter pattern including its type annotation
fn pat_end(pat: &Pat) -> BytePos {
    match pat {
        Pat::Ident(binding) => binding
            .type_ann
            .as_ref()
            .map(|t| t.span.hi)
            .unwrap_or(binding.id.span.hi),
        Pat::Object(obj) => obj.type_ann.as_ref().map(|t| t.span.hi).unwrap_or(obj.span.hi),
        Pat::Array(arr) => arr.type_ann.as_ref().map(|t| t.span.hi).unwrap_or(arr.span.hi),
        other => other.span().hi,
    }
}

fn pat_names(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(binding) => out.push(binding.id.sym.as_ref().to_string()),
        Pat::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => pat_names(&kv.value, out),
                    ObjectPatProp::Assign(assign) => {
                        out.push(assign.key.id.sym.as_ref().to_string())
                    }
                    ObjectPatProp::Rest(rest) => pat_names(&rest.arg, out),
                }
            }
        }
        Pat::Array(arr) => arr.elems.iter().flatten().for_each(|p| pat_names(p, out)),
        Pat::Assign(assign) => pat_names(&assign.left, out),
        _ => {}
    }
}

/// Whether a rendered child expression produces text rather than elements
fn is_text_expr(expr: &Expr) -> bool {
    match unwrap_expr(expr) {
        Expr::JSXElement(_) | Expr::JSXFragment(_) | Expr::Arrow(_) | Expr::Fn(_) => false,
        Expr::Lit(_) | Expr::Object(_) | Expr::Array(_) => false,
        Expr::Bin(bin)
            if matches!(
                bin.op,
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing
            ) =>
        {
            is_text_expr(&bin.right)
        }
        Expr::Cond(cond) => is_text_expr(&cond.cons) || is_text_expr(&cond.alt),
        Expr::Call(call) => match &call.callee {
            Callee::Expr(callee) => !is_iteration_callee(callee),
            _ => false,
        },
        Expr::OptChain(opt) => match opt.base.as_ref() {
            OptChainBase::Call(call) => !is_iteration_callee(&call.callee),
            OptChainBase::Member(_) => true,
        },
        _ => true,
    }
}

/// `x.map`, `x?.flatMap`, `x.filter`
fn is_iteration_callee(callee: &Expr) -> bool {
    let prop = match unwrap_expr(callee) {
        Expr::Member(member) => &member.prop,
        Expr::OptChain(opt) => match opt.base.as_ref() {
            OptChainBase::Member(member) => &member.prop,
            OptChainBase::Call(_) => return false,
        },
        _ => return false,
    };
    matches!(prop, MemberProp::Ident(p) if matches!(p.sym.as_ref(), "map" | "flatMap" | "filter"))
}

struct LoopScope {
    ctx: LoopContext,
    root_seen: bool,
}

/// Single pass over a module collecting imports, calls and JSX
struct Scanner<'a> {
    source: &'a str,
    base: u32,
    file: &'a str,
    lines: LocationConverter,
    facts: ModuleFacts,
    context: Vec<String>,
    call_stack: Vec<usize>,
    loops: Vec<LoopScope>,
    next_loop_id: usize,
    svg_depth: usize,
    jsx_owners: HashSet<String>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str, base: u32, file: &'a str) -> Self {
        Self {
            source,
            base,
            file,
            lines: LocationConverter::new(source),
            facts: ModuleFacts::default(),
            context: Vec::new(),
            call_stack: Vec::new(),
            loops: Vec::new(),
            next_loop_id: 0,
            svg_depth: 0,
            jsx_owners: HashSet::new(),
        }
    }

    fn finish(mut self) -> ModuleFacts {
        for function in &mut self.facts.functions {
            function.renders_jsx = self.jsx_owners.contains(&function.name);
        }
        self.facts.url_literals.sort();
        self.facts.url_literals.dedup();
        self.facts
    }

    fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.base) as usize
    }

    fn text(&self, span: Span) -> &'a str {
        self.source
            .get(self.offset(span.lo)..self.offset(span.hi))
            .unwrap_or("")
    }

    fn location(&self, pos: BytePos) -> Location {
        let (line, column) = self.lines.byte_offset_to_location(self.offset(pos));
        Location::new(self.file, line, column)
    }

    fn prop_name(&self, key: &PropName) -> String {
        match key {
            PropName::Ident(ident) => ident.sym.as_ref().to_string(),
            PropName::Str(s) => str_value(s),
            other => self.text(other.span()).to_string(),
        }
    }

    // ---- module level ----

    fn scan_module_item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::ModuleDecl(decl) => self.scan_module_decl(decl),
            ModuleItem::Stmt(stmt) => {
                if let Stmt::Decl(decl) = stmt {
                    self.record_declaration(decl);
                }
                self.walk_stmt(stmt);
            }
        }
    }

    fn scan_module_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(import) => {
                if import.type_only {
                    return;
                }
                let bindings: Vec<ImportBinding> = import
                    .specifiers
                    .iter()
                    .filter_map(|specifier| match specifier {
                        ImportSpecifier::Named(named) if !named.is_type_only => {
                            let local = named.local.sym.as_ref().to_string();
                            let imported = named
                                .imported
                                .as_ref()
                                .map(module_export_name)
                                .unwrap_or_else(|| local.clone());
                            Some(ImportBinding {
                                local,
                                imported: ImportedName::Named(imported),
                            })
                        }
                        ImportSpecifier::Named(_) => None,
                        ImportSpecifier::Default(default) => Some(ImportBinding {
                            local: default.local.sym.as_ref().to_string(),
                            imported: ImportedName::Default,
                        }),
                        ImportSpecifier::Namespace(ns) => Some(ImportBinding {
                            local: ns.local.sym.as_ref().to_string(),
                            imported: ImportedName::Namespace,
                        }),
                    })
                    .collect();
                // `import { type A } from` leaves nothing behind at runtime
                if bindings.is_empty() && !import.specifiers.is_empty() {
                    return;
                }
                let kind = if import.specifiers.is_empty() {
                    ImportKind::SideEffect
                } else {
                    ImportKind::Static
                };
                self.facts.imports.push(Import {
                    specifier: str_value(&import.src),
                    kind,
                    bindings,
                    line: self.location(import.span.lo).line,
                });
            }
            ModuleDecl::ExportDecl(export) => {
                for name in self.record_declaration(&export.decl) {
                    self.facts.exports.push(Export {
                        name: name.clone(),
                        local: Some(name),
                        source: None,
                    });
                }
                self.walk_decl(&export.decl);
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                let (name, function, class) = match &export.decl {
                    DefaultDecl::Fn(f) => (
                        f.ident.as_ref().map(|i| i.sym.as_ref().to_string()),
                        Some(&f.function),
                        None,
                    ),
                    DefaultDecl::Class(c) => (
                        c.ident.as_ref().map(|i| i.sym.as_ref().to_string()),
                        None,
                        Some(&c.class),
                    ),
                    _ => return,
                };
                let name = name.unwrap_or_else(|| "default".to_string());
                self.facts.exports.push(Export {
                    name: "default".to_string(),
                    local: Some(name.clone()),
                    source: None,
                });
                self.facts.declarations.push(name.clone());
                self.facts.functions.push(FunctionInfo {
                    name: name.clone(),
                    params: function.map(|f| self.function_params(f)).unwrap_or_default(),
                    line: self.location(export.span.lo).line,
                    renders_jsx: false,
                });
                self.context.push(name);
                if let Some(function) = function {
                    self.walk_function(function);
                }
                if let Some(class) = class {
                    self.walk_class(class);
                }
                self.context.pop();
            }
            ModuleDecl::ExportDefaultExpr(export) => {
                let expr = unwrap_expr(&export.expr);
                let local = match expr {
                    Expr::Ident(ident) => Some(ident.sym.as_ref().to_string()),
                    // memo(Component), connect(...)(Component)
                    Expr::Call(call) => call.args.iter().find_map(|arg| match unwrap_expr(&arg.expr) {
                        Expr::Ident(ident) if is_pascal(ident.sym.as_ref()) => {
                            Some(ident.sym.as_ref().to_string())
                        }
                        _ => None,
                    }),
                    Expr::Arrow(_) | Expr::Fn(_) => Some("default".to_string()),
                    _ => None,
                };
                self.facts.exports.push(Export {
                    name: "default".to_string(),
                    local: local.clone(),
                    source: None,
                });
                if matches!(expr, Expr::Arrow(_) | Expr::Fn(_)) {
                    self.facts.functions.push(FunctionInfo {
                        name: "default".to_string(),
                        params: self.expr_params(expr),
                        line: self.location(export.span.lo).line,
                        renders_jsx: false,
                    });
                    self.context.push("default".to_string());
                    self.walk_expr(&export.expr);
                    self.context.pop();
                } else {
                    self.walk_expr(&export.expr);
                }
            }
            ModuleDecl::ExportNamed(named) => {
                if named.type_only {
                    return;
                }
                let source = named.src.as_ref().map(|s| str_value(s));
                let mut bindings = Vec::new();
                for specifier in &named.specifiers {
                    let (name, local) = match specifier {
                        ExportSpecifier::Named(s) if !s.is_type_only => {
                            let orig = module_export_name(&s.orig);
                            let exported = s
                                .exported
                                .as_ref()
                                .map(module_export_name)
                                .unwrap_or_else(|| orig.clone());
                            (exported, orig)
                        }
                        ExportSpecifier::Named(_) => continue,
                        ExportSpecifier::Default(s) => {
                            (s.exported.sym.as_ref().to_string(), "default".to_string())
                        }
                        ExportSpecifier::Namespace(s) => {
                            (module_export_name(&s.name), "*".to_string())
                        }
                    };
                    bindings.push(ImportBinding {
                        local: name.clone(),
                        imported: if local == "*" {
                            ImportedName::Namespace
                        } else if local == "default" {
                            ImportedName::Default
                        } else {
                            ImportedName::Named(local.clone())
                        },
                    });
                    self.facts.exports.push(Export {
                        name,
                        local: Some(local),
                        source: source.clone(),
                    });
                }
                if let Some(specifier) = source {
                    self.facts.imports.push(Import {
                        specifier,
                        kind: ImportKind::ReExport,
                        bindings,
                        line: self.location(named.span.lo).line,
                    });
                }
            }
            ModuleDecl::ExportAll(all) => {
                if all.type_only {
                    return;
                }
                let specifier = str_value(&all.src);
                self.facts.exports.push(Export {
                    name: "*".to_string(),
                    local: None,
                    source: Some(specifier.clone()),
                });
                self.facts.imports.push(Import {
                    specifier,
                    kind: ImportKind::ReExportAll,
                    bindings: Vec::new(),
                    line: self.location(all.span.lo).line,
                });
            }
            _ => {}
        }
    }

    /// Records module-level names, functions and constants; returns declared names
    fn record_declaration(&mut self, decl: &Decl) -> Vec<String> {
        let mut names = Vec::new();
        match decl {
            Decl::Fn(fn_decl) => {
                let name = fn_decl.ident.sym.as_ref().to_string();
                self.facts.functions.push(FunctionInfo {
                    name: name.clone(),
                    params: self.function_params(&fn_decl.function),
                    line: self.location(fn_decl.ident.span.lo).line,
                    renders_jsx: false,
                });
                names.push(name);
            }
            Decl::Class(class_decl) => {
                let name = class_decl.ident.sym.as_ref().to_string();
                self.facts.functions.push(FunctionInfo {
                    name: name.clone(),
                    params: Vec::new(),
                    line: self.location(class_decl.ident.span.lo).line,
                    renders_jsx: false,
                });
                names.push(name);
            }
            Decl::Var(var_decl) => {
                for declarator in &var_decl.decls {
                    let mut declared = Vec::new();
                    pat_names(&declarator.name, &mut declared);
                    if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init)
                    {
                        let name = binding.id.sym.as_ref().to_string();
                        if self.is_function_like(init) {
                            self.facts.functions.push(FunctionInfo {
                                name: name.clone(),
                                params: self.expr_params(init),
                                line: self.location(binding.id.span.lo).line,
                                renders_jsx: false,
                            });
                        } else {
                            self.record_constant(&name, init, 0);
                        }
                    }
                    names.extend(declared);
                }
            }
            _ => {}
        }
        self.facts.declarations.extend(names.iter().cloned());
        names
    }

    /// Arrow/function expressions, and calls wrapping one (`memo(() => ...)`)
    fn is_function_like(&self, expr: &Expr) -> bool {
        match unwrap_expr(expr) {
            Expr::Arrow(_) | Expr::Fn(_) => true,
            Expr::Call(call) => call
                .args
                .iter()
                .any(|arg| matches!(unwrap_expr(&arg.expr), Expr::Arrow(_) | Expr::Fn(_))),
            _ => false,
        }
    }

    fn expr_params(&self, expr: &Expr) -> Vec<String> {
        match unwrap_expr(expr) {
            Expr::Arrow(arrow) => arrow.params.iter().map(|p| self.param_name(p)).collect(),
            Expr::Fn(f) => self.function_params(&f.function),
            Expr::Call(call) => call
                .args
                .iter()
                .find(|arg| matches!(unwrap_expr(&arg.expr), Expr::Arrow(_) | Expr::Fn(_)))
                .map(|arg| self.expr_params(&arg.expr))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn function_params(&self, function: &Function) -> Vec<String> {
        function
            .params
            .iter()
            .map(|p| self.param_name(&p.pat))
            .collect()
    }

    fn param_name(&self, pat: &Pat) -> String {
        pat_name(pat).unwrap_or_else(|| self.text(pat.span()).to_string())
    }

    fn record_constant(&mut self, name: &str, init: &Expr, depth: usize) {
        if depth > 3 {
            return;
        }
        match unwrap_expr(init) {
            Expr::Lit(Lit::Str(s)) => {
                self.facts.constants.insert(name.to_string(), str_value(s));
            }
            Expr::Tpl(tpl) => {
                if let Some(value) = self.static_template(tpl) {
                    self.facts.constants.insert(name.to_string(), value);
                }
            }
            Expr::Object(obj) => {
                for prop in &obj.props {
                    if let PropOrSpread::Prop(prop) = prop {
                        if let Prop::KeyValue(kv) = prop.as_ref() {
                            let key = format!("{}.{}", name, self.prop_name(&kv.key));
                            self.record_constant(&key, &kv.value, depth + 1);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Template literal whose expressions are all known constants
    fn static_template(&self, tpl: &Tpl) -> Option<String> {
        let mut out = String::new();
        for (i, quasi) in tpl.quasis.iter().enumerate() {
            out.push_str(quasi.raw.as_ref());
            if let Some(expr) = tpl.exprs.get(i) {
                let path = member_path(expr)?;
                out.push_str(self.facts.constants.get(&path)?);
            }
        }
        Some(out)
    }

    // ---- statements ----

    fn walk_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Fn(fn_decl) => {
                self.context.push(fn_decl.ident.sym.as_ref().to_string());
                self.walk_function(&fn_decl.function);
                self.context.pop();
            }
            Decl::Class(class_decl) => {
                self.context.push(class_decl.ident.sym.as_ref().to_string());
                self.walk_class(&class_decl.class);
                self.context.pop();
            }
            Decl::Var(var_decl) => {
                for declarator in &var_decl.decls {
                    let Some(init) = &declarator.init else {
                        continue;
                    };
                    let binding = match &declarator.name {
                        Pat::Ident(b) => Some(b.id.sym.as_ref().to_string()),
                        _ => None,
                    };
                    // object literals scope their members: `service.getAll`
                    let scoped = binding.is_some()
                        && (self.is_function_like(init)
                            || matches!(unwrap_expr(init), Expr::Object(_)));
                    if scoped {
                        if let Some(name) = &binding {
                            self.context.push(name.clone());
                        }
                    }
                    self.walk_expr_bound(init, binding);
                    if scoped {
                        self.context.pop();
                    }
                }
            }
            _ => {}
        }
    }

    fn walk_function(&mut self, function: &Function) {
        if let Some(body) = &function.body {
            self.walk_block(body);
        }
    }

    fn walk_class(&mut self, class: &Class) {
        for member in &class.body {
            match member {
                ClassMember::Method(method) => {
                    let name = self.prop_name(&method.key);
                    self.context.push(name);
                    self.walk_function(&method.function);
                    self.context.pop();
                }
                ClassMember::ClassProp(prop) => {
                    if let Some(value) = &prop.value {
                        self.walk_expr(value);
                    }
                }
                ClassMember::Constructor(ctor) => {
                    if let Some(body) = &ctor.body {
                        self.walk_block(body);
                    }
                }
                _ => {}
            }
        }
    }

    fn walk_block(&mut self, block: &BlockStmt) {
        for stmt in &block.stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr_stmt) => self.walk_expr(&expr_stmt.expr),
            Stmt::Return(ret) => {
                if let Some(arg) = &ret.arg {
                    self.walk_expr(arg);
                }
            }
            Stmt::Decl(decl) => self.walk_decl(decl),
            Stmt::Block(block) => self.walk_block(block),
            Stmt::If(if_stmt) => {
                self.walk_expr(&if_stmt.test);
                self.walk_stmt(&if_stmt.cons);
                if let Some(alt) = &if_stmt.alt {
                    self.walk_stmt(alt);
                }
            }
            Stmt::For(for_stmt) => {
                match &for_stmt.init {
                    Some(VarDeclOrExpr::VarDecl(var)) => {
                        for declarator in &var.decls {
                            if let Some(init) = &declarator.init {
                                self.walk_expr(init);
                            }
                        }
                    }
                    Some(VarDeclOrExpr::Expr(expr)) => self.walk_expr(expr),
                    None => {}
                }
                if let Some(test) = &for_stmt.test {
                    self.walk_expr(test);
                }
                if let Some(update) = &for_stmt.update {
                    self.walk_expr(update);
                }
                self.walk_stmt(&for_stmt.body);
            }
            Stmt::ForIn(for_in) => {
                self.walk_expr(&for_in.right);
                self.walk_stmt(&for_in.body);
            }
            Stmt::ForOf(for_of) => {
                self.walk_expr(&for_of.right);
                self.walk_stmt(&for_of.body);
            }
            Stmt::While(while_stmt) => {
                self.walk_expr(&while_stmt.test);
                self.walk_stmt(&while_stmt.body);
            }
            Stmt::DoWhile(do_while) => {
                self.walk_stmt(&do_while.body);
                self.walk_expr(&do_while.test);
            }
            Stmt::Switch(switch) => {
                self.walk_expr(&switch.discriminant);
                for case in &switch.cases {
                    if let Some(test) = &case.test {
                        self.walk_expr(test);
                    }
                    for stmt in &case.cons {
                        self.walk_stmt(stmt);
                    }
                }
            }
            Stmt::Try(try_stmt) => {
                self.walk_block(&try_stmt.block);
                if let Some(handler) = &try_stmt.handler {
                    self.walk_block(&handler.body);
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.walk_block(finalizer);
                }
            }
            Stmt::Labeled(labeled) => self.walk_stmt(&labeled.body),
            Stmt::Throw(throw) => self.walk_expr(&throw.arg),
            _ => {}
        }
    }

    // ---- expressions ----

    fn walk_expr(&mut self, expr: &Expr) {
        self.walk_expr_bound(expr, None);
    }

    /// Walks an expression whose value is assigned to `binding`
    fn walk_expr_bound(&mut self, expr: &Expr, binding: Option<String>) {
        match expr {
            Expr::Call(call) => self.walk_call(call, binding),
            Expr::New(new) => self.walk_new(new, binding),
            Expr::Await(a) => self.walk_expr_bound(&a.arg, binding),
            Expr::Paren(p) => self.walk_expr_bound(&p.expr, binding),
            Expr::TsAs(e) => self.walk_expr_bound(&e.expr, binding),
            Expr::TsNonNull(e) => self.walk_expr_bound(&e.expr, binding),
            Expr::TsSatisfies(e) => self.walk_expr_bound(&e.expr, binding),
            Expr::TsConstAssertion(e) => self.walk_expr_bound(&e.expr, binding),
            Expr::TsTypeAssertion(e) => self.walk_expr_bound(&e.expr, binding),
            Expr::Member(member) => {
                self.walk_expr(&member.obj);
                if let MemberProp::Computed(computed) = &member.prop {
                    self.walk_expr(&computed.expr);
                }
            }
            Expr::Bin(bin) => {
                self.walk_expr(&bin.left);
                self.walk_expr(&bin.right);
            }
            Expr::Unary(unary) => self.walk_expr(&unary.arg),
            Expr::Update(update) => self.walk_expr(&update.arg),
            Expr::Cond(cond) => {
                self.walk_expr(&cond.test);
                self.walk_expr(&cond.cons);
                self.walk_expr(&cond.alt);
            }
            Expr::Assign(assign) => self.walk_expr(&assign.right),
            Expr::Seq(seq) => seq.exprs.iter().for_each(|e| self.walk_expr(e)),
            Expr::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.walk_expr(&elem.expr);
                }
            }
            Expr::Object(obj) => {
                for prop in &obj.props {
                    match prop {
                        PropOrSpread::Spread(spread) => self.walk_expr(&spread.expr),
                        PropOrSpread::Prop(prop) => match prop.as_ref() {
                            Prop::KeyValue(kv) => {
                                let key = self.prop_name(&kv.key);
                                if self.is_function_like(&kv.value) {
                                    self.context.push(key.clone());
                                    self.walk_expr_bound(&kv.value, Some(key));
                                    self.context.pop();
                                } else {
                                    self.walk_expr_bound(&kv.value, Some(key));
                                }
                            }
                            Prop::Method(method) => {
                                self.context.push(self.prop_name(&method.key));
                                self.walk_function(&method.function);
                                self.context.pop();
                            }
                            Prop::Getter(getter) => {
                                if let Some(body) = &getter.body {
                                    self.walk_block(body);
                                }
                            }
                            Prop::Setter(setter) => {
                                if let Some(body) = &setter.body {
                                    self.walk_block(body);
                                }
                            }
                            Prop::Assign(assign) => self.walk_expr(&assign.value),
                            _ => {}
                        },
                    }
                }
            }
            Expr::Arrow(arrow) => match arrow.body.as_ref() {
                BlockStmtOrExpr::BlockStmt(block) => self.walk_block(block),
                BlockStmtOrExpr::Expr(body) => self.walk_expr(body),
            },
            Expr::Fn(f) => self.walk_function(&f.function),
            Expr::Class(c) => self.walk_class(&c.class),
            Expr::Tpl(tpl) => {
                if let Some(first) = tpl.quasis.first() {
                    self.record_url_literal(first.raw.as_ref());
                }
                tpl.exprs.iter().for_each(|e| self.walk_expr(e));
            }
            Expr::TaggedTpl(tagged) => {
                self.walk_expr(&tagged.tag);
                tagged.tpl.exprs.iter().for_each(|e| self.walk_expr(e));
            }
            Expr::Lit(Lit::Str(s)) => {
                let value = str_value(s);
                self.record_url_literal(&value);
            }
            Expr::JSXElement(element) => self.walk_jsx_element(element),
            Expr::JSXFragment(fragment) => self.walk_jsx_children(&fragment.children),
            Expr::OptChain(opt) => match opt.base.as_ref() {
                OptChainBase::Member(member) => self.walk_expr(&member.obj),
                OptChainBase::Call(call) => {
                    self.walk_expr(&call.callee);
                    let mut loop_scope = self.loop_scope_for(&call.callee, &call.args);
                    for (i, arg) in call.args.iter().enumerate() {
                        match (i, loop_scope.take()) {
                            (0, Some(scope)) => {
                                self.loops.push(scope);
                                self.walk_expr(&arg.expr);
                                self.loops.pop();
                            }
                            _ => self.walk_expr(&arg.expr),
                        }
                    }
                }
            },
            Expr::Yield(y) => {
                if let Some(arg) = &y.arg {
                    self.walk_expr(arg);
                }
            }
            _ => {}
        }
    }

    fn record_url_literal(&mut self, value: &str) {
        if value.starts_with("http://") || value.starts_with("https://") {
            self.facts.url_literals.push(value.to_string());
        }
    }

    fn walk_call(&mut self, call: &CallExpr, binding: Option<String>) {
        let recorded = match &call.callee {
            Callee::Import(_) => {
                self.record_dynamic_import(call);
                None
            }
            Callee::Expr(callee) => self
                .call_name(callee)
                .map(|name| self.record_call(name, callee, &call.args, call.span, binding, false)),
            Callee::Super(_) => None,
        };

        if let Callee::Expr(callee) = &call.callee {
            match callee.as_ref() {
                Expr::Ident(_) => {}
                Expr::Member(member) => self.walk_expr(&member.obj),
                other => self.walk_expr(other),
            }
        }

        let mut loop_scope = match &call.callee {
            Callee::Expr(callee) => self.loop_scope_for(callee, &call.args),
            _ => None,
        };
        if let Some(id) = recorded {
            self.call_stack.push(id);
        }
        for (i, arg) in call.args.iter().enumerate() {
            if i == 0 {
                if let Some(scope) = loop_scope.take() {
                    self.loops.push(scope);
                    self.walk_expr(&arg.expr);
                    self.loops.pop();
                    continue;
                }
            }
            self.walk_expr(&arg.expr);
        }
        if recorded.is_some() {
            self.call_stack.pop();
        }
    }

    fn walk_new(&mut self, new: &NewExpr, binding: Option<String>) {
        let empty = Vec::new();
        let args = new.args.as_ref().unwrap_or(&empty);
        let recorded = self
            .call_name(&new.callee)
            .map(|name| self.record_call(name, &new.callee, args, new.span, binding, true));
        if let Some(id) = recorded {
            self.call_stack.push(id);
        }
        args.iter().for_each(|a| self.walk_expr(&a.expr));
        if recorded.is_some() {
            self.call_stack.pop();
        }
    }

    fn record_dynamic_import(&mut self, call: &CallExpr) {
        let specifier = call.args.first().and_then(|arg| match unwrap_expr(&arg.expr) {
            Expr::Lit(Lit::Str(s)) => Some(str_value(s)),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
                tpl.quasis.first().map(|q| q.raw.as_ref().to_string())
            }
            _ => None,
        });
        if let Some(specifier) = specifier {
            self.facts.imports.push(Import {
                specifier,
                kind: ImportKind::Dynamic,
                bindings: Vec::new(),
                line: self.location(call.span.lo).line,
            });
        }
    }

    fn call_name(&self, callee: &Expr) -> Option<String> {
        match callee {
            Expr::Ident(ident) => Some(ident.sym.as_ref().to_string()),
            Expr::Member(_) => member_path(callee).or_else(|| {
                // chained call: `fetch(url).then` -> `then` on an anonymous base
                match callee {
                    Expr::Member(member) => match &member.prop {
                        MemberProp::Ident(prop) => Some(prop.sym.as_ref().to_string()),
                        _ => None,
                    },
                    _ => None,
                }
            }),
            Expr::Paren(p) => self.call_name(&p.expr),
            _ => None,
        }
    }

    fn record_call(
        &mut self,
        name: String,
        callee: &Expr,
        args: &[ExprOrSpread],
        span: Span,
        binding: Option<String>,
        is_new: bool,
    ) -> usize {
        let (base_object, property) = match callee {
            Expr::Member(member) => {
                let property = match &member.prop {
                    MemberProp::Ident(prop) => Some(prop.sym.as_ref().to_string()),
                    MemberProp::Computed(computed) => match computed.expr.as_ref() {
                        Expr::Lit(Lit::Str(s)) => Some(str_value(s)),
                        _ => None,
                    },
                    _ => None,
                };
                (root_ident(&member.obj), property)
            }
            _ => (None, None),
        };
        let id = self.facts.calls.len();
        let arguments = args.iter().map(|a| self.arg_value(&a.expr, 0)).collect();
        self.facts.calls.push(Call {
            id,
            parent: self.call_stack.last().copied(),
            name,
            base_object,
            property,
            arguments,
            location: self.location(span.lo),
            start: self.offset(span.lo),
            end: self.offset(span.hi),
            caller: (!self.context.is_empty()).then(|| self.context.join(".")),
            assigned_to: binding,
            is_new,
        });
        id
    }

    fn arg_value(&self, expr: &Expr, depth: usize) -> ArgValue {
        let expr = unwrap_expr(expr);
        if depth > MAX_ARG_DEPTH {
            return ArgValue::Other(self.text(expr.span()).to_string());
        }
        match expr {
            Expr::Lit(Lit::Str(s)) => ArgValue::Str(str_value(s)),
            Expr::Tpl(tpl) => ArgValue::Template {
                quasis: tpl.quasis.iter().map(|q| q.raw.as_ref().to_string()).collect(),
                exprs: tpl
                    .exprs
                    .iter()
                    .map(|e| self.text(e.span()).trim().to_string())
                    .collect(),
            },
            Expr::Ident(ident) => ArgValue::Ident(ident.sym.as_ref().to_string()),
            Expr::Member(_) => member_path(expr)
                .map(ArgValue::Member)
                .unwrap_or_else(|| ArgValue::Other(self.text(expr.span()).to_string())),
            Expr::Bin(bin) if bin.op == BinaryOp::Add => {
                let mut parts = Vec::new();
                self.collect_concat(expr, depth, &mut parts);
                ArgValue::Concat(parts)
            }
            Expr::Object(obj) => ArgValue::Object(
                obj.props
                    .iter()
                    .filter_map(|prop| match prop {
                        PropOrSpread::Prop(prop) => match prop.as_ref() {
                            Prop::KeyValue(kv) => Some((
                                self.prop_name(&kv.key),
                                self.arg_value(&kv.value, depth + 1),
                            )),
                            Prop::Shorthand(ident) => Some((
                                ident.sym.as_ref().to_string(),
                                ArgValue::Ident(ident.sym.as_ref().to_string()),
                            )),
                            Prop::Method(method) => Some((
                                self.prop_name(&method.key),
                                ArgValue::Function {
                                    params: self.function_params(&method.function),
                                    returns: method
                                        .function
                                        .body
                                        .as_ref()
                                        .and_then(|b| self.first_return(b, depth)),
                                },
                            )),
                            _ => None,
                        },
                        PropOrSpread::Spread(_) => None,
                    })
                    .collect(),
            ),
            Expr::Array(array) => ArgValue::Array(
                array
                    .elems
                    .iter()
                    .flatten()
                    .map(|e| self.arg_value(&e.expr, depth + 1))
                    .collect(),
            ),
            Expr::Call(call) => ArgValue::Call {
                callee: match &call.callee {
                    Callee::Expr(callee) => self
                        .call_name(callee)
                        .unwrap_or_else(|| self.text(callee.span()).to_string()),
                    Callee::Import(_) => "import".to_string(),
                    Callee::Super(_) => "super".to_string(),
                },
                args: call
                    .args
                    .iter()
                    .map(|a| self.arg_value(&a.expr, depth + 1))
                    .collect(),
            },
            Expr::Arrow(arrow) => ArgValue::Function {
                params: arrow.params.iter().map(|p| self.param_name(p)).collect(),
                returns: match arrow.body.as_ref() {
                    BlockStmtOrExpr::Expr(body) => Some(Box::new(self.arg_value(body, depth + 1))),
                    BlockStmtOrExpr::BlockStmt(block) => self.first_return(block, depth),
                },
            },
            Expr::Fn(f) => ArgValue::Function {
                params: self.function_params(&f.function),
                returns: f
                    .function
                    .body
                    .as_ref()
                    .and_then(|b| self.first_return(b, depth)),
            },
            other => ArgValue::Other(self.text(other.span()).to_string()),
        }
    }

    fn collect_concat(&self, expr: &Expr, depth: usize, out: &mut Vec<ArgValue>) {
        match unwrap_expr(expr) {
            Expr::Bin(bin) if bin.op == BinaryOp::Add => {
                self.collect_concat(&bin.left, depth, out);
                self.collect_concat(&bin.right, depth, out);
            }
            other => out.push(self.arg_value(other, depth + 1)),
        }
    }

    fn first_return(&self, block: &BlockStmt, depth: usize) -> Option<Box<ArgValue>> {
        block.stmts.iter().find_map(|stmt| match stmt {
            Stmt::Return(ret) => ret
                .arg
                .as_ref()
                .map(|arg| Box::new(self.arg_value(arg, depth + 1))),
            _ => None,
        })
    }

    // ---- iterations ----

    /// Loop scope for `collection.map(cb)` / `collection.flatMap(cb)`
    fn loop_scope_for(&mut self, callee: &Expr, args: &[ExprOrSpread]) -> Option<LoopScope> {
        // `items.map(cb)` or `items?.map(cb)`
        let member = match callee {
            Expr::Member(member) => member,
            Expr::OptChain(opt) => match opt.base.as_ref() {
                OptChainBase::Member(member) => member,
                OptChainBase::Call(_) => return None,
            },
            _ => return None,
        };
        match &member.prop {
            MemberProp::Ident(prop) if matches!(prop.sym.as_ref(), "map" | "flatMap") => {}
            _ => return None,
        }
        let callback = unwrap_expr(&args.first()?.expr);
        let (params, header): (Vec<&Pat>, Span) = match callback {
            Expr::Arrow(arrow) => (
                arrow.params.iter().collect(),
                Span::new(arrow.span.lo, arrow.body.span().lo),
            ),
            Expr::Fn(f) => (
                f.function.params.iter().map(|p| &p.pat).collect(),
                Span::new(
                    f.function.span.lo,
                    f.function
                        .body
                        .as_ref()
                        .map(|b| b.span.lo)
                        .unwrap_or(f.function.span.hi),
                ),
            ),
            _ => return None,
        };

        let depth = self.loops.len();
        let existing_index = params.get(1).and_then(|p| pat_name(p));
        let index_name = existing_index.clone().unwrap_or_else(|| {
            if self.loops.iter().any(|l| l.ctx.index_name == "index") {
                format!("index{}", depth + 1)
            } else {
                "index".to_string()
            }
        });

        let index_edits = match (existing_index.is_some(), params.as_slice()) {
            (true, _) => Vec::new(),
            (false, [single]) => {
                let start = self.offset(single.span().lo);
                let end = self.offset(pat_end(single));
                let before = self
                    .source
                    .get(self.offset(header.lo)..start)
                    .unwrap_or("");
                if before.contains('(') {
                    vec![TextEdit::insert(end, format!(", {}", index_name))]
                } else {
                    vec![
                        TextEdit::insert(start, "("),
                        TextEdit::insert(end, format!(", {})", index_name)),
                    ]
                }
            }
            (false, []) => {
                let header_text = self.text(header);
                match header_text.find("()") {
                    Some(pos) => vec![TextEdit::insert(
                        self.offset(header.lo) + pos + 1,
                        format!("_item, {}", index_name),
                    )],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        };

        let id = self.next_loop_id;
        self.next_loop_id += 1;
        Some(LoopScope {
            ctx: LoopContext {
                id,
                collection: self.text(member.obj.span()).trim().to_string(),
                item: params.first().map(|p| self.param_name(p)),
                has_index: existing_index.is_some(),
                index_name,
                key: None,
                index_edits,
            },
            root_seen: false,
        })
    }

    // ---- JSX ----

    fn walk_jsx_element(&mut self, element: &JSXElement) {
        let opening = &element.opening;
        let tag = jsx_name(&opening.name);
        let attributes: Vec<JsxAttribute> = opening
            .attrs
            .iter()
            .filter_map(|attr| match attr {
                JSXAttrOrSpread::JSXAttr(attr) => Some(self.jsx_attribute(attr)),
                JSXAttrOrSpread::SpreadElement(_) => None,
            })
            .collect();

        let mut is_loop_root = false;
        if let Some(scope) = self.loops.last_mut() {
            if !scope.root_seen {
                scope.root_seen = true;
                is_loop_root = true;
                scope.ctx.key = attributes
                    .iter()
                    .find(|a| a.name == "key")
                    .and_then(|a| match &a.value {
                        AttrValue::Expr(expr) if !expr.is_empty() => Some(expr.clone()),
                        _ => None,
                    });
            }
        }

        let (text, dynamic_children) = self.jsx_child_text(&element.children);
        let entering_svg = tag == "svg";
        if let Some(owner) = self.context.first() {
            self.jsx_owners.insert(owner.clone());
        }
        let info = JsxElementInfo {
            id: self.facts.jsx.len(),
            insert_at: self.tag_end(opening),
            location: self.location(opening.span.lo),
            component: self.context.iter().rev().find(|c| is_pascal(c)).cloned(),
            loops: self.loops.iter().map(|l| l.ctx.clone()).collect(),
            inside_svg: self.svg_depth > 0 || entering_svg,
            is_loop_root,
            tag,
            attributes,
            text,
            dynamic_children,
        };
        self.facts.jsx.push(info);

        for attr in &opening.attrs {
            match attr {
                JSXAttrOrSpread::JSXAttr(attr) => match &attr.value {
                    Some(JSXAttrValue::JSXExprContainer(container)) => {
                        if let JSXExpr::Expr(expr) = &container.expr {
                            self.walk_expr(expr);
                        }
                    }
                    Some(JSXAttrValue::JSXElement(inner)) => self.walk_jsx_element(inner),
                    _ => {}
                },
                JSXAttrOrSpread::SpreadElement(spread) => self.walk_expr(&spread.expr),
            }
        }

        if entering_svg {
            self.svg_depth += 1;
        }
        self.walk_jsx_children(&element.children);
        if entering_svg {
            self.svg_depth -= 1;
        }
    }

    fn walk_jsx_children(&mut self, children: &[JSXElementChild]) {
        for child in children {
            match child {
                JSXElementChild::JSXElement(element) => self.walk_jsx_element(element),
                JSXElementChild::JSXFragment(fragment) => self.walk_jsx_children(&fragment.children),
                JSXElementChild::JSXExprContainer(container) => {
                    if let JSXExpr::Expr(expr) = &container.expr {
                        self.walk_expr(expr);
                    }
                }
                JSXElementChild::JSXSpreadChild(spread) => self.walk_expr(&spread.expr),
                JSXElementChild::JSXText(_) => {}
            }
        }
    }

    fn jsx_child_text(&self, children: &[JSXElementChild]) -> (String, Vec<String>) {
        let mut words = Vec::new();
        let mut dynamic = Vec::new();
        for child in children {
            match child {
                JSXElementChild::JSXText(text) => {
                    words.extend(self.text(text.span).split_whitespace().map(str::to_string));
                }
                JSXElementChild::JSXExprContainer(container) => {
                    if let JSXExpr::Expr(expr) = &container.expr {
                        if is_text_expr(expr) {
                            dynamic.push(self.text(expr.span()).trim().to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        (words.join(" "), dynamic)
    }

    fn jsx_attribute(&self, attr: &JSXAttr) -> JsxAttribute {
        let name = match &attr.name {
            JSXAttrName::Ident(ident) => ident.sym.as_ref().to_string(),
            JSXAttrName::JSXNamespacedName(ns) => {
                format!("{}:{}", ns.ns.sym.as_ref(), ns.name.sym.as_ref())
            }
        };
        let full = self.text(attr.span);
        let rest = full.get(name.len()..).unwrap_or("").trim_start();
        let value = match rest.strip_prefix('=') {
            None => AttrValue::Flag,
            Some(raw) => {
                let raw = raw.trim();
                let quoted = raw.len() >= 2
                    && ((raw.starts_with('"') && raw.ends_with('"'))
                        || (raw.starts_with('\'') && raw.ends_with('\'')));
                if quoted {
                    AttrValue::Str(raw[1..raw.len() - 1].to_string())
                } else if raw.len() >= 2 && raw.starts_with('{') && raw.ends_with('}') {
                    let inner = raw[1..raw.len() - 1].trim();
                    // `{"literal"}` is still a static value
                    let inner_quoted = inner.len() >= 2
                        && ((inner.starts_with('"') && inner.ends_with('"'))
                            || (inner.starts_with('\'') && inner.ends_with('\'')));
                    if inner_quoted && !inner[1..inner.len() - 1].contains(['"', '\'']) {
                        AttrValue::Str(inner[1..inner.len() - 1].to_string())
                    } else {
                        AttrValue::Expr(inner.to_string())
                    }
                } else {
                    AttrValue::Expr(raw.to_string())
                }
            }
        };
        JsxAttribute {
            name,
            value,
            start: self.offset(attr.span.lo),
            end: self.offset(attr.span.hi),
        }
    }

    /// Offset right after the tag name (and type arguments)
    fn tag_end(&self, opening: &JSXOpeningElement) -> usize {
        if let Some(type_args) = &opening.type_args {
            return self.offset(type_args.span.hi);
        }
        let start = self.offset(opening.span.lo) + 1;
        let rest = self.source.get(start..).unwrap_or("");
        let leading_ws = rest.len() - rest.trim_start().len();
        let name_len: usize = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | ':' | '-'))
            .map(char::len_utf8)
            .sum();
        start + leading_ws + name_len
    }
}
