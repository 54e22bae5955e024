//! Best-effort symbol resolution from a single parsed file.
//!
//! [`SymbolIndex`] implements [`SymbolTable`] without a compiler. It knows
//! about `use` declarations, items defined in the file, function signatures,
//! struct fields and `let` bindings whose type is annotated or can be read off
//! the initializer. Anything beyond that stays unresolved.

use crate::context::FileContext;
use crate::linter::macro_args;
use crate::symbols::{strip_pointers, Site, Symbol, SymbolTable};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{Expr, FnArg, Item, Pat, ReturnType, Type};
use tracing::debug;

/// Resolved symbols and expression types for one file.
#[derive(Debug, Default)]
pub struct FileSymbols {
    symbols: HashMap<Site, Symbol>,
    types: HashMap<Site, String>,
}

/// A [`SymbolTable`] built from parsed sources.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    files: HashMap<PathBuf, FileSymbols>,
}

impl SymbolIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index covering a single file.
    #[must_use]
    pub fn for_file(ctx: &FileContext, ast: &syn::File) -> Self {
        let mut index = Self::new();
        index.index_file(ctx, ast);
        index
    }

    /// Resolves `ast` and adds the result under `ctx.path`.
    pub fn index_file(&mut self, ctx: &FileContext, ast: &syn::File) {
        let root = ctx.module();
        let mut decls = Declarations::default();
        decls.collect(&root, &ast.items);

        let mut resolver = Resolver {
            decls: &decls,
            modules: vec![root],
            self_types: Vec::new(),
            locals: Vec::new(),
            out: FileSymbols::default(),
        };
        resolver.visit_file(ast);

        debug!(
            file = %ctx.relative_path.display(),
            symbols = resolver.out.symbols.len(),
            types = resolver.out.types.len(),
            "Indexed symbols"
        );
        self.files.insert(ctx.path.to_path_buf(), resolver.out);
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no file has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SymbolTable for SymbolIndex {
    fn symbol(&self, file: &Path, site: Site) -> Option<&Symbol> {
        self.files.get(file)?.symbols.get(&site)
    }

    fn type_of(&self, file: &Path, site: Site) -> Option<&str> {
        self.files.get(file)?.types.get(&site).map(String::as_str)
    }
}

// ────────────────────────────────────────────
// Declarations
// ────────────────────────────────────────────

/// Names visible at module level.
#[derive(Debug, Default)]
struct ModuleScope {
    /// Local name to imported path.
    imports: HashMap<String, String>,
    /// Names of items defined in the module.
    items: HashMap<String, ItemKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Module,
    Type,
    Value,
}

#[derive(Debug, Default)]
struct Declarations {
    modules: HashMap<String, ModuleScope>,
    /// `(struct path, field)` to field type.
    fields: HashMap<(String, String), String>,
    /// `(module or type path, fn name)` to return type.
    returns: HashMap<(String, String), String>,
}

impl Declarations {
    fn collect(&mut self, module: &str, items: &[Item]) {
        let mut scope = ModuleScope::default();
        for item in items {
            match item {
                Item::Use(u) => {
                    for import in expand_use_tree(&u.tree, "") {
                        scope.imports.insert(import.name, import.path);
                    }
                }
                Item::Mod(m) => {
                    scope.items.insert(m.ident.to_string(), ItemKind::Module);
                }
                Item::Struct(s) => {
                    scope.items.insert(s.ident.to_string(), ItemKind::Type);
                }
                Item::Enum(e) => {
                    scope.items.insert(e.ident.to_string(), ItemKind::Type);
                }
                Item::Union(u) => {
                    scope.items.insert(u.ident.to_string(), ItemKind::Type);
                }
                Item::Trait(t) => {
                    scope.items.insert(t.ident.to_string(), ItemKind::Type);
                }
                Item::Type(t) => {
                    scope.items.insert(t.ident.to_string(), ItemKind::Type);
                }
                Item::Fn(f) => {
                    scope.items.insert(f.sig.ident.to_string(), ItemKind::Value);
                }
                Item::Const(c) => {
                    scope.items.insert(c.ident.to_string(), ItemKind::Value);
                }
                Item::Static(s) => {
                    scope.items.insert(s.ident.to_string(), ItemKind::Value);
                }
                _ => {}
            }
        }

        // Imports may go through local modules, `self` or `super`.
        let imports = std::mem::take(&mut scope.imports);
        scope.imports = imports
            .into_iter()
            .map(|(name, path)| {
                let segments: Vec<String> = path.split("::").map(String::from).collect();
                let absolute = match segments.first().map(String::as_str) {
                    Some("self" | "super" | "crate") => absolute_path(&segments, module),
                    Some(head) if scope.items.get(head) == Some(&ItemKind::Module) => {
                        Some(format!("{module}::{path}"))
                    }
                    _ => None,
                };
                (name, absolute.unwrap_or(path))
            })
            .collect();
        self.modules.insert(module.to_string(), scope);

        for item in items {
            match item {
                Item::Fn(f) => {
                    if let Some(ty) = self.return_type(&f.sig.output, module, None) {
                        self.returns
                            .insert((module.to_string(), f.sig.ident.to_string()), ty);
                    }
                }
                Item::Struct(s) => {
                    let owner = format!("{module}::{}", s.ident);
                    for field in &s.fields {
                        let (Some(name), Some(ty)) =
                            (&field.ident, self.resolve_type(&field.ty, module, None))
                        else {
                            continue;
                        };
                        self.fields.insert((owner.clone(), name.to_string()), ty);
                    }
                }
                Item::Impl(imp) => {
                    let Some(self_ty) = self.resolve_type(&imp.self_ty, module, None) else {
                        continue;
                    };
                    let owner = owner_key(&self_ty).to_string();
                    for impl_item in &imp.items {
                        let syn::ImplItem::Fn(f) = impl_item else {
                            continue;
                        };
                        if let Some(ty) = self.return_type(&f.sig.output, module, Some(&self_ty)) {
                            self.returns
                                .insert((owner.clone(), f.sig.ident.to_string()), ty);
                        }
                    }
                }
                Item::Mod(m) => {
                    if let Some((_, content)) = &m.content {
                        self.collect(&format!("{module}::{}", m.ident), content);
                    }
                }
                _ => {}
            }
        }
    }

    fn return_type(
        &self,
        output: &ReturnType,
        module: &str,
        self_ty: Option<&str>,
    ) -> Option<String> {
        match output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => self.resolve_type(ty, module, self_ty),
        }
    }

    /// Resolves the leading segments of `segments` to an absolute path.
    fn resolve_path(&self, segments: &[String], module: &str) -> Option<String> {
        let head = segments.first()?;
        if matches!(head.as_str(), "crate" | "self" | "super") {
            return absolute_path(segments, module);
        }
        let scope = self.modules.get(module)?;
        let base = if let Some(import) = scope.imports.get(head) {
            import.clone()
        } else if scope.items.contains_key(head) {
            format!("{module}::{head}")
        } else {
            return None;
        };
        Some(join(&base, &segments[1..]))
    }

    fn item_kind(&self, module: &str, name: &str) -> Option<ItemKind> {
        self.modules.get(module)?.items.get(name).copied()
    }

    /// Renders a type with its paths made absolute where possible.
    fn resolve_type(&self, ty: &Type, module: &str, self_ty: Option<&str>) -> Option<String> {
        match ty {
            Type::Reference(r) => {
                let inner = self.resolve_type(&r.elem, module, self_ty)?;
                let mutability = if r.mutability.is_some() { "mut " } else { "" };
                Some(format!("&{mutability}{inner}"))
            }
            Type::Ptr(p) => {
                let inner = self.resolve_type(&p.elem, module, self_ty)?;
                let kind = if p.mutability.is_some() { "mut" } else { "const" };
                Some(format!("*{kind} {inner}"))
            }
            Type::Paren(p) => self.resolve_type(&p.elem, module, self_ty),
            Type::Group(g) => self.resolve_type(&g.elem, module, self_ty),
            Type::Path(p) if p.qself.is_none() => {
                let segments: Vec<String> =
                    p.path.segments.iter().map(|s| s.ident.to_string()).collect();
                let generics = p
                    .path
                    .segments
                    .last()
                    .map(|s| render(&s.arguments))
                    .unwrap_or_default();

                let base = match (segments.first().map(String::as_str), self_ty) {
                    (Some("Self"), Some(owner)) => join(owner, &segments[1..]),
                    _ => self
                        .resolve_path(&segments, module)
                        .unwrap_or_else(|| segments.join("::")),
                };
                Some(format!("{base}{generics}"))
            }
            other => Some(render(other)),
        }
    }
}

/// A name brought into scope by a `use` item.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Import {
    /// Name visible in the module (after renaming).
    name: String,
    /// Full path as written.
    path: String,
}

/// Recursively expands a [`syn::UseTree`] into one [`Import`] per visible
/// name. Glob imports bring no name into scope and are skipped.
fn expand_use_tree(tree: &syn::UseTree, prefix: &str) -> Vec<Import> {
    let qualify = |ident: &syn::Ident| {
        if prefix.is_empty() {
            ident.to_string()
        } else {
            format!("{prefix}::{ident}")
        }
    };

    match tree {
        syn::UseTree::Path(p) => expand_use_tree(&p.tree, &qualify(&p.ident)),
        syn::UseTree::Name(n) if n.ident == "self" => prefix
            .rsplit("::")
            .next()
            .filter(|name| !name.is_empty())
            .map(|name| Import {
                name: name.to_string(),
                path: prefix.to_string(),
            })
            .into_iter()
            .collect(),
        syn::UseTree::Name(n) => vec![Import {
            name: n.ident.to_string(),
            path: qualify(&n.ident),
        }],
        syn::UseTree::Rename(r) if r.rename == "_" => Vec::new(),
        syn::UseTree::Rename(r) if r.ident == "self" => vec![Import {
            name: r.rename.to_string(),
            path: prefix.to_string(),
        }],
        syn::UseTree::Rename(r) => vec![Import {
            name: r.rename.to_string(),
            path: qualify(&r.ident),
        }],
        syn::UseTree::Glob(_) => Vec::new(),
        syn::UseTree::Group(g) => g
            .items
            .iter()
            .flat_map(|item| expand_use_tree(item, prefix))
            .collect(),
    }
}

/// Makes a `crate`/`self`/`super` path absolute relative to `module`.
fn absolute_path(segments: &[String], module: &str) -> Option<String> {
    let mut base: Vec<&str> = module.split("::").collect();
    let mut rest = segments;
    match rest.first().map(String::as_str) {
        Some("crate") => {
            base = vec!["crate"];
            rest = &rest[1..];
        }
        Some("self") => rest = &rest[1..],
        _ => {}
    }
    while rest.first().map(String::as_str) == Some("super") {
        if base.len() <= 1 {
            return None;
        }
        base.pop();
        rest = &rest[1..];
    }
    Some(join(&base.join("::"), rest))
}

fn join(base: &str, rest: &[String]) -> String {
    std::iter::once(base)
        .chain(rest.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("::")
}

/// Renders tokens without the spacing `quote` inserts, keeping a single
/// space only between two word characters (`&'a mut T`, `dyn Trait`).
fn render(tokens: &impl quote::ToTokens) -> String {
    let raw = tokens.to_token_stream().to_string();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            let prev = out.chars().last();
            let next = chars.peek().copied();
            if prev.is_some_and(is_word) && next.is_some_and(is_word) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

// ────────────────────────────────────────────
// Use sites
// ────────────────────────────────────────────

struct Resolver<'d> {
    decls: &'d Declarations,
    modules: Vec<String>,
    self_types: Vec<Option<String>>,
    locals: Vec<HashMap<String, Option<String>>>,
    out: FileSymbols,
}

impl Resolver<'_> {
    fn module(&self) -> &str {
        self.modules.last().map_or("crate", String::as_str)
    }

    fn self_type(&self) -> Option<&str> {
        self.self_types.last().and_then(Option::as_deref)
    }

    fn resolve_type(&self, ty: &Type) -> Option<String> {
        self.decls.resolve_type(ty, self.module(), self.self_type())
    }

    fn local(&self, name: &str) -> Option<&Option<String>> {
        self.locals.iter().rev().find_map(|scope| scope.get(name))
    }

    fn with_scope(&mut self, f: impl FnOnce(&mut Self)) {
        self.locals.push(HashMap::new());
        f(self);
        self.locals.pop();
    }

    fn bind(&mut self, name: String, ty: Option<String>) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name, ty);
        }
    }

    fn bind_pat(&mut self, pat: &Pat, ty: Option<String>) {
        match pat {
            Pat::Ident(p) => {
                self.bind(p.ident.to_string(), ty);
                if let Some((_, sub)) = &p.subpat {
                    self.bind_pat(sub, None);
                }
            }
            Pat::Type(p) => {
                let ty = self.resolve_type(&p.ty);
                self.bind_pat(&p.pat, ty);
            }
            Pat::Reference(p) => self.bind_pat(&p.pat, None),
            Pat::Paren(p) => self.bind_pat(&p.pat, ty),
            Pat::Tuple(p) => p.elems.iter().for_each(|e| self.bind_pat(e, None)),
            Pat::TupleStruct(p) => p.elems.iter().for_each(|e| self.bind_pat(e, None)),
            Pat::Slice(p) => p.elems.iter().for_each(|e| self.bind_pat(e, None)),
            Pat::Struct(p) => p.fields.iter().for_each(|f| self.bind_pat(&f.pat, None)),
            Pat::Or(p) => {
                if let Some(first) = p.cases.first() {
                    self.bind_pat(first, None);
                }
            }
            _ => {}
        }
    }

    fn bind_inputs<'a>(&mut self, inputs: impl IntoIterator<Item = &'a FnArg>) {
        for input in inputs {
            match input {
                FnArg::Receiver(r) => {
                    let ty = self.resolve_type(&r.ty);
                    self.bind("self".to_string(), ty);
                }
                FnArg::Typed(p) => {
                    let ty = self.resolve_type(&p.ty);
                    self.bind_pat(&p.pat, ty);
                }
            }
        }
    }

    /// Records what the segments of `path` refer to.
    fn record_path(&mut self, path: &syn::Path) {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let Some(first) = path.segments.first() else {
            return;
        };
        let name = &segments[0];
        let site = Site::of(first.ident.span());

        let symbol = if segments.len() == 1 && path.leading_colon.is_none() {
            self.single_symbol(name)
        } else if path.leading_colon.is_some() {
            Some(Symbol::module(name.clone(), name.clone()))
        } else {
            self.head_symbol(name)
        };
        if let Some(symbol) = symbol {
            self.out.symbols.insert(site, symbol);
        }
    }

    fn single_symbol(&self, name: &str) -> Option<Symbol> {
        if let Some(ty) = self.local(name) {
            return Some(Symbol::variable(name, ty.clone()));
        }
        let path = self.decls.resolve_path(&[name.to_string()], self.module())?;
        let (package, item) = path.rsplit_once("::")?;
        Some(Symbol::item(item, package))
    }

    fn head_symbol(&self, name: &str) -> Option<Symbol> {
        if name == "Self" {
            return self.self_type().map(|owner| Symbol::module(name, owner));
        }
        let path = self.decls.resolve_path(&[name.to_string()], self.module())?;
        if self.decls.item_kind(self.module(), name) == Some(ItemKind::Value) {
            return None;
        }
        Some(Symbol::module(name, path))
    }

    /// Infers the static type of an expression, where that is cheap.
    fn infer(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Path(p) if p.qself.is_none() => {
                let ident = p.path.get_ident()?;
                self.local(&ident.to_string())?.clone()
            }
            Expr::Reference(r) => {
                let inner = self.infer(&r.expr)?;
                let mutability = if r.mutability.is_some() { "mut " } else { "" };
                Some(format!("&{mutability}{inner}"))
            }
            Expr::Paren(p) => self.infer(&p.expr),
            Expr::Group(g) => self.infer(&g.expr),
            Expr::Cast(c) => self.resolve_type(&c.ty),
            Expr::Struct(s) if s.qself.is_none() => self.type_of_path(&s.path),
            Expr::Call(call) => {
                let Expr::Path(func) = &*call.func else {
                    return None;
                };
                let segments: Vec<String> =
                    func.path.segments.iter().map(|s| s.ident.to_string()).collect();
                let (name, owner) = segments.split_last()?;
                if owner.is_empty() {
                    return self
                        .decls
                        .returns
                        .get(&(self.module().to_string(), name.clone()))
                        .cloned();
                }
                let owner = self.owner_path(owner)?;
                self.decls
                    .returns
                    .get(&(owner.clone(), name.clone()))
                    .cloned()
                    .or_else(|| (name == "new" || name == "default").then_some(owner))
            }
            Expr::MethodCall(m) => {
                let receiver = self.infer(&m.receiver)?;
                self.decls
                    .returns
                    .get(&(owner_key(&receiver).to_string(), m.method.to_string()))
                    .cloned()
            }
            Expr::Field(f) => {
                let syn::Member::Named(field) = &f.member else {
                    return None;
                };
                let base = self.infer(&f.base)?;
                self.decls
                    .fields
                    .get(&(owner_key(&base).to_string(), field.to_string()))
                    .cloned()
            }
            _ => None,
        }
    }

    fn owner_path(&self, segments: &[String]) -> Option<String> {
        if segments.first().map(String::as_str) == Some("Self") {
            return self.self_type().map(|owner| join(owner, &segments[1..]));
        }
        self.decls
            .resolve_path(segments, self.module())
            .or_else(|| Some(segments.join("::")))
    }

    fn type_of_path(&self, path: &syn::Path) -> Option<String> {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        self.owner_path(&segments)
    }

    /// Macro arguments are parsed on the fly, so they do not live as long
    /// as the file's syntax tree.
    fn walk_macro_args(&mut self, mac: &syn::Macro) {
        if let Some(args) = macro_args(mac) {
            for arg in &args {
                self.visit_expr(arg);
            }
        }
    }

    fn record_type(&mut self, base: &Expr) {
        if matches!(base, Expr::Path(_)) {
            return;
        }
        if let Some(ty) = self.infer(base) {
            self.out.types.insert(Site::of(base.span()), ty);
        }
    }
}

/// Key under which fields and methods of a type are stored: the type path
/// without references or generic arguments.
fn owner_key(ty: &str) -> &str {
    let ty = strip_pointers(ty);
    ty.find('<').map_or(ty, |i| &ty[..i])
}

impl<'ast> Visit<'ast> for Resolver<'_> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if node.content.is_none() {
            return;
        }
        let path = format!("{}::{}", self.module(), node.ident);
        self.modules.push(path);
        let locals = std::mem::take(&mut self.locals);
        visit::visit_item_mod(self, node);
        self.locals = locals;
        self.modules.pop();
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let owner = self.resolve_type(&node.self_ty);
        self.self_types.push(owner);
        visit::visit_item_impl(self, node);
        self.self_types.pop();
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.with_scope(|this| {
            this.bind_inputs(&node.sig.inputs);
            visit::visit_item_fn(this, node);
        });
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.with_scope(|this| {
            this.bind_inputs(&node.sig.inputs);
            visit::visit_impl_item_fn(this, node);
        });
    }

    fn visit_block(&mut self, node: &'ast syn::Block) {
        self.with_scope(|this| visit::visit_block(this, node));
    }

    fn visit_local(&mut self, node: &'ast syn::Local) {
        let mut inferred = None;
        if let Some(init) = &node.init {
            self.visit_expr(&init.expr);
            if let Some((_, diverge)) = &init.diverge {
                self.visit_expr(diverge);
            }
            inferred = self.infer(&init.expr);
        }
        self.bind_pat(&node.pat, inferred);
    }

    fn visit_expr_closure(&mut self, node: &'ast syn::ExprClosure) {
        self.with_scope(|this| {
            for input in &node.inputs {
                this.bind_pat(input, None);
            }
            this.visit_expr(&node.body);
        });
    }

    fn visit_expr_for_loop(&mut self, node: &'ast syn::ExprForLoop) {
        self.visit_expr(&node.expr);
        self.with_scope(|this| {
            this.bind_pat(&node.pat, None);
            this.visit_block(&node.body);
        });
    }

    fn visit_expr_if(&mut self, node: &'ast syn::ExprIf) {
        if let Expr::Let(cond) = &*node.cond {
            self.visit_expr(&cond.expr);
            self.with_scope(|this| {
                this.bind_pat(&cond.pat, None);
                this.visit_block(&node.then_branch);
            });
        } else {
            self.visit_expr(&node.cond);
            self.visit_block(&node.then_branch);
        }
        if let Some((_, else_branch)) = &node.else_branch {
            self.visit_expr(else_branch);
        }
    }

    fn visit_expr_while(&mut self, node: &'ast syn::ExprWhile) {
        if let Expr::Let(cond) = &*node.cond {
            self.visit_expr(&cond.expr);
            self.with_scope(|this| {
                this.bind_pat(&cond.pat, None);
                this.visit_block(&node.body);
            });
        } else {
            visit::visit_expr_while(self, node);
        }
    }

    fn visit_arm(&mut self, node: &'ast syn::Arm) {
        self.with_scope(|this| {
            this.visit_pat(&node.pat);
            this.bind_pat(&node.pat, None);
            if let Some((_, guard)) = &node.guard {
                this.visit_expr(guard);
            }
            this.visit_expr(&node.body);
        });
    }

    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        if node.qself.is_none() {
            self.record_path(&node.path);
        }
        visit::visit_expr_path(self, node);
    }

    fn visit_expr_struct(&mut self, node: &'ast syn::ExprStruct) {
        if node.qself.is_none() {
            self.record_path(&node.path);
        }
        visit::visit_expr_struct(self, node);
    }

    fn visit_expr_field(&mut self, node: &'ast syn::ExprField) {
        self.record_type(&node.base);
        visit::visit_expr_field(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        self.record_type(&node.receiver);
        visit::visit_expr_method_call(self, node);
    }

    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        self.record_path(&node.path);
        self.walk_macro_args(node);
    }
}
