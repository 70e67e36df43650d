//! # Declaration Scanner
//!
//! Walks a crate's module tree from its root file, the way rustc would find
//! it (`mod x;` to `x.rs` or `x/mod.rs`, `#[path]`, inline modules), and
//! collects three things:
//!
//! - **Serializer candidates**: reachable module-level `pub fn`s whose
//!   signature has a writer or reader shape.
//! - **RPC candidates**: every fn carrying a marker, wherever it is declared.
//!   Misplaced ones are kept so the validator can report them.
//! - **Type declarations**: local structs, enums, unions and aliases, with
//!   whether generated code at the crate root could name them.
//!
//! Names in signatures are resolved through each module's `use` items and
//! local declarations. Glob imports are not followed; a name found nowhere is
//! kept exactly as written.
//!
//! Items under `#[cfg(test)]` are skipped.

use std::collections::HashMap;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use quote::ToTokens;
use syn::Attribute;
use syn::Expr;
use syn::FnArg;
use syn::Ident;
use syn::ImplItem;
use syn::Item;
use syn::Lit;
use syn::Meta;
use syn::Pat;
use syn::ReturnType;
use syn::Token;
use syn::TraitItem;
use syn::UnOp;
use syn::UseTree;
use syn::spanned::Spanned;
use syn::parse::ParseStream;

use crate::Error;
use crate::Result;
use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCode;
use crate::diagnostic::Location;
use crate::model::CallKind;
use crate::model::DefaultValue;
use crate::model::RustType;
use crate::model::SendMode;
use crate::model::Visibility;
use crate::registry::SerializerCandidate;
use crate::registry::SerializerShape;

const DEFAULT_VALUE: &str = "default_value";

// ============================================================================
//  SOURCES
// ============================================================================

/// Where the scanner reads module files from.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> io::Result<String>;
    fn exists(&self, path: &Path) -> bool;
}

/// Reads from the file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Serves sources from memory, keyed by path.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

// ============================================================================
//  OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub path: Vec<String>,
    pub generic: bool,
    /// Nameable from the crate root.
    pub reachable: bool,
    pub location: Location,
}

/// Local type declarations by absolute path.
#[derive(Debug, Default, Clone)]
pub struct TypeIndex {
    decls: HashMap<Vec<String>, TypeDecl>,
}

impl TypeIndex {
    pub fn get(&self, path: &[String]) -> Option<&TypeDecl> {
        self.decls.get(path)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    fn insert(&mut self, decl: TypeDecl) {
        self.decls.insert(decl.path.clone(), decl);
    }
}

/// Where a marked fn was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// `impl Type { .. }`
    Inherent { self_ty: RustType, generic: bool },
    /// `impl Trait for Type { .. }`
    TraitImpl { self_ty: RustType, trait_name: String },
    /// `trait Trait { .. }`
    Trait { name: String },
    /// A free fn in a module.
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamCandidate {
    /// `None` when the pattern is not a plain identifier.
    pub name: Option<String>,
    /// Declared with a `ref` binding.
    pub by_ref_binding: bool,
    pub ty: RustType,
    /// `#[default_value(..)]`, or the reason it could not be read.
    pub default: Option<std::result::Result<DefaultValue, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCandidate {
    pub name: String,
    pub kind: CallKind,
    /// Send mode from the marker arguments, or why they are malformed.
    pub mode: std::result::Result<SendMode, String>,
    /// Markers beyond the first.
    pub extra_markers: usize,
    pub has_receiver: bool,
    pub returns_unit: bool,
    pub is_async: bool,
    pub is_generic: bool,
    pub visibility: Visibility,
    /// Depth of the declaring module below the crate root.
    pub module_depth: usize,
    pub params: Vec<ParamCandidate>,
    pub container: Container,
    /// Where the impl or trait names its type. The fn itself for free fns.
    pub container_location: Location,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct ScannedCrate {
    pub rpcs: Vec<RpcCandidate>,
    pub serializers: Vec<SerializerCandidate>,
    pub types: TypeIndex,
    /// Every file read, for `cargo:rerun-if-changed`.
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
//  SCANNER
// ============================================================================

struct ModuleCtx {
    /// Module path below the root, e.g. `["net", "lobby"]`.
    path: Vec<String>,
    file: PathBuf,
    /// Directory holding this module's out-of-line children.
    child_dir: PathBuf,
    reachable: bool,
}

impl ModuleCtx {
    fn depth(&self) -> usize {
        self.path.len()
    }
}

pub struct Scanner<'a> {
    loader: &'a dyn SourceLoader,
    root: Vec<String>,
    out: ScannedCrate,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner whose crate root is named by `root`: `["crate"]` for
    /// the crate being built, or an external path such as `["netrpc", "pack"]`.
    pub fn new(loader: &'a dyn SourceLoader, root: &[&str]) -> Self {
        Self {
            loader,
            root: root.iter().map(|s| s.to_string()).collect(),
            out: ScannedCrate::default(),
        }
    }

    /// Scans the crate whose root file is `root_file`.
    ///
    /// # Errors
    /// Fails if the root file cannot be read or parsed. Problems in other
    /// files become diagnostics.
    pub fn scan_crate(&mut self, root_file: &Path) -> Result<()> {
        let source = self
            .loader
            .load(root_file)
            .map_err(|source| Error::Io { path: root_file.to_path_buf(), source })?;
        let file = syn::parse_file(&source)
            .map_err(|e| Error::Parse { path: root_file.to_path_buf(), message: e.to_string() })?;

        tracing::debug!(file = %root_file.display(), "scanning crate root");
        self.out.files.push(root_file.to_path_buf());

        let ctx = ModuleCtx {
            path: Vec::new(),
            file: root_file.to_path_buf(),
            child_dir: root_file.parent().map(Path::to_path_buf).unwrap_or_default(),
            reachable: true,
        };
        self.scan_items(&ctx, &file.items);
        Ok(())
    }

    /// Scans one source text as the public module at `module_path`, without
    /// following its `mod` declarations out of line.
    pub fn scan_module_source(&mut self, module_path: &[&str], file: &Path, source: &str) -> Result<()> {
        let parsed = syn::parse_file(source)
            .map_err(|e| Error::Parse { path: file.to_path_buf(), message: e.to_string() })?;

        let ctx = ModuleCtx {
            path: module_path.iter().map(|s| s.to_string()).collect(),
            file: file.to_path_buf(),
            child_dir: PathBuf::new(),
            reachable: true,
        };
        self.scan_items(&ctx, &parsed.items);
        Ok(())
    }

    pub fn finish(self) -> ScannedCrate {
        self.out
    }

    fn absolute(&self, ctx: &ModuleCtx, name: &str) -> Vec<String> {
        let mut path = self.root.clone();
        path.extend(ctx.path.iter().cloned());
        path.push(name.to_string());
        path
    }

    fn scan_items(&mut self, ctx: &ModuleCtx, items: &[Item]) {
        let scope = Scope::new(&self.root, &ctx.path, items);

        for item in items {
            if is_test_only(item_attrs(item)) {
                continue;
            }
            match item {
                Item::Mod(m) => self.scan_mod(ctx, m),
                Item::Struct(s) => self.declare_type(ctx, &s.ident, &s.generics, &s.vis),
                Item::Enum(e) => self.declare_type(ctx, &e.ident, &e.generics, &e.vis),
                Item::Union(u) => self.declare_type(ctx, &u.ident, &u.generics, &u.vis),
                Item::Type(t) => self.declare_type(ctx, &t.ident, &t.generics, &t.vis),
                Item::Fn(f) => self.scan_free_fn(ctx, &scope, f),
                Item::Impl(i) => self.scan_impl(ctx, &scope, i),
                Item::Trait(t) => self.scan_trait(ctx, &scope, t),
                _ => {}
            }
        }
    }

    fn declare_type(&mut self, ctx: &ModuleCtx, ident: &Ident, generics: &syn::Generics, vis: &syn::Visibility) {
        let visible = Visibility::from_syn(vis).visible_from_root(ctx.depth());
        let decl = TypeDecl {
            path: self.absolute(ctx, &ident.to_string()),
            generic: !generics.params.is_empty(),
            reachable: ctx.reachable && visible,
            location: Location::new(&ctx.file, ident.span()),
        };
        self.out.types.insert(decl);
    }

    fn scan_mod(&mut self, ctx: &ModuleCtx, m: &syn::ItemMod) {
        let name = m.ident.to_string();
        let visible = Visibility::from_syn(&m.vis).visible_from_root(ctx.depth());
        let mut path = ctx.path.clone();
        path.push(name.clone());
        let reachable = ctx.reachable && visible;
        let path_attr = path_attr(&m.attrs);

        if let Some((_, items)) = &m.content {
            let child_dir = ctx.child_dir.join(path_attr.as_deref().unwrap_or(&name));
            let child = ModuleCtx { path, file: ctx.file.clone(), child_dir, reachable };
            self.scan_items(&child, items);
            return;
        }

        let candidates = match &path_attr {
            Some(p) => vec![ctx.file.parent().unwrap_or(Path::new("")).join(p)],
            None => vec![
                ctx.child_dir.join(format!("{}.rs", name)),
                ctx.child_dir.join(&name).join("mod.rs"),
            ],
        };
        let location = Location::new(&ctx.file, m.ident.span());

        let Some(file) = candidates.into_iter().find(|p| self.loader.exists(p)) else {
            self.out.diagnostics.push(
                Diagnostic::error(DiagnosticCode::Nrpc0100ParseError, format!("no source file for module `{}`", name))
                    .at(location),
            );
            return;
        };

        let parsed = match self.loader.load(&file) {
            Ok(source) => syn::parse_file(&source).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(message) => {
                self.out.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::Nrpc0100ParseError,
                        format!("module `{}` ({}): {}", name, file.display(), message),
                    )
                    .at(location),
                );
                return;
            }
        };

        tracing::trace!(module = %path.join("::"), file = %file.display(), "scanning module");
        self.out.files.push(file.clone());

        let owns_dir = path_attr.is_some() || file.file_name().is_some_and(|f| f == "mod.rs");
        let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
        let child_dir = if owns_dir { parent } else { parent.join(&name) };

        let child = ModuleCtx { path, file, child_dir, reachable };
        self.scan_items(&child, &parsed.items);
    }

    fn scan_free_fn(&mut self, ctx: &ModuleCtx, scope: &Scope, f: &syn::ItemFn) {
        let vis = Visibility::from_syn(&f.vis);
        if let Some(rpc) = self.rpc_candidate(ctx, scope, &f.attrs, vis.clone(), &f.sig, Container::Module) {
            self.out.rpcs.push(rpc);
            return;
        }

        if vis == Visibility::Private || !ctx.reachable || !vis.visible_from_root(ctx.depth()) {
            return;
        }

        let mut params = Vec::new();
        for input in &f.sig.inputs {
            match input {
                FnArg::Typed(pt) => params.push(scope.resolve_type(&pt.ty)),
                FnArg::Receiver(_) => return,
            }
        }
        let ret = match &f.sig.output {
            ReturnType::Default => RustType::unit(),
            ReturnType::Type(_, ty) => scope.resolve_type(ty),
        };

        if let Some(shape) = SerializerShape::classify(&params, &ret) {
            let function = RustType::path(self.absolute(ctx, &f.sig.ident.to_string()), Vec::new());
            self.out.serializers.push(SerializerCandidate {
                function,
                shape,
                location: Location::new(&ctx.file, f.sig.ident.span()),
            });
        }
    }

    fn scan_impl(&mut self, ctx: &ModuleCtx, scope: &Scope, i: &syn::ItemImpl) {
        let self_ty = scope.resolve_type(&i.self_ty);
        let container = match &i.trait_ {
            Some((_, path, _)) => Container::TraitImpl {
                self_ty,
                trait_name: path.to_token_stream().to_string(),
            },
            None => Container::Inherent { self_ty, generic: !i.generics.params.is_empty() },
        };
        let at = Location::new(&ctx.file, i.self_ty.span());

        for item in &i.items {
            if let ImplItem::Fn(f) = item {
                if is_test_only(&f.attrs) {
                    continue;
                }
                let vis = Visibility::from_syn(&f.vis);
                if let Some(rpc) = self.rpc_candidate(ctx, scope, &f.attrs, vis, &f.sig, container.clone()) {
                    self.out.rpcs.push(RpcCandidate { container_location: at.clone(), ..rpc });
                }
            }
        }
    }

    fn scan_trait(&mut self, ctx: &ModuleCtx, scope: &Scope, t: &syn::ItemTrait) {
        let container = Container::Trait { name: t.ident.to_string() };
        let at = Location::new(&ctx.file, t.ident.span());
        let vis = Visibility::from_syn(&t.vis);
        for item in &t.items {
            if let TraitItem::Fn(f) = item {
                if is_test_only(&f.attrs) {
                    continue;
                }
                if let Some(rpc) = self.rpc_candidate(ctx, scope, &f.attrs, vis.clone(), &f.sig, container.clone()) {
                    self.out.rpcs.push(RpcCandidate { container_location: at.clone(), ..rpc });
                }
            }
        }
    }

    fn rpc_candidate(
        &self,
        ctx: &ModuleCtx,
        scope: &Scope,
        attrs: &[Attribute],
        visibility: Visibility,
        sig: &syn::Signature,
        container: Container,
    ) -> Option<RpcCandidate> {
        let markers: Vec<(&Attribute, CallKind)> = attrs
            .iter()
            .filter_map(|a| {
                let last = a.path().segments.last()?;
                CallKind::from_marker(&last.ident.to_string()).map(|kind| (a, kind))
            })
            .collect();
        let (marker, kind) = *markers.first()?;
        let location = Location::new(&ctx.file, sig.ident.span());

        let mut has_receiver = false;
        let mut params = Vec::new();
        for input in &sig.inputs {
            match input {
                FnArg::Receiver(_) => has_receiver = true,
                FnArg::Typed(pt) => {
                    let (name, by_ref_binding) = match &*pt.pat {
                        Pat::Ident(pi) if pi.subpat.is_none() => (Some(pi.ident.to_string()), pi.by_ref.is_some()),
                        _ => (None, false),
                    };
                    let default = pt
                        .attrs
                        .iter()
                        .find(|a| a.path().is_ident(DEFAULT_VALUE))
                        .map(parse_default);
                    params.push(ParamCandidate {
                        name,
                        by_ref_binding,
                        ty: scope.resolve_type(&pt.ty),
                        default,
                    });
                }
            }
        }

        let returns_unit = match &sig.output {
            ReturnType::Default => true,
            ReturnType::Type(_, ty) => scope.resolve_type(ty).is_unit(),
        };

        Some(RpcCandidate {
            name: sig.ident.to_string(),
            kind,
            mode: parse_marker(marker),
            extra_markers: markers.len() - 1,
            has_receiver,
            returns_unit,
            is_async: sig.asyncness.is_some(),
            is_generic: !sig.generics.params.is_empty(),
            visibility,
            module_depth: ctx.depth(),
            params,
            container,
            container_location: location.clone(),
            location,
        })
    }
}

// ============================================================================
//  NAME RESOLUTION
// ============================================================================

/// The names visible in one module.
struct Scope {
    root: Vec<String>,
    path: Vec<String>,
    /// `use` aliases to absolute paths.
    uses: HashMap<String, Vec<String>>,
    /// Items declared in this module.
    locals: HashSet<String>,
}

impl Scope {
    fn new(root: &[String], path: &[String], items: &[Item]) -> Self {
        let mut scope = Scope {
            root: root.to_vec(),
            path: path.to_vec(),
            uses: HashMap::new(),
            locals: items.iter().filter_map(item_name).collect(),
        };

        let mut uses = HashMap::new();
        for item in items {
            if let Item::Use(u) = item {
                scope.collect_use(&u.tree, Vec::new(), u.leading_colon.is_some(), &mut uses);
            }
        }
        scope.uses = uses;
        scope
    }

    fn here(&self) -> Vec<String> {
        let mut out = self.root.clone();
        out.extend(self.path.iter().cloned());
        out
    }

    fn collect_use(&self, tree: &UseTree, prefix: Vec<String>, leading: bool, out: &mut HashMap<String, Vec<String>>) {
        match tree {
            UseTree::Path(p) => {
                let mut next = prefix;
                next.push(p.ident.to_string());
                self.collect_use(&p.tree, next, leading, out);
            }
            UseTree::Name(n) => {
                let name = n.ident.to_string();
                let (full, alias) = if name == "self" {
                    let alias = prefix.last().cloned();
                    (prefix, alias)
                } else {
                    let mut full = prefix;
                    full.push(name.clone());
                    (full, Some(name))
                };
                if let Some(alias) = alias {
                    out.insert(alias, self.absolute_use(&full, leading));
                }
            }
            UseTree::Rename(r) => {
                let alias = r.rename.to_string();
                if alias == "_" {
                    return;
                }
                let mut full = prefix;
                if r.ident != "self" {
                    full.push(r.ident.to_string());
                }
                out.insert(alias, self.absolute_use(&full, leading));
            }
            UseTree::Glob(_) => {}
            UseTree::Group(g) => {
                for tree in &g.items {
                    self.collect_use(tree, prefix.clone(), leading, out);
                }
            }
        }
    }

    fn absolute_use(&self, full: &[String], leading: bool) -> Vec<String> {
        if leading {
            return full.to_vec();
        }
        if let Some(anchored) = self.anchor(full) {
            return anchored;
        }
        match full.first() {
            Some(first) if self.locals.contains(first) => {
                let mut out = self.here();
                out.extend(full.iter().cloned());
                out
            }
            _ => full.to_vec(),
        }
    }

    /// Resolves paths starting with `crate`, `self` or `super`.
    fn anchor(&self, segments: &[String]) -> Option<Vec<String>> {
        match segments.first().map(String::as_str) {
            Some("crate") => {
                let mut out = self.root.clone();
                out.extend(segments[1..].iter().cloned());
                Some(out)
            }
            Some("self") => {
                let mut out = self.here();
                out.extend(segments[1..].iter().cloned());
                Some(out)
            }
            Some("super") => {
                let mut base = self.path.clone();
                let mut rest = segments;
                while rest.first().map(String::as_str) == Some("super") {
                    base.pop();
                    rest = &rest[1..];
                }
                let mut out = self.root.clone();
                out.extend(base);
                out.extend(rest.iter().cloned());
                Some(out)
            }
            _ => None,
        }
    }

    fn resolve_path(&self, segments: &[String], leading: bool) -> Vec<String> {
        if leading || segments.is_empty() {
            return segments.to_vec();
        }
        if let Some(anchored) = self.anchor(segments) {
            return anchored;
        }
        let first = &segments[0];
        if let Some(target) = self.uses.get(first) {
            let mut out = target.clone();
            out.extend(segments[1..].iter().cloned());
            out
        } else if self.locals.contains(first) {
            let mut out = self.here();
            out.extend(segments.iter().cloned());
            out
        } else {
            segments.to_vec()
        }
    }

    fn resolve_type(&self, ty: &syn::Type) -> RustType {
        match ty {
            syn::Type::Path(tp) if tp.qself.is_none() => {
                let segments: Vec<String> = tp.path.segments.iter().map(|s| s.ident.to_string()).collect();
                let mut args = Vec::new();
                if let Some(syn::PathArguments::AngleBracketed(ab)) = tp.path.segments.last().map(|s| &s.arguments) {
                    for arg in &ab.args {
                        match arg {
                            syn::GenericArgument::Type(t) => args.push(self.resolve_type(t)),
                            syn::GenericArgument::Lifetime(_) => {}
                            other => args.push(RustType::Opaque(other.to_token_stream().to_string())),
                        }
                    }
                }
                let path = self.resolve_path(&segments, tp.path.leading_colon.is_some());
                RustType::path(path, args)
            }
            syn::Type::Reference(r) => RustType::Reference {
                mutable: r.mutability.is_some(),
                inner: Box::new(self.resolve_type(&r.elem)),
            },
            syn::Type::Tuple(t) => RustType::Tuple(t.elems.iter().map(|e| self.resolve_type(e)).collect()),
            syn::Type::Array(a) => RustType::Array {
                elem: Box::new(self.resolve_type(&a.elem)),
                len: a.len.to_token_stream().to_string(),
            },
            syn::Type::Slice(s) => RustType::Slice(Box::new(self.resolve_type(&s.elem))),
            syn::Type::Paren(p) => self.resolve_type(&p.elem),
            syn::Type::Group(g) => self.resolve_type(&g.elem),
            other => RustType::Opaque(other.to_token_stream().to_string()),
        }
    }
}

// ============================================================================
//  ATTRIBUTES
// ============================================================================

fn item_name(item: &Item) -> Option<String> {
    let ident = match item {
        Item::Struct(i) => &i.ident,
        Item::Enum(i) => &i.ident,
        Item::Union(i) => &i.ident,
        Item::Type(i) => &i.ident,
        Item::Trait(i) => &i.ident,
        Item::Mod(i) => &i.ident,
        Item::Fn(i) => &i.sig.ident,
        Item::Const(i) => &i.ident,
        Item::Static(i) => &i.ident,
        _ => return None,
    };
    Some(ident.to_string())
}

fn item_attrs(item: &Item) -> &[Attribute] {
    match item {
        Item::Mod(i) => &i.attrs,
        Item::Struct(i) => &i.attrs,
        Item::Enum(i) => &i.attrs,
        Item::Union(i) => &i.attrs,
        Item::Type(i) => &i.attrs,
        Item::Fn(i) => &i.attrs,
        Item::Impl(i) => &i.attrs,
        Item::Trait(i) => &i.attrs,
        Item::Use(i) => &i.attrs,
        _ => &[],
    }
}

fn is_test_only(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|a| match &a.meta {
        Meta::List(list) => list.path.is_ident("cfg") && list.tokens.to_string() == "test",
        _ => false,
    })
}

fn path_attr(attrs: &[Attribute]) -> Option<String> {
    attrs.iter().find_map(|a| match &a.meta {
        Meta::NameValue(nv) if nv.path.is_ident("path") => match &nv.value {
            Expr::Lit(el) => match &el.lit {
                Lit::Str(s) => Some(s.value()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    })
}

fn parse_marker(attr: &Attribute) -> std::result::Result<SendMode, String> {
    match &attr.meta {
        Meta::Path(_) => Ok(SendMode::Reliable),
        Meta::List(list) => list.parse_args_with(parse_send_mode).map_err(|e| e.to_string()),
        Meta::NameValue(_) => Err("expected `#[marker]` or `#[marker(Unreliable)]`".into()),
    }
}

fn parse_send_mode(input: ParseStream) -> syn::Result<SendMode> {
    if input.is_empty() {
        return Ok(SendMode::Reliable);
    }
    if input.peek(Ident) && input.peek2(Token![=]) {
        let key: Ident = input.parse()?;
        if key != "send" {
            return Err(syn::Error::new(key.span(), "expected `send = Reliable` or `send = Unreliable`"));
        }
        input.parse::<Token![=]>()?;
    }

    let path: syn::Path = input.parse()?;
    if !input.is_empty() {
        return Err(input.error("unexpected tokens after send mode"));
    }
    match path.segments.last().map(|s| s.ident.to_string()).as_deref() {
        Some("Reliable") => Ok(SendMode::Reliable),
        Some("Unreliable") => Ok(SendMode::Unreliable),
        _ => Err(syn::Error::new_spanned(&path, "send mode must be `Reliable` or `Unreliable`")),
    }
}

fn parse_default(attr: &Attribute) -> std::result::Result<DefaultValue, String> {
    let expr = match &attr.meta {
        Meta::Path(_) => return Ok(DefaultValue::TypeDefault),
        Meta::List(list) => list.parse_args::<Expr>().map_err(|e| e.to_string())?,
        Meta::NameValue(nv) => nv.value.clone(),
    };

    let literal = match &expr {
        Expr::Lit(el) => Some(matches!(el.lit, Lit::Str(_))),
        Expr::Unary(u) if matches!(u.op, UnOp::Neg(_)) => match &*u.expr {
            Expr::Lit(el) if matches!(el.lit, Lit::Int(_) | Lit::Float(_)) => Some(false),
            _ => None,
        },
        _ => None,
    };

    match literal {
        Some(is_str) => Ok(DefaultValue::Literal { text: expr.to_token_stream().to_string(), is_str }),
        None => Err(format!("`{}` is not a literal", expr.to_token_stream())),
    }
}
