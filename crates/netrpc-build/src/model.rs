//! Owned, thread-safe descriptions of the declarations the pipeline works on.
//!
//! Nothing here holds `syn` nodes or spans, so every stage after scanning can
//! run on plain data.

use std::fmt;

/// A type with every path resolved as far as the scanner could.
///
/// Crate-local paths start with `crate`. Lifetimes are not part of a type's
/// identity, so `Reader<'a>` and `Reader<'_>` are the same `RustType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RustType {
    Path { segments: Vec<String>, args: Vec<RustType> },
    Reference { mutable: bool, inner: Box<RustType> },
    Tuple(Vec<RustType>),
    Array { elem: Box<RustType>, len: String },
    Slice(Box<RustType>),
    /// Anything the scanner does not model, kept as token text.
    Opaque(String),
}

/// Standard library paths that name a prelude type.
const PRELUDE_ALIASES: &[(&[&str], &str)] = &[
    (&["std", "string", "String"], "String"),
    (&["alloc", "string", "String"], "String"),
    (&["std", "vec", "Vec"], "Vec"),
    (&["alloc", "vec", "Vec"], "Vec"),
    (&["std", "option", "Option"], "Option"),
    (&["core", "option", "Option"], "Option"),
    (&["std", "boxed", "Box"], "Box"),
    (&["alloc", "boxed", "Box"], "Box"),
];

impl RustType {
    pub fn path(segments: Vec<String>, args: Vec<RustType>) -> Self {
        let segments = match PRELUDE_ALIASES.iter().find(|(long, _)| *long == segments.as_slice()) {
            Some((_, short)) => vec![short.to_string()],
            None => segments,
        };
        RustType::Path { segments, args }
    }

    /// A single-segment path such as `i32`.
    pub fn named(name: &str) -> Self {
        RustType::Path { segments: vec![name.to_string()], args: Vec::new() }
    }

    pub fn unit() -> Self {
        RustType::Tuple(Vec::new())
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, RustType::Tuple(elems) if elems.is_empty())
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, RustType::Reference { .. })
    }

    /// The last path segment, if this is a path type.
    pub fn last_segment(&self) -> Option<&str> {
        match self {
            RustType::Path { segments, .. } => segments.last().map(String::as_str),
            _ => None,
        }
    }

    pub fn generic_args(&self) -> &[RustType] {
        match self {
            RustType::Path { args, .. } => args,
            _ => &[],
        }
    }

    /// True for the runtime's `ConnectionHandle`: a path into `netrpc`, or the
    /// bare name when a glob import brought it in. A local type with the same
    /// name resolves under `crate` and is an ordinary payload type.
    pub fn is_connection_handle(&self) -> bool {
        let RustType::Path { segments, args } = self else {
            return false;
        };
        if !args.is_empty() || segments.last().map(String::as_str) != Some("ConnectionHandle") {
            return false;
        }
        segments.len() == 1 || segments[0] == "netrpc"
    }

    /// True for `&mut <name>` (any generic arguments).
    pub fn is_mut_ref_to(&self, name: &str) -> bool {
        match self {
            RustType::Reference { mutable: true, inner } => inner.last_segment() == Some(name),
            _ => false,
        }
    }

    /// Renders the type with `crate` replaced by `crate_name`, for hashing and messages.
    pub fn qualified(&self, crate_name: &str) -> String {
        self.render(&|segments: &[String]| {
            let mut out = segments.join("::");
            if segments.first().map(String::as_str) == Some("crate") {
                out.replace_range(0.."crate".len(), crate_name);
            }
            out
        })
    }

    /// Renders the type as it must be written at the root of the crate being
    /// generated for: crate-local paths keep `crate::`, other multi-segment
    /// paths become absolute.
    pub fn to_code(&self) -> String {
        self.render(&|segments: &[String]| {
            let joined = segments.join("::");
            if segments.len() > 1 && segments[0] != "crate" {
                format!("::{}", joined)
            } else {
                joined
            }
        })
    }

    fn render(&self, path: &dyn Fn(&[String]) -> String) -> String {
        match self {
            RustType::Path { segments, args } => {
                let mut out = path(segments);
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.render(path)).collect();
                    out.push('<');
                    out.push_str(&args.join(", "));
                    out.push('>');
                }
                out
            }
            RustType::Reference { mutable, inner } => {
                let prefix = if *mutable { "&mut " } else { "&" };
                format!("{}{}", prefix, inner.render(path))
            }
            RustType::Tuple(elems) => {
                let elems: Vec<String> = elems.iter().map(|e| e.render(path)).collect();
                if elems.len() == 1 {
                    format!("({},)", elems[0])
                } else {
                    format!("({})", elems.join(", "))
                }
            }
            RustType::Array { elem, len } => format!("[{}; {}]", elem.render(path), len),
            RustType::Slice(elem) => format!("[{}]", elem.render(path)),
            RustType::Opaque(text) => text.clone(),
        }
    }
}

impl fmt::Display for RustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|segments: &[String]| segments.join("::")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Crate,
    /// `pub(super)` or `pub(in path)`; holds the path text.
    Restricted(String),
    Private,
}

impl Visibility {
    pub fn from_syn(vis: &syn::Visibility) -> Self {
        match vis {
            syn::Visibility::Public(_) => Visibility::Public,
            syn::Visibility::Inherited => Visibility::Private,
            syn::Visibility::Restricted(r) => {
                let path = r
                    .path
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect::<Vec<_>>()
                    .join("::");
                match path.as_str() {
                    "crate" => Visibility::Crate,
                    "self" => Visibility::Private,
                    _ => Visibility::Restricted(path),
                }
            }
        }
    }

    /// Whether an item with this visibility, declared in a module `depth`
    /// levels below the crate root, can be named from the crate root.
    pub fn visible_from_root(&self, depth: usize) -> bool {
        match self {
            Visibility::Public | Visibility::Crate => true,
            Visibility::Private => depth == 0,
            Visibility::Restricted(path) if path == "super" => depth <= 1,
            Visibility::Restricted(_) => depth == 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    Server,
    Client,
    Multi,
}

impl CallKind {
    pub fn from_marker(name: &str) -> Option<Self> {
        match name {
            "server_rpc" => Some(CallKind::Server),
            "client_rpc" => Some(CallKind::Client),
            "multi_rpc" => Some(CallKind::Multi),
            _ => None,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            CallKind::Server => "server_rpc",
            CallKind::Client => "client_rpc",
            CallKind::Multi => "multi_rpc",
        }
    }

    /// Variant name of `netrpc::CallKind`.
    pub fn variant(self) -> &'static str {
        match self {
            CallKind::Server => "Server",
            CallKind::Client => "Client",
            CallKind::Multi => "Multi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SendMode {
    #[default]
    Reliable,
    Unreliable,
}

impl SendMode {
    /// Variant name of `netrpc::SendMode`.
    pub fn variant(self) -> &'static str {
        match self {
            SendMode::Reliable => "Reliable",
            SendMode::Unreliable => "Unreliable",
        }
    }
}

/// The value a sender substitutes when a defaulted argument is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// A literal, kept as token text.
    Literal { text: String, is_str: bool },
    /// `Default::default()`.
    TypeDefault,
}
