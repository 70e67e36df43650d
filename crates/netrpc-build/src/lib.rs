//! # netrpc-build
//!
//! Generates the rpc plumbing for a crate from its own source, at build time.
//!
//! ## Philosophy
//!
//! - **Source is the schema**: Procedures are plain associated fns marked with
//!   `#[server_rpc]`, `#[client_rpc]` or `#[multi_rpc]`. There is no IDL.
//! - **Names are ids**: Each procedure's id is a stable hash of its fully
//!   qualified name, so peers built from the same source agree without a
//!   handshake.
//! - **Report, don't stop**: A bad declaration becomes a diagnostic scoped to
//!   that procedure. Everything else is still generated.
//!
//! ## Usage
//!
//! ```ignore
//! // build.rs
//! fn main() -> anyhow::Result<()> {
//!     netrpc_build::compile()?;
//!     Ok(())
//! }
//!
//! // src/lib.rs
//! netrpc::include_rpcs!();
//! ```
//!
//! ## Pipeline
//!
//! 1. Scan the built-in serializers, then the crate's module tree.
//! 2. Register serializers by payload type.
//! 3. Validate each marked procedure.
//! 4. Synthesize a sender and a receiver per valid procedure.
//! 5. Plan the dispatch table, rejecting repeated hashes.
//! 6. Write the generated file, with a `compile_error!` per error diagnostic.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use quote::quote;

pub mod diagnostic;
pub mod model;
pub mod registry;
pub mod scan;
pub mod synth;
pub mod table;
pub mod validate;


pub use diagnostic::Diagnostic;
pub use diagnostic::DiagnosticCode;
pub use diagnostic::Location;
pub use diagnostic::Severity;
pub use scan::FsLoader;
pub use scan::MemoryLoader;
pub use scan::SourceLoader;
pub use validate::RpcDescriptor;

/// Default name of the generated file inside `OUT_DIR`.
pub const DEFAULT_FILE_NAME: &str = "netrpc_generated.rs";

const HEADER: &str = "// @generated by netrpc-build. Do not edit.";
const BUILTIN_FILE: &str = "netpack/src/primitives.rs";

#[derive(Debug)]
pub enum Error {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    /// A required build-script environment variable is missing.
    Env(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
            Self::Parse { path, message } => write!(f, "Parse error in {}: {}", path.display(), message),
            Self::Env(var) => write!(f, "Environment variable {} is not set", var),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Output of one generation run.
#[derive(Debug, Default)]
pub struct Generated {
    /// Contents of the generated file.
    pub code: String,
    /// Procedures registered in the dispatch table, in registration order.
    pub descriptors: Vec<RpcDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
    /// Source files the output depends on.
    pub files: Vec<PathBuf>,
}

impl Generated {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn descriptor(&self, name: &str) -> Option<&RpcDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }
}

/// Configures a generation run.
#[derive(Debug, Clone)]
pub struct Builder {
    crate_name: String,
    source_root: PathBuf,
    out_dir: Option<PathBuf>,
    file_name: String,
    emit_compile_errors: bool,
    builtins: bool,
}

impl Builder {
    /// `crate_name` is the name used in qualified rpc names (with `_`, as in
    /// paths); `source_root` is the crate's `lib.rs` or `main.rs`.
    pub fn new(crate_name: impl Into<String>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            crate_name: crate_name.into(),
            source_root: source_root.into(),
            out_dir: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
            emit_compile_errors: true,
            builtins: true,
        }
    }

    /// Configures from the variables cargo sets for build scripts.
    pub fn from_env() -> Result<Self> {
        let name = std::env::var("CARGO_PKG_NAME").map_err(|_| Error::Env("CARGO_PKG_NAME"))?;
        let manifest = std::env::var_os("CARGO_MANIFEST_DIR").ok_or(Error::Env("CARGO_MANIFEST_DIR"))?;
        let src = PathBuf::from(manifest).join("src");
        let lib = src.join("lib.rs");
        let root = if lib.is_file() { lib } else { src.join("main.rs") };

        let mut builder = Self::new(name.replace('-', "_"), root);
        builder.out_dir = std::env::var_os("OUT_DIR").map(PathBuf::from);
        Ok(builder)
    }

    pub fn crate_name(mut self, name: impl Into<String>) -> Self {
        self.crate_name = name.into();
        self
    }

    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_root = path.into();
        self
    }

    pub fn out_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(path.into());
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Whether error diagnostics also become `compile_error!` items. On by default.
    pub fn emit_compile_errors(mut self, enabled: bool) -> Self {
        self.emit_compile_errors = enabled;
        self
    }

    /// Whether the `netpack` primitive serializers are registered. On by default.
    pub fn builtins(mut self, enabled: bool) -> Self {
        self.builtins = enabled;
        self
    }

    /// Runs the pipeline over sources from `loader` without touching the disk.
    pub fn generate(&self, loader: &dyn SourceLoader) -> Result<Generated> {
        let mut serializers = Vec::new();
        let mut diagnostics = Vec::new();

        if self.builtins {
            let mut builtin = scan::Scanner::new(loader, &["netrpc", "pack"]);
            builtin.scan_module_source(&["primitives"], Path::new(BUILTIN_FILE), netpack::PRIMITIVES_SOURCE)?;
            serializers.extend(builtin.finish().serializers);
        }

        let mut scanner = scan::Scanner::new(loader, &["crate"]);
        scanner.scan_crate(&self.source_root)?;
        let scanned = scanner.finish();
        diagnostics.extend(scanned.diagnostics);
        serializers.extend(scanned.serializers);

        let (registry, ambiguities) = registry::SerializerRegistry::build(serializers);
        diagnostics.extend(ambiguities);

        let mut synthesized = Vec::new();
        for candidate in &scanned.rpcs {
            let result = validate::validate(candidate, &scanned.types, &self.crate_name)
                .and_then(|descriptor| synth::synthesize(&descriptor, &registry).map(|tokens| (descriptor, tokens)));
            match result {
                Ok(pair) => synthesized.push(pair),
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }

        let descriptors: Vec<RpcDescriptor> = synthesized.iter().map(|(d, _)| d.clone()).collect();
        let plan = table::plan(&descriptors);
        diagnostics.extend(plan.diagnostics);

        let accepted: HashSet<usize> = plan.accepted.iter().copied().collect();
        let mut items: Vec<proc_macro2::TokenStream> = synthesized
            .iter()
            .enumerate()
            .filter(|(i, _)| accepted.contains(i))
            .map(|(_, (_, tokens))| tokens.clone())
            .collect();

        let registered: Vec<&RpcDescriptor> = plan.accepted.iter().map(|&i| &descriptors[i]).collect();
        match table::emit(&registered) {
            Ok(tokens) => items.push(tokens),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }

        if self.emit_compile_errors {
            items.extend(diagnostics.iter().filter(|d| d.is_error()).map(Diagnostic::to_compile_error));
        }

        let body = quote!(#(#items)*);
        tracing::debug!(
            crate_name = %self.crate_name,
            rpcs = registered.len(),
            serializers = registry.len(),
            diagnostics = diagnostics.len(),
            "rpc generation finished"
        );

        Ok(Generated {
            code: format!("{}\n\n{}\n", HEADER, body),
            descriptors: registered.into_iter().cloned().collect(),
            diagnostics,
            files: scanned.files,
        })
    }

    /// Generates from the file system and writes the result into the output
    /// directory, reporting diagnostics and dependencies to cargo.
    ///
    /// # Errors
    /// Fails on I/O or parse errors in the crate root, or when no output
    /// directory is configured. Declaration problems are not errors here;
    /// they are in `Generated::diagnostics` and in the generated file.
    pub fn compile(&self) -> Result<Generated> {
        let generated = self.generate(&FsLoader)?;

        let out_dir = self.out_dir.clone().ok_or(Error::Env("OUT_DIR"))?;
        let path = out_dir.join(&self.file_name);
        std::fs::write(&path, &generated.code).map_err(|source| Error::Io { path: path.clone(), source })?;

        for file in &generated.files {
            println!("cargo:rerun-if-changed={}", file.display());
        }
        for diagnostic in &generated.diagnostics {
            println!("cargo:warning={}", diagnostic.to_cargo_line());
        }

        tracing::info!(path = %path.display(), rpcs = generated.descriptors.len(), "wrote rpc bindings");
        Ok(generated)
    }
}

/// Generates rpc bindings for the crate running this build script, with
/// default settings.
pub fn compile() -> Result<Generated> {
    Builder::from_env()?.compile()
}
