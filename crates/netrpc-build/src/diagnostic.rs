use std::fmt;
use std::path::PathBuf;

use proc_macro2::TokenStream;
use quote::quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticCode {
    Nrpc0001VoidStatic,
    Nrpc0002Partial,
    Nrpc0003RefParameter,
    Nrpc0004MissingConnection,
    Nrpc0005DuplicateConnection,
    Nrpc0006ForbiddenConnection,
    Nrpc0007NoWriter,
    Nrpc0008NoReader,
    Nrpc0009DuplicateHash,
    Nrpc0010AmbiguousSerializer,
    Nrpc0011BadMarker,
    Nrpc0012BadDefault,
    Nrpc0100ParseError,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::Nrpc0001VoidStatic => "NRPC0001",
            DiagnosticCode::Nrpc0002Partial => "NRPC0002",
            DiagnosticCode::Nrpc0003RefParameter => "NRPC0003",
            DiagnosticCode::Nrpc0004MissingConnection => "NRPC0004",
            DiagnosticCode::Nrpc0005DuplicateConnection => "NRPC0005",
            DiagnosticCode::Nrpc0006ForbiddenConnection => "NRPC0006",
            DiagnosticCode::Nrpc0007NoWriter => "NRPC0007",
            DiagnosticCode::Nrpc0008NoReader => "NRPC0008",
            DiagnosticCode::Nrpc0009DuplicateHash => "NRPC0009",
            DiagnosticCode::Nrpc0010AmbiguousSerializer => "NRPC0010",
            DiagnosticCode::Nrpc0011BadMarker => "NRPC0011",
            DiagnosticCode::Nrpc0012BadDefault => "NRPC0012",
            DiagnosticCode::Nrpc0100ParseError => "NRPC0100",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::Nrpc0001VoidStatic => "rpc must be an associated fn without `self` that returns `()`",
            DiagnosticCode::Nrpc0002Partial => "rpc container type cannot be extended by generated code",
            DiagnosticCode::Nrpc0003RefParameter => "rpc parameters cannot be references",
            DiagnosticCode::Nrpc0004MissingConnection => "client rpc needs a `ConnectionHandle` parameter",
            DiagnosticCode::Nrpc0005DuplicateConnection => "rpc has more than one `ConnectionHandle` parameter",
            DiagnosticCode::Nrpc0006ForbiddenConnection => "multi rpc cannot take a `ConnectionHandle` parameter",
            DiagnosticCode::Nrpc0007NoWriter => "no writer registered for parameter type",
            DiagnosticCode::Nrpc0008NoReader => "no reader registered for parameter type",
            DiagnosticCode::Nrpc0009DuplicateHash => "rpc hash collides with another rpc",
            DiagnosticCode::Nrpc0010AmbiguousSerializer => "more than one serializer for the same type",
            DiagnosticCode::Nrpc0011BadMarker => "malformed rpc marker",
            DiagnosticCode::Nrpc0012BadDefault => "malformed default value",
            DiagnosticCode::Nrpc0100ParseError => "failed to parse source file",
        }
    }
}

/// A source position, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, span: proc_macro2::Span) -> Self {
        let start = span.start();
        Self { file: file.into(), line: start.line, column: start.column + 1 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self { code, severity: Severity::Error, message: message.into(), location: None }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self { code, severity: Severity::Warning, message: message.into(), location: None }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// A single-line rendering for `cargo:warning=`.
    pub fn to_cargo_line(&self) -> String {
        self.to_string().replace('\n', " ")
    }

    /// A `compile_error!` item carrying this diagnostic.
    pub fn to_compile_error(&self) -> TokenStream {
        let text = self.to_cargo_line();
        quote! { ::core::compile_error!(#text); }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]: {}", level, self.code.code_str(), self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}
