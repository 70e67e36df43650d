//! Checks an `RpcCandidate` against the rules generated code relies on and
//! turns it into an `RpcDescriptor`.
//!
//! Rules run in a fixed order and the first failure wins, so every rejected
//! procedure produces exactly one diagnostic.

use netpack::hash::stable_hash;

use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCode;
use crate::diagnostic::Location;
use crate::model::CallKind;
use crate::model::DefaultValue;
use crate::model::RustType;
use crate::model::SendMode;
use crate::model::Visibility;
use crate::scan::Container;
use crate::scan::RpcCandidate;
use crate::scan::TypeIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcParam {
    pub name: String,
    pub ty: RustType,
    /// The connection-handle slot. Never on the wire.
    pub connection: bool,
    pub default: Option<DefaultValue>,
}

/// A validated remote procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcDescriptor {
    pub name: String,
    pub qualified_name: String,
    pub kind: CallKind,
    pub hash: u16,
    pub params: Vec<RpcParam>,
    pub visibility: Visibility,
    pub mode: SendMode,
    /// The type the procedure is an associated fn of.
    pub container: RustType,
    pub location: Location,
}

impl RpcDescriptor {
    pub fn connection_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.connection)
    }

    /// Parameters that travel on the wire, in declaration order.
    pub fn payload(&self) -> impl Iterator<Item = &RpcParam> {
        self.params.iter().filter(|p| !p.connection)
    }
}

/// Builds the qualified name hashed into an rpc id.
///
/// `crate_name::module::Type::name(T0, T1, ...)`, with every parameter type
/// rendered fully resolved.
pub fn qualified_name(container: &RustType, name: &str, params: &[RustType], crate_name: &str) -> String {
    let params: Vec<String> = params.iter().map(|ty| ty.qualified(crate_name)).collect();
    format!("{}::{}({})", container.qualified(crate_name), name, params.join(", "))
}

pub fn validate(candidate: &RpcCandidate, types: &TypeIndex, crate_name: &str) -> Result<RpcDescriptor, Diagnostic> {
    let fail = |code: DiagnosticCode, message: String| Err(Diagnostic::error(code, message).at(candidate.location.clone()));
    let marker = candidate.kind.marker();

    // Shape
    let shape_problem = if candidate.has_receiver {
        Some("takes `self`")
    } else if !candidate.returns_unit {
        Some("returns a value")
    } else if candidate.is_async {
        Some("is `async`")
    } else if candidate.is_generic {
        Some("has generic parameters")
    } else if candidate.params.iter().any(|p| p.name.is_none()) {
        Some("has a parameter that is not a plain identifier")
    } else if !candidate.visibility.visible_from_root(candidate.module_depth) {
        Some("is not visible from the crate root")
    } else {
        None
    };
    if let Some(problem) = shape_problem {
        return fail(
            DiagnosticCode::Nrpc0001VoidStatic,
            format!("#[{}] fn `{}` {}; rpcs must be associated fns without `self` returning `()`", marker, candidate.name, problem),
        );
    }

    // Open for extension
    let container = open_container(&candidate.container, types).map_err(|problem| {
        Diagnostic::error(
            DiagnosticCode::Nrpc0002Partial,
            format!("#[{}] fn `{}`: {}", marker, candidate.name, problem),
        )
        .at(container_location(candidate, types))
    })?;

    // By-reference parameters
    if let Some(param) = candidate.params.iter().find(|p| p.by_ref_binding || p.ty.is_reference()) {
        return fail(
            DiagnosticCode::Nrpc0003RefParameter,
            format!(
                "parameter `{}: {}` of rpc `{}` is passed by reference",
                param.name.as_deref().unwrap_or("_"),
                param.ty,
                candidate.name
            ),
        );
    }

    // Connection handle
    let handles = candidate.params.iter().filter(|p| p.ty.is_connection_handle()).count();
    match (candidate.kind, handles) {
        (CallKind::Server, 0 | 1) | (CallKind::Client, 1) | (CallKind::Multi, 0) => {}
        (CallKind::Client, 0) => {
            return fail(
                DiagnosticCode::Nrpc0004MissingConnection,
                format!("client rpc `{}` needs a `ConnectionHandle` parameter naming the destination", candidate.name),
            );
        }
        (CallKind::Multi, _) => {
            return fail(
                DiagnosticCode::Nrpc0006ForbiddenConnection,
                format!("multi rpc `{}` goes to every client and cannot take a `ConnectionHandle`", candidate.name),
            );
        }
        (_, n) => {
            return fail(
                DiagnosticCode::Nrpc0005DuplicateConnection,
                format!("rpc `{}` has {} `ConnectionHandle` parameters; at most one is allowed", candidate.name, n),
            );
        }
    }

    let types_in_order: Vec<RustType> = candidate.params.iter().map(|p| p.ty.clone()).collect();
    let qualified = qualified_name(&container, &candidate.name, &types_in_order, crate_name);
    let hash = stable_hash(&qualified);

    // Send mode
    if candidate.extra_markers > 0 {
        return fail(
            DiagnosticCode::Nrpc0011BadMarker,
            format!("rpc `{}` carries more than one rpc marker", candidate.name),
        );
    }
    let mode = match &candidate.mode {
        Ok(mode) => *mode,
        Err(reason) => {
            return fail(
                DiagnosticCode::Nrpc0011BadMarker,
                format!("#[{}] on `{}`: {}", marker, candidate.name, reason),
            );
        }
    };

    // Defaults
    let mut params = Vec::with_capacity(candidate.params.len());
    for param in &candidate.params {
        let name = param.name.clone().unwrap_or_default();
        let connection = param.ty.is_connection_handle();
        let default = match &param.default {
            None => None,
            Some(_) if connection => {
                return fail(
                    DiagnosticCode::Nrpc0012BadDefault,
                    format!("connection parameter `{}` of rpc `{}` cannot have a default", name, candidate.name),
                );
            }
            Some(Ok(default)) => Some(default.clone()),
            Some(Err(reason)) => {
                return fail(
                    DiagnosticCode::Nrpc0012BadDefault,
                    format!("default for `{}` of rpc `{}`: {}", name, candidate.name, reason),
                );
            }
        };
        params.push(RpcParam { name, ty: param.ty.clone(), connection, default });
    }

    tracing::trace!(rpc = %qualified, hash, "rpc validated");

    Ok(RpcDescriptor {
        name: candidate.name.clone(),
        qualified_name: qualified,
        kind: candidate.kind,
        hash,
        params,
        visibility: candidate.visibility.clone(),
        mode,
        container,
        location: candidate.location.clone(),
    })
}

fn open_container(container: &Container, types: &TypeIndex) -> Result<RustType, String> {
    match container {
        Container::Module => Err("free fns cannot be rpcs; declare it in an inherent `impl`".into()),
        Container::Trait { name } => Err(format!("declared in trait `{}`; rpcs must live in an inherent `impl`", name)),
        Container::TraitImpl { self_ty, trait_name } => Err(format!(
            "declared in `impl {} for {}`; rpcs must live in an inherent `impl`",
            trait_name, self_ty
        )),
        Container::Inherent { self_ty, generic } => {
            let RustType::Path { segments, args } = self_ty else {
                return Err(format!("`{}` is not a named type of this crate", self_ty));
            };
            if *generic || !args.is_empty() {
                return Err(format!("`{}` is generic; rpc containers must be concrete", self_ty));
            }
            if segments.first().map(String::as_str) != Some("crate") {
                return Err(format!("`{}` is not declared in this crate", self_ty));
            }
            match types.get(segments) {
                None => Err(format!("`{}` is not declared in this crate", self_ty)),
                Some(decl) if decl.generic => Err(format!("`{}` is generic; rpc containers must be concrete", self_ty)),
                Some(decl) if !decl.reachable => Err(format!("`{}` cannot be named from the crate root", self_ty)),
                Some(_) => Ok(self_ty.clone()),
            }
        }
    }
}

/// The declaration of the containing type when it is local, otherwise where
/// the impl or trait names it.
fn container_location(candidate: &RpcCandidate, types: &TypeIndex) -> Location {
    let self_ty = match &candidate.container {
        Container::Inherent { self_ty, .. } | Container::TraitImpl { self_ty, .. } => self_ty,
        Container::Trait { .. } | Container::Module => return candidate.container_location.clone(),
    };
    match self_ty {
        RustType::Path { segments, .. } => types
            .get(segments)
            .map(|decl| decl.location.clone())
            .unwrap_or_else(|| candidate.container_location.clone()),
        _ => candidate.container_location.clone(),
    }
}
