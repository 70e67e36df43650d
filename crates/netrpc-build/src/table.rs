//! Dispatch table planning and emission.
//!
//! Descriptors are ordered Server, Client, Multi (scan order within each kind)
//! and registered in that order. The first descriptor to claim a hash keeps
//! it; every later one is rejected with `DuplicateHash`, and none of its code
//! is emitted.

use proc_macro2::Ident;
use proc_macro2::Span;
use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCode;
use crate::synth::receiver_name;
use crate::validate::RpcDescriptor;

#[derive(Debug, Default)]
pub struct TablePlan {
    /// Indices into the planned descriptor slice, in registration order.
    pub accepted: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn plan(descriptors: &[RpcDescriptor]) -> TablePlan {
    let mut order: Vec<usize> = (0..descriptors.len()).collect();
    order.sort_by_key(|&i| descriptors[i].kind);

    let mut plan = TablePlan::default();
    for i in order {
        let candidate = &descriptors[i];
        let kept = plan.accepted.iter().map(|&k| &descriptors[k]).find(|d| d.hash == candidate.hash);
        match kept {
            Some(kept) => plan.diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::Nrpc0009DuplicateHash,
                    format!(
                        "`{}` hashes to {:#06x}, already taken by `{}`; rename one of them",
                        candidate.qualified_name, candidate.hash, kept.qualified_name
                    ),
                )
                .at(candidate.location.clone()),
            ),
            None => plan.accepted.push(i),
        }
    }
    plan
}

/// Emits `register_rpcs` and `rpc_dispatch_table` over `accepted`, which must
/// already be in registration order.
pub fn emit(accepted: &[&RpcDescriptor]) -> Result<TokenStream, Diagnostic> {
    let mut registrations = Vec::new();
    for descriptor in accepted {
        let code = descriptor.container.to_code();
        let container: syn::Type = syn::parse_str(&code).map_err(|e| {
            Diagnostic::error(DiagnosticCode::Nrpc0100ParseError, format!("cannot emit `{}`: {}", code, e))
                .at(descriptor.location.clone())
        })?;
        let hash = descriptor.hash;
        let name = &descriptor.qualified_name;
        let kind = format_ident!("{}", descriptor.kind.variant());
        let receiver = Ident::new(&receiver_name(descriptor), Span::call_site());

        registrations.push(quote! {
            let _ = builder.register(#hash, #name, ::netrpc::CallKind::#kind, <#container>::#receiver);
        });
    }

    Ok(quote! {
        /// Registers every generated receiver.
        #[allow(unused_variables)]
        pub(crate) fn register_rpcs(builder: &mut ::netrpc::DispatchTableBuilder) {
            #(#registrations)*
        }

        /// The dispatch table for this crate's rpcs, built on first use.
        pub fn rpc_dispatch_table() -> ::std::sync::Arc<::netrpc::DispatchTable> {
            static TABLE: ::std::sync::OnceLock<::std::sync::Arc<::netrpc::DispatchTable>> =
                ::std::sync::OnceLock::new();
            ::std::sync::Arc::clone(TABLE.get_or_init(|| {
                let mut builder = ::netrpc::DispatchTable::builder();
                register_rpcs(&mut builder);
                ::std::sync::Arc::new(builder.build())
            }))
        }
    })
}
