//! # Code Synthesizer
//!
//! Emits, for one validated rpc, an `impl` block on its container holding a
//! sender and a receiver.
//!
//! ## Format
//!
//! ```text
//! #[allow(dead_code)]
//! impl crate::lobby::Lobby {
//!     pub fn call_rpc_chat(__net: &NetworkManager, room: i32, text: String) -> netrpc::Result<()>
//!     pub(crate) fn deserialize_chat_17ad(__sender: &ConnectionHandle, __reader: &mut Reader<'_>) -> netpack::Result<()>
//! }
//! ```
//!
//! The sender writes `[hash: u16][payload...]` into a `Writer` it owns and
//! hands the bytes to the manager. The receiver reads the payload back in the
//! same order and calls the original fn.

use proc_macro2::Ident;
use proc_macro2::Span;
use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCode;
use crate::model::CallKind;
use crate::model::DefaultValue;
use crate::model::RustType;
use crate::model::Visibility;
use crate::registry::SerializerCandidate;
use crate::registry::SerializerRegistry;
use crate::validate::RpcDescriptor;
use crate::validate::RpcParam;

/// Name of the generated receiver for `descriptor`.
pub fn receiver_name(descriptor: &RpcDescriptor) -> String {
    format!("deserialize_{}_{:04x}", bare_name(&descriptor.name), descriptor.hash)
}

pub fn sender_name(descriptor: &RpcDescriptor) -> String {
    format!("call_rpc_{}", bare_name(&descriptor.name))
}

/// Generates the sender and receiver for `descriptor`.
///
/// # Errors
/// `NoWriter` or `NoReader` if a payload type has no registered serializer.
/// Nothing is emitted for the procedure in that case.
pub fn synthesize(descriptor: &RpcDescriptor, registry: &SerializerRegistry) -> Result<TokenStream, Diagnostic> {
    let mut writers = Vec::new();
    let mut readers = Vec::new();
    for param in descriptor.payload() {
        let Some(writer) = registry.writer(&param.ty) else {
            return Err(missing(DiagnosticCode::Nrpc0007NoWriter, "writer", descriptor, param));
        };
        writers.push(writer);
    }
    for param in descriptor.payload() {
        let Some(reader) = registry.reader(&param.ty) else {
            return Err(missing(DiagnosticCode::Nrpc0008NoReader, "reader", descriptor, param));
        };
        readers.push(reader);
    }

    let container = type_tokens(descriptor, &descriptor.container)?;
    let sender = sender(descriptor, &writers)?;
    let receiver = receiver(descriptor, &readers)?;

    Ok(quote! {
        #[allow(dead_code)]
        impl #container {
            #sender
            #receiver
        }
    })
}

fn sender(descriptor: &RpcDescriptor, writers: &[&SerializerCandidate]) -> Result<TokenStream, Diagnostic> {
    let name = Ident::new(&sender_name(descriptor), Span::call_site());
    let vis = match descriptor.visibility {
        Visibility::Public => quote!(pub),
        _ => quote!(pub(crate)),
    };
    let hash = descriptor.hash;
    let mode = format_ident!("{}", descriptor.mode.variant());

    let mut params = Vec::new();
    let mut defaults = Vec::new();
    for param in &descriptor.params {
        let id = ident(&param.name);
        if param.connection {
            params.push(quote!(#id: ::core::option::Option<&::netrpc::ConnectionHandle>));
            continue;
        }
        let ty = type_tokens(descriptor, &param.ty)?;
        match &param.default {
            None => params.push(quote!(#id: #ty)),
            Some(default) => {
                params.push(quote!(#id: ::core::option::Option<#ty>));
                defaults.push(apply_default(descriptor, &id, default)?);
            }
        }
    }

    let mut writes = Vec::new();
    for (param, writer) in descriptor.payload().zip(writers) {
        let id = ident(&param.name);
        let function = path_tokens(descriptor, &writer.function)?;
        writes.push(if writer.shape.by_ref {
            quote!(#function(&mut __writer, &#id);)
        } else {
            quote!(#function(&mut __writer, #id);)
        });
    }

    let connection = descriptor.connection_index().map(|i| ident(&descriptor.params[i].name));
    let send = match (descriptor.kind, &connection) {
        (CallKind::Client, Some(conn)) => {
            quote!(__net.send_to_client(#conn, __writer.as_bytes(), ::netrpc::SendMode::#mode))
        }
        (CallKind::Server, Some(conn)) => quote! {
            let _ = #conn;
            __net.send_to_server(__writer.as_bytes(), ::netrpc::SendMode::#mode)
        },
        (CallKind::Server, None) => quote!(__net.send_to_server(__writer.as_bytes(), ::netrpc::SendMode::#mode)),
        _ => quote!(__net.send_to_all_clients(__writer.as_bytes(), ::netrpc::SendMode::#mode)),
    };

    Ok(quote! {
        #[allow(clippy::too_many_arguments)]
        #vis fn #name(__net: &::netrpc::NetworkManager, #(#params),*) -> ::netrpc::Result<()> {
            if !__net.is_initialized() {
                return ::core::result::Result::Ok(());
            }
            #(#defaults)*
            let mut __writer = ::netrpc::pack::Writer::new();
            ::netrpc::pack::primitives::write_u16(&mut __writer, #hash);
            #(#writes)*
            #send
        }
    })
}

fn receiver(descriptor: &RpcDescriptor, readers: &[&SerializerCandidate]) -> Result<TokenStream, Diagnostic> {
    let name = Ident::new(&receiver_name(descriptor), Span::call_site());
    let target = ident(&descriptor.name);

    let mut readers = readers.iter();
    let mut lets = Vec::new();
    let mut args = Vec::new();
    for (i, param) in descriptor.params.iter().enumerate() {
        let arg = format_ident!("__arg{}", i);
        if param.connection {
            lets.push(quote!(let #arg = ::core::clone::Clone::clone(__sender);));
        } else if let Some(reader) = readers.next() {
            let function = path_tokens(descriptor, &reader.function)?;
            lets.push(if reader.shape.fallible {
                quote!(let #arg = #function(__reader)?;)
            } else {
                quote!(let #arg = #function(__reader);)
            });
        }
        args.push(arg);
    }

    Ok(quote! {
        #[doc(hidden)]
        #[allow(unused_variables)]
        pub(crate) fn #name(
            __sender: &::netrpc::ConnectionHandle,
            __reader: &mut ::netrpc::pack::Reader<'_>,
        ) -> ::netrpc::pack::Result<()> {
            #(#lets)*
            Self::#target(#(#args),*);
            ::core::result::Result::Ok(())
        }
    })
}

fn apply_default(descriptor: &RpcDescriptor, id: &Ident, default: &DefaultValue) -> Result<TokenStream, Diagnostic> {
    match default {
        DefaultValue::TypeDefault => Ok(quote!(let #id = #id.unwrap_or_default();)),
        DefaultValue::Literal { text, is_str } => {
            let literal: TokenStream = text.parse().map_err(|_| {
                Diagnostic::error(
                    DiagnosticCode::Nrpc0012BadDefault,
                    format!("default `{}` of rpc `{}` does not tokenize", text, descriptor.name),
                )
                .at(descriptor.location.clone())
            })?;
            Ok(if *is_str {
                quote!(let #id = #id.unwrap_or_else(|| ::core::convert::From::from(#literal));)
            } else {
                quote!(let #id = #id.unwrap_or(#literal);)
            })
        }
    }
}

fn missing(code: DiagnosticCode, what: &str, descriptor: &RpcDescriptor, param: &RpcParam) -> Diagnostic {
    Diagnostic::error(
        code,
        format!(
            "no {} registered for `{}` (parameter `{}` of rpc `{}`)",
            what, param.ty, param.name, descriptor.qualified_name
        ),
    )
    .at(descriptor.location.clone())
}

fn type_tokens(descriptor: &RpcDescriptor, ty: &RustType) -> Result<syn::Type, Diagnostic> {
    let code = ty.to_code();
    syn::parse_str(&code).map_err(|e| unparsable(descriptor, &code, e))
}

fn path_tokens(descriptor: &RpcDescriptor, function: &RustType) -> Result<syn::Path, Diagnostic> {
    let code = function.to_code();
    syn::parse_str(&code).map_err(|e| unparsable(descriptor, &code, e))
}

fn unparsable(descriptor: &RpcDescriptor, code: &str, error: syn::Error) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::Nrpc0100ParseError,
        format!("cannot emit `{}` for rpc `{}`: {}", code, descriptor.name, error),
    )
    .at(descriptor.location.clone())
}

fn bare_name(name: &str) -> &str {
    name.strip_prefix("r#").unwrap_or(name)
}

fn ident(name: &str) -> Ident {
    match name.strip_prefix("r#") {
        Some(raw) => Ident::new_raw(raw, Span::call_site()),
        None => Ident::new(name, Span::call_site()),
    }
}
