//! Marker attributes for netrpc procedures.
//!
//! The markers do not generate code themselves. `netrpc-build` reads them from
//! source at build time and emits the senders, receivers and dispatch table.
//! At expansion time the markers only check their own arguments and remove the
//! `#[default_value(..)]` helper attributes from parameters, which the compiler
//! would otherwise reject.
//!
//! ```rust,ignore
//! use netrpc::{ConnectionHandle, server_rpc};
//!
//! impl Player {
//!     #[server_rpc(Unreliable)]
//!     pub fn moved(sender: ConnectionHandle, x: f32, #[default_value(0.0)] y: f32) {
//!         // runs on the server
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::FnArg;
use syn::Ident;
use syn::ItemFn;
use syn::Path;
use syn::Token;
use syn::parse::Parse;
use syn::parse::ParseStream;


const MARKERS: [&str; 3] = ["server_rpc", "client_rpc", "multi_rpc"];
const DEFAULT_VALUE: &str = "default_value";

/// Marks a procedure a client invokes on the server.
///
/// A single `ConnectionHandle` parameter is optional; on receipt it holds the
/// calling client.
#[proc_macro_attribute]
pub fn server_rpc(attr: TokenStream, item: TokenStream) -> TokenStream {
    finish(expand(attr.into(), item.into()))
}

/// Marks a procedure the server invokes on one client.
///
/// Exactly one `ConnectionHandle` parameter is required; the sender uses it as
/// the destination.
#[proc_macro_attribute]
pub fn client_rpc(attr: TokenStream, item: TokenStream) -> TokenStream {
    finish(expand(attr.into(), item.into()))
}

/// Marks a procedure the server invokes on every connected client.
///
/// `ConnectionHandle` parameters are not allowed.
#[proc_macro_attribute]
pub fn multi_rpc(attr: TokenStream, item: TokenStream) -> TokenStream {
    finish(expand(attr.into(), item.into()))
}

fn finish(result: syn::Result<TokenStream2>) -> TokenStream {
    match result {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed marker arguments: nothing, a mode, or `send = <mode>`.
struct MarkerArgs {
    #[cfg_attr(not(test), allow(dead_code))]
    mode: Option<Ident>,
}

impl Parse for MarkerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(Self { mode: None });
        }

        if input.peek(Ident) && input.peek2(Token![=]) {
            let key: Ident = input.parse()?;
            if key != "send" {
                return Err(syn::Error::new(key.span(), "expected `send = Reliable` or `send = Unreliable`"));
            }
            input.parse::<Token![=]>()?;
        }

        let path: Path = input.parse()?;
        if !input.is_empty() {
            return Err(input.error("unexpected tokens after send mode"));
        }

        let Some(last) = path.segments.last() else {
            return Err(syn::Error::new_spanned(&path, "expected a send mode"));
        };
        if last.ident != "Reliable" && last.ident != "Unreliable" {
            return Err(syn::Error::new_spanned(&path, "send mode must be `Reliable` or `Unreliable`"));
        }

        Ok(Self { mode: Some(last.ident.clone()) })
    }
}

fn expand(attr: TokenStream2, item: TokenStream2) -> syn::Result<TokenStream2> {
    let _args: MarkerArgs = syn::parse2(attr)?;
    let mut func: ItemFn = syn::parse2(item)
        .map_err(|e| syn::Error::new(e.span(), "rpc markers can only be applied to functions"))?;

    if let Some(other) = func.attrs.iter().find(|a| is_marker(a.path())) {
        return Err(syn::Error::new_spanned(other, "a procedure may carry only one rpc marker"));
    }

    for input in func.sig.inputs.iter_mut() {
        if let FnArg::Typed(pat) = input {
            pat.attrs.retain(|a| !a.path().is_ident(DEFAULT_VALUE));
        }
    }

    Ok(quote! { #func })
}

fn is_marker(path: &Path) -> bool {
    path.segments
        .last()
        .map(|s| MARKERS.iter().any(|m| s.ident == m))
        .unwrap_or(false)
}
