use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Ident, parse_macro_input};

/// A hook name accepted inside `#[lifecycle(...)]`, with the tokens it expands to.
///
/// Hooks without an accessor are dispatched on the concrete type (see `run_start`).
struct Hook {
    flag: &'static str,
    accessor: Option<&'static str>,
    capability: &'static str,
}

const HOOKS: &[(&str, Hook)] = &[
    (
        "init",
        Hook {
            flag: "INIT",
            accessor: Some("as_on_init"),
            capability: "OnInit",
        },
    ),
    (
        "start",
        Hook {
            flag: "START",
            accessor: None,
            capability: "OnStart",
        },
    ),
    (
        "render",
        Hook {
            flag: "RENDER",
            accessor: Some("as_on_render"),
            capability: "OnRender",
        },
    ),
    (
        "heartbeat",
        Hook {
            flag: "HEARTBEAT",
            accessor: Some("as_on_heartbeat"),
            capability: "OnHeartbeat",
        },
    ),
    (
        "end",
        Hook {
            flag: "END",
            accessor: Some("as_on_end"),
            capability: "OnEnd",
        },
    ),
];

pub fn derive_lifecycle(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match expand(&ast) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mut hooks: Vec<&Hook> = Vec::new();
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("lifecycle")) {
        attr.parse_nested_meta(|meta| {
            let Some((_, hook)) = HOOKS.iter().find(|(name, _)| meta.path.is_ident(name)) else {
                return Err(meta.error(
                    "unknown lifecycle hook, expected one of: init, start, render, heartbeat, end",
                ));
            };
            if hooks.iter().any(|h| h.flag == hook.flag) {
                return Err(meta.error("lifecycle hook listed more than once"));
            }
            hooks.push(hook);
            Ok(())
        })?;
    }

    let flags = hooks.iter().map(|hook| {
        let flag = Ident::new(hook.flag, proc_macro2::Span::call_site());
        quote! { | ::comet::core::Capabilities::#flag }
    });

    // Use ::comet paths which work both inside and outside the crate.
    // Inside the crate, this works because of `extern crate self as comet;` in lib.rs
    let accessors = hooks.iter().map(|hook| {
        let capability = Ident::new(hook.capability, proc_macro2::Span::call_site());
        match hook.accessor {
            Some(accessor) => {
                let accessor = Ident::new(accessor, proc_macro2::Span::call_site());
                quote! {
                    fn #accessor(&mut self) -> ::core::option::Option<&mut dyn ::comet::core::#capability> {
                        ::core::option::Option::Some(self)
                    }
                }
            }
            None => quote! {
                fn run_start(
                    this: ::comet::core::SystemRef<Self>,
                    cancel: ::comet::core::CancelToken,
                ) -> ::comet::anyhow::Result<()>
                where
                    Self: ::core::marker::Sized,
                {
                    <Self as ::comet::core::#capability>::on_start(this, cancel)
                }
            },
        }
    });

    Ok(quote! {
        impl #impl_generics ::comet::core::Lifecycle for #struct_name #ty_generics #where_clause {
            fn capabilities(&self) -> ::comet::core::Capabilities {
                ::comet::core::Capabilities::empty() #(#flags)*
            }

            #(#accessors)*
        }
    })
}
