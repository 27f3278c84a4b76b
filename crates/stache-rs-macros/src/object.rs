//! `#[derive(Object)]` implementation.
//!
//! Generates an `Object` impl whose `fetcher` resolves a name, in order, to
//! a declared method, a `get_`/`is_` method alias, a field, and then a
//! member of each `#[stache(flatten)]` field, searched per instance. Also
//! generates `ToValue` and `From<Self> for Value`, which wrap the struct as
//! an object value.

use std::collections::HashSet;

use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::DeriveInput;

use crate::string_list::StringList;

/// Struct-level attributes from `#[stache(...)]`.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(stache), supports(struct_named))]
pub struct ObjectOpts {
    pub ident: syn::Ident,
    pub generics: syn::Generics,
    pub data: darling::ast::Data<(), ObjectFieldOpts>,

    /// Zero-argument methods readable from templates.
    #[darling(default)]
    pub methods: Option<StringList>,

    /// Path to the template crate when it is only reachable through a
    /// re-export, e.g. `crate = "stache_rs::template"`.
    #[darling(default, rename = "crate")]
    pub crate_path: Option<syn::Path>,
}

/// Per-field attributes from `#[stache(...)]`.
#[derive(Debug, FromField)]
#[darling(attributes(stache))]
pub struct ObjectFieldOpts {
    pub ident: Option<syn::Ident>,

    /// The name templates use for this field.
    #[darling(default)]
    pub rename: Option<String>,

    /// Hide the field from templates.
    #[darling(default)]
    pub skip: bool,

    /// Resolve names that nothing else matches against this field's value.
    #[darling(default)]
    pub flatten: bool,
}

/// Generates the `Object`, `ToValue`, and `From` impls for the struct.
pub fn derive_object_impl(input: DeriveInput) -> TokenStream {
    let opts = match ObjectOpts::from_derive_input(&input) {
        Ok(o) => o,
        Err(e) => return e.write_errors(),
    };

    if !opts.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &opts.generics,
            "#[derive(Object)] does not support generic structs",
        )
        .to_compile_error();
    }

    match expand(&opts) {
        Ok(tokens) => tokens,
        Err(e) => e.write_errors(),
    }
}

fn expand(opts: &ObjectOpts) -> darling::Result<TokenStream> {
    let struct_name = &opts.ident;
    let krate: syn::Path = opts
        .crate_path
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::stache_rs_template));
    let fields = opts
        .data
        .as_ref()
        .take_struct()
        .map(|s| s.fields)
        .unwrap_or_default();

    let mut errors = darling::Error::accumulator();
    let methods: Vec<(String, syn::Ident)> = opts
        .methods
        .iter()
        .flat_map(|list| list.0.iter())
        .filter_map(|name| errors.handle(method_ident(name)))
        .collect();

    // Earlier keys win; later duplicates would be unreachable match arms.
    let mut seen = HashSet::new();
    let mut arms = Vec::new();

    for (name, method) in &methods {
        if seen.insert(name.clone()) {
            arms.push(accessor_arm(&krate, name, &quote! { o.#method() }));
        }
    }
    for (name, method) in &methods {
        let alias = name
            .strip_prefix("get_")
            .or_else(|| name.strip_prefix("is_"))
            .filter(|alias| !alias.is_empty());
        if let Some(alias) = alias {
            if seen.insert(alias.to_string()) {
                arms.push(accessor_arm(&krate, alias, &quote! { o.#method() }));
            }
        }
    }

    let mut flattened = Vec::new();
    for field in &fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        if field.skip {
            continue;
        }
        if field.flatten {
            flattened.push(ident);
            continue;
        }
        let name = field
            .rename
            .clone()
            .unwrap_or_else(|| ident.unraw().to_string());
        if seen.insert(name.clone()) {
            arms.push(accessor_arm(&krate, &name, &quote! { o.#ident }));
        }
    }

    errors.finish()?;

    // One fetcher per type: it has to answer for every instance, so the
    // embedded values are searched when the fetcher runs, not here.
    let fallback = if flattened.is_empty() {
        quote! { ::core::option::Option::None }
    } else {
        let projections = flattened.iter().map(|ident| {
            quote! {
                (|o: &Self| #krate::value::ToValue::to_value(&o.#ident)) as fn(&Self) -> #krate::value::Value
            }
        });
        quote! {
            ::core::option::Option::Some(#krate::collector::flatten_fetcher::<Self>(
                ::std::vec![#(#projections),*],
            ))
        }
    };

    Ok(quote! {
        impl #krate::value::Object for #struct_name {
            fn fetcher(
                &self,
                name: &str,
            ) -> ::core::option::Option<::std::sync::Arc<dyn #krate::collector::VariableFetcher>> {
                match name {
                    #(#arms)*
                    _ => {}
                }
                #fallback
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }

        impl #krate::value::ToValue for #struct_name {
            fn to_value(&self) -> #krate::value::Value {
                #krate::value::Value::object(::core::clone::Clone::clone(self))
            }
        }

        impl ::core::convert::From<#struct_name> for #krate::value::Value {
            fn from(object: #struct_name) -> Self {
                #krate::value::Value::object(object)
            }
        }
    })
}

fn method_ident(name: &str) -> darling::Result<(String, syn::Ident)> {
    syn::parse_str::<syn::Ident>(name)
        .map(|ident| (name.to_string(), ident))
        .map_err(|_| darling::Error::custom(format!("`{name}` is not a method name")))
}

/// A match arm returning a typed fetcher that reads `access` from `o`.
fn accessor_arm(krate: &syn::Path, name: &str, access: &TokenStream) -> TokenStream {
    quote! {
        #name => {
            return ::core::option::Option::Some(#krate::collector::object_fetcher::<Self>(
                |o| #krate::value::ToValue::to_value(&#access),
            ));
        }
    }
}
