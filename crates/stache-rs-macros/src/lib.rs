//! # stache-rs-macros
//!
//! Procedural macros for stache-rs. Provides `#[derive(Object)]`, which lets
//! templates read a struct's fields and methods by name.
//!
//! This crate does not depend on the other stache-rs crates because
//! proc-macro crates cannot depend on crates that use them. Generated code
//! refers to `::stache_rs_template` unless `#[stache(crate = "...")]` says
//! otherwise.

mod object;
mod string_list;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `stache_rs_template::value::Object` for a struct with named fields.
///
/// A name is resolved, in order, to:
///
/// 1. a method listed in `#[stache(methods(...))]`,
/// 2. a listed `get_<name>` or `is_<name>` method,
/// 3. a field called `name` (see `rename` and `skip`),
/// 4. a member of a `#[stache(flatten)]` field, in declaration order.
///
/// Field types and method results must implement `ToValue`. The struct
/// must be `Clone` and `Debug`.
///
/// ```
/// use stache_rs_macros::Object;
/// use stache_rs_template::Compiler;
///
/// #[derive(Debug, Clone, Object)]
/// #[stache(methods("get_greeting"))]
/// struct Guest {
///     #[stache(rename = "who")]
///     name: String,
///     #[stache(skip)]
///     token: String,
/// }
///
/// impl Guest {
///     fn get_greeting(&self) -> &'static str {
///         "Hello"
///     }
/// }
///
/// let guest = Guest { name: "Ada".into(), token: "secret".into() };
/// let template = Compiler::default().compile("{{greeting}}, {{who}}!").unwrap();
/// assert_eq!(template.execute(guest.clone()).unwrap(), "Hello, Ada!");
/// assert!(Compiler::default().compile("{{token}}").unwrap().execute(guest).is_err());
/// ```
#[proc_macro_derive(Object, attributes(stache))]
pub fn derive_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    object::derive_object_impl(input).into()
}
