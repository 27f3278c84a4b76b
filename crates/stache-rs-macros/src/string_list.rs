//! A list of string literals in a `#[stache(...)]` attribute.
//!
//! Accepts `methods("a", "b")` and `methods = ["a", "b"]`.

use darling::ast::NestedMeta;
use darling::FromMeta;

#[derive(Debug, Clone, Default)]
pub struct StringList(pub Vec<String>);

fn lit_str(lit: &syn::Lit) -> darling::Result<String> {
    match lit {
        syn::Lit::Str(s) => Ok(s.value()),
        other => Err(darling::Error::unexpected_lit_type(other)),
    }
}

impl FromMeta for StringList {
    fn from_list(items: &[NestedMeta]) -> darling::Result<Self> {
        let mut errors = darling::Error::accumulator();
        let values = items
            .iter()
            .filter_map(|item| {
                errors.handle(match item {
                    NestedMeta::Lit(lit) => lit_str(lit),
                    NestedMeta::Meta(meta) => {
                        Err(darling::Error::unexpected_type("path").with_span(meta))
                    }
                })
            })
            .collect();
        errors.finish_with(Self(values))
    }

    fn from_expr(expr: &syn::Expr) -> darling::Result<Self> {
        let syn::Expr::Array(array) = expr else {
            return Err(darling::Error::unexpected_expr_type(expr));
        };
        array
            .elems
            .iter()
            .map(|elem| match elem {
                syn::Expr::Lit(syn::ExprLit { lit, .. }) => lit_str(lit),
                other => Err(darling::Error::unexpected_expr_type(other)),
            })
            .collect::<darling::Result<Vec<_>>>()
            .map(Self)
    }
}
