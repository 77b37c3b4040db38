//! Parsing of `#[memoize(...)]` arguments.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{punctuated::Punctuated, Expr, Lit, MetaNameValue, Token};

/// Parsed macro attributes
#[derive(Default)]
pub struct MemoizeAttributes {
    pub max_age_ms: Option<i64>,
    pub custom_name: Option<String>,
}

/// Parse the `max_age_ms` attribute
fn parse_max_age_attribute(nv: &MetaNameValue) -> Result<i64, TokenStream2> {
    let negative = matches!(&nv.value, Expr::Unary(unary) if matches!(unary.op, syn::UnOp::Neg(_)));
    let lit = match &nv.value {
        Expr::Lit(expr_lit) => &expr_lit.lit,
        Expr::Unary(unary) if negative => match &*unary.expr {
            Expr::Lit(expr_lit) => &expr_lit.lit,
            _ => return Err(quote! { compile_error!("Invalid literal for `max_age_ms`: expected integer") }),
        },
        _ => {
            return Err(
                quote! { compile_error!("Invalid syntax for `max_age_ms`: expected `max_age_ms = <integer>`") },
            )
        }
    };

    match lit {
        Lit::Int(lit_int) => {
            let val = lit_int.base10_parse::<i64>().map_err(|_| {
                quote! { compile_error!("`max_age_ms` does not fit in an i64") }
            })?;
            Ok(if negative { -val } else { val })
        }
        _ => Err(quote! { compile_error!("Invalid literal for `max_age_ms`: expected integer") }),
    }
}

/// Parse the `name` attribute
fn parse_name_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Ok(s.value()),
            _ => Err(quote! { compile_error!("Invalid literal for `name`: expected string") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `name`: expected `name = \"...\"`") }),
    }
}

/// Parse memoize attributes from a token stream
pub fn parse_attributes(attr: TokenStream2) -> Result<MemoizeAttributes, TokenStream2> {
    use syn::parse::Parser;

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr).map_err(|e| {
        let msg = format!("Failed to parse attributes: {}", e);
        quote! { compile_error!(#msg) }
    })?;

    let mut attrs = MemoizeAttributes::default();

    for nv in parsed_args {
        if nv.path.is_ident("max_age_ms") {
            attrs.max_age_ms = Some(parse_max_age_attribute(&nv)?);
        } else if nv.path.is_ident("name") {
            attrs.custom_name = Some(parse_name_attribute(&nv)?);
        } else {
            return Err(
                quote! { compile_error!("Unknown attribute: expected `max_age_ms` or `name`") },
            );
        }
    }

    Ok(attrs)
}
