use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, FnArg, GenericArgument, GenericParam, ItemFn, Pat, PathArguments, ReturnType, Type};

mod attributes;

use attributes::{parse_attributes, MemoizeAttributes};

/// Largest number of id components (arguments, `self` and generic
/// parameters) a memoized function can take.
const MAX_COMPONENTS: usize = 12;

/// Returns `T` if `ty` is `Result<T, ..>` (under any path).
fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(ok) => Some(ok),
        _ => None,
    }
}

/// Collect the id components: `self` (if any), every argument, then the
/// generic parameters.
///
/// All instantiations of a generic function share one scope, so type
/// parameters enter the key by name and const parameters by value. Methods
/// add the name of `Self` for the same reason.
fn collect_components(item: &ItemFn) -> Result<Vec<TokenStream2>, TokenStream2> {
    let mut components = Vec::new();
    let mut has_receiver = false;
    for arg in item.sig.inputs.iter() {
        match arg {
            FnArg::Receiver(_) => {
                has_receiver = true;
                components.push(quote! { &self });
            }
            FnArg::Typed(pat_type) => match &*pat_type.pat {
                Pat::Ident(pat_ident) => {
                    let ident = &pat_ident.ident;
                    components.push(quote! { &#ident });
                }
                _ => {
                    return Err(quote! {
                        compile_error!("#[memoize] requires plain identifier arguments")
                    })
                }
            },
        }
    }

    if has_receiver {
        components.push(quote! { &::std::any::type_name::<Self>() });
    }
    for param in item.sig.generics.params.iter() {
        match param {
            GenericParam::Type(ty) => {
                let ident = &ty.ident;
                components.push(quote! { &::std::any::type_name::<#ident>() });
            }
            GenericParam::Const(konst) => {
                let ident = &konst.ident;
                components.push(quote! { &#ident });
            }
            GenericParam::Lifetime(_) => {}
        }
    }

    if components.len() > MAX_COMPONENTS {
        return Err(quote! {
            compile_error!("#[memoize] supports at most 12 arguments, counting `self` and generic parameters")
        });
    }
    Ok(components)
}

/// Generate the body of a memoized function
fn generate_body(item: &ItemFn, attrs: &MemoizeAttributes, components: &[TokenStream2]) -> TokenStream2 {
    let sig = &item.sig;
    let block = &item.block;
    let is_async = sig.asyncness.is_some();

    let ret_type = match &sig.output {
        ReturnType::Type(_, ty) => quote! { #ty },
        ReturnType::Default => quote! { () },
    };
    let ok_type = match &sig.output {
        ReturnType::Type(_, ty) => result_ok_type(ty),
        ReturnType::Default => None,
    };

    let scope_name = match &attrs.custom_name {
        Some(name) => quote! { #name },
        None => {
            let fn_name = sig.ident.to_string();
            quote! { concat!(module_path!(), "::", #fn_name) }
        }
    };

    let max_age = attrs
        .max_age_ms
        .map(|ms| quote! { .max_age_ms(#ms) })
        .unwrap_or_default();
    let set_options = quote! { ::memoizer::SetOptions::new().deferred(#is_async) #max_age };

    let unwrap_hit = if is_async {
        quote! { __hit.await }
    } else {
        quote! { __hit.into_value() }
    };

    // `Result` returns cache the `Ok` value only
    let (cached_type, hit_expr, store_stmt) = match ok_type {
        Some(ok) => (
            quote! { #ok },
            quote! { Ok(#unwrap_hit) },
            quote! {
                if let Ok(__value) = &__result {
                    __memoizer.set_keyed(&*__SCOPE, __key, Some(__value.clone()), #set_options);
                }
            },
        ),
        None => (
            ret_type.clone(),
            unwrap_hit,
            quote! {
                __memoizer.set_keyed(&*__SCOPE, __key, Some(__result.clone()), #set_options);
            },
        ),
    };

    let compute = if is_async {
        quote! { let __result: #ret_type = async move #block.await; }
    } else {
        quote! { let __result: #ret_type = (move || -> #ret_type #block)(); }
    };

    quote! {
        static __SCOPE: ::memoizer::__private::Lazy<::memoizer::Scope> =
            ::memoizer::__private::Lazy::new(|| ::memoizer::Scope::registered(#scope_name));

        let __memoizer = ::memoizer::Memoizer::global();
        let __key = ::memoizer::__private::derive_key_or_warn(&*__SCOPE, &(#(#components,)*));

        if let Some(__key) = &__key {
            match __memoizer.get_keyed::<#cached_type>(&*__SCOPE, __key) {
                Ok(Some(__hit)) => return #hit_expr,
                Ok(None) => {}
                Err(__err) => ::memoizer::__private::tracing::warn!(
                    scope = %*__SCOPE,
                    error = %__err,
                    "cached value unusable, recomputing"
                ),
            }
        }

        #compute

        if let Some(__key) = __key {
            #store_stmt
        }
        __result
    }
}

/// A procedural macro that memoizes a function or method in the process-wide
/// cache.
///
/// Every call derives a cache key from its arguments (and `self` for
/// methods) and returns the cached result when there is one. Otherwise the
/// body runs and its result is stored.
///
/// # Requirements
///
/// - **Arguments**: Must implement `serde::Serialize` and use plain identifier patterns
/// - **Return type**: Must implement `Clone + Send + Sync + 'static`
/// - **Function purity**: For correct behavior, the function should be pure
///
/// # Macro Parameters
///
/// - `max_age_ms` (optional): Evict cached results after this many milliseconds.
///   Zero or negative values mean "never", as does leaving it out.
/// - `name` (optional): Name of the cache scope, used in logs and by
///   `memoizer::clear_named`. Default: the function's module path and
///   name, e.g. `"my_crate::geo::distance"`.
///
/// # Cache Behavior
///
/// - **Regular functions**: All results are cached
/// - **Result-returning functions**: Only `Ok` values are cached, `Err` values are not
/// - **Async functions**: Results are stored as deferred results
/// - **Generic functions**: Each instantiation caches separately
/// - **Unserializable arguments**: The call runs uncached and a warning is logged
/// - **Clearing**: `memoizer::clear_named(name)` drops the results of one
///   function, `memoizer::clear_all()` drops every memoized result
///
/// # Examples
///
/// ```ignore
/// use memoizer::memoize;
///
/// #[memoize(max_age_ms = 60_000)]
/// fn fetch_user(id: u32) -> Result<User, ApiError> {
///     api::get_user(id)
/// }
///
/// #[memoize(name = "exchange_rates")]
/// async fn rates(base: String) -> Vec<Rate> {
///     api::rates(&base).await
/// }
/// ```
#[proc_macro_attribute]
pub fn memoize(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attributes(attr.into()) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };

    let input = parse_macro_input!(item as ItemFn);
    let components = match collect_components(&input) {
        Ok(components) => components,
        Err(err) => return err.into(),
    };

    let fn_attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = generate_body(&input, &attrs, &components);

    let expanded = quote! {
        #(#fn_attrs)*
        #vis #sig {
            #body
        }
    };

    TokenStream::from(expanded)
}
