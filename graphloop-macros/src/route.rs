use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields};

/// Implements `RouteLabel` for a fieldless enum, listing every variant as the
/// closed label set.
pub fn derive_route_label_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data) = &input.data else {
        return syn::Error::new(name.span(), "RouteLabel can only be derived for enums")
            .to_compile_error()
            .into();
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new(variant.span(), "RouteLabel variants cannot carry data")
                .to_compile_error()
                .into();
        }
        let ident = &variant.ident;
        variants.push(quote! { #name::#ident });
    }

    quote! {
        impl ::graphloop_core::graph::RouteLabel for #name {
            fn all() -> ::std::option::Option<::std::vec::Vec<Self>> {
                ::std::option::Option::Some(::std::vec![#(#variants),*])
            }
        }
    }
    .into()
}
