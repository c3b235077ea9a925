use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Ident};

pub fn derive_state_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

enum Strategy {
    Replace,
    Append,
    Merge,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let update_name = format_ident!("{}Update", name);
    let vis = &input.vis;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "State can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "State can only be derived for structs",
            ))
        }
    };

    let mut update_variants = vec![];
    let mut update_match_arms = vec![];
    let mut messages_field: Option<Ident> = None;
    let mut memory_field: Option<Ident> = None;

    for field in fields {
        let field_name = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let field_type = &field.ty;

        let is_messages = field.attrs.iter().any(|a| a.path().is_ident("messages"));
        let is_memory = field.attrs.iter().any(|a| a.path().is_ident("tool_memory"));

        if is_messages {
            if messages_field.is_some() {
                return Err(syn::Error::new(field.span(), "only one #[messages] field is allowed"));
            }
            messages_field = Some(field_name.clone());
        }
        if is_memory {
            if memory_field.is_some() {
                return Err(syn::Error::new(field.span(), "only one #[tool_memory] field is allowed"));
            }
            memory_field = Some(field_name.clone());
        }

        // Message channels grow unless told otherwise.
        let mut strategy = if is_messages { Strategy::Append } else { Strategy::Replace };
        if let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("update")) {
            let ident: Ident = attr.parse_args()?;
            strategy = match ident.to_string().as_str() {
                "replace" => Strategy::Replace,
                "append" => Strategy::Append,
                "merge" => Strategy::Merge,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown update strategy `{}`, expected replace, append or merge", other),
                    ))
                }
            };
        }

        let variant_name = format_ident!("{}", field_name.to_string().to_case(Case::Pascal));
        update_variants.push(quote! {
            #variant_name(#field_type)
        });

        let update_impl = match strategy {
            Strategy::Append => quote! { self.#field_name.extend(value) },
            Strategy::Merge => quote! {
                ::graphloop_core::types::MergeField::merge_from(&mut self.#field_name, value)
            },
            Strategy::Replace => quote! { self.#field_name = value },
        };

        update_match_arms.push(quote! {
            #update_name::#variant_name(value) => { #update_impl }
        });
    }

    if memory_field.is_some() && messages_field.is_none() {
        return Err(syn::Error::new(
            name.span(),
            "#[tool_memory] requires a #[messages] field",
        ));
    }

    let message_state = messages_field.map(|messages| {
        let memory = memory_field.map(|memory| {
            quote! {
                fn tool_memory(&mut self) -> ::std::option::Option<&mut ::graphloop_core::tool::ToolMemory> {
                    ::std::option::Option::Some(&mut self.#memory)
                }
            }
        });

        quote! {
            impl ::graphloop_core::types::MessageState for #name {
                fn messages(&self) -> &[::graphloop_core::types::Message] {
                    &self.#messages
                }

                fn append_messages(&mut self, messages: ::std::vec::Vec<::graphloop_core::types::Message>) {
                    self.#messages.extend(messages)
                }

                #memory
            }
        }
    });

    Ok(quote! {
        #[derive(Debug)]
        #vis enum #update_name {
            #(#update_variants),*
        }

        impl ::graphloop_core::types::GraphState for #name {
            type Update = #update_name;

            fn apply(&mut self, update: Self::Update) {
                match update {
                    #(#update_match_arms),*
                }
            }
        }

        #message_state
    })
}
