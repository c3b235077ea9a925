use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    token::Comma,
    Error, Expr, FnArg, ImplItem, ImplItemFn, Item, ItemImpl, Lit, MetaNameValue, ReturnType,
    Type,
};

/// Comma-separated `method = "description"` pairs
struct ToolsAttribute {
    name_values: Punctuated<MetaNameValue, Comma>,
}

impl Parse for ToolsAttribute {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name_values = Punctuated::<MetaNameValue, Comma>::parse_terminated(input)?;
        Ok(Self { name_values })
    }
}

/// One method exposed as a tool
struct ToolMethod<'a> {
    method: &'a ImplItemFn,
    params_ty: Type,
    success_ty: Type,
    is_result: bool,
    takes_memory: bool,
}

pub fn tools_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let tool_map = match parse_tools_map(attr.into()) {
        Ok(map) => map,
        Err(err) => return err.to_compile_error().into(),
    };

    let item_impl = match syn::parse_macro_input!(item as Item) {
        Item::Impl(item_impl) => item_impl,
        other => {
            return Error::new_spanned(other, "#[tools(...)] can only be applied to an impl block")
                .to_compile_error()
                .into();
        }
    };

    let expansions = tool_map
        .iter()
        .map(|(method_name, description)| {
            expand_tool(&item_impl, method_name, description)
                .unwrap_or_else(|err| err.to_compile_error())
        })
        .collect::<Vec<_>>();

    quote! {
        #item_impl
        #(#expansions)*
    }
    .into()
}

fn expand_tool(item_impl: &ItemImpl, method_name: &str, description: &str) -> syn::Result<TokenStream2> {
    let method = find_method_by_name(&item_impl.items, method_name).ok_or_else(|| {
        Error::new_spanned(
            &item_impl.self_ty,
            format!("method `{}` not found in impl block", method_name),
        )
    })?;
    let tool = parse_signature(method)?;

    let tool_type = &*item_impl.self_ty;
    let struct_name = syn::Ident::new(
        &format!(
            "{}{}",
            type_to_ident_str(tool_type),
            method_name.to_case(Case::Pascal)
        ),
        method.sig.ident.span(),
    );
    let method_ident = &tool.method.sig.ident;
    let params_ty = &tool.params_ty;
    let success_ty = &tool.success_ty;

    let mut call = if tool.takes_memory {
        quote! { self.0.#method_ident(params, memory) }
    } else {
        quote! { self.0.#method_ident(params) }
    };
    if tool.method.sig.asyncness.is_some() {
        call = quote! { #call.await };
    }
    let body = if tool.is_result {
        quote! { ::std::result::Result::Ok(#call?) }
    } else {
        quote! { ::std::result::Result::Ok(#call) }
    };

    Ok(quote! {
        /// Tool wrapper generated by `#[tools]`
        pub struct #struct_name(pub #tool_type);

        #[::graphloop_core::async_trait]
        impl ::graphloop_core::tool::ToolFunction for #struct_name {
            type Params = #params_ty;
            type Response = #success_ty;

            fn name() -> &'static str { #method_name }
            fn description() -> &'static str { #description }

            #[allow(unused_variables)]
            async fn execute(
                &self,
                params: Self::Params,
                memory: &mut ::graphloop_core::tool::ToolMemory,
            ) -> ::std::result::Result<Self::Response, ::graphloop_core::types::ToolError> {
                #body
            }
        }
    })
}

fn parse_tools_map(attr: TokenStream2) -> syn::Result<Vec<(String, String)>> {
    let parsed = syn::parse2::<ToolsAttribute>(attr)?;

    let mut result = Vec::new();
    for nv in parsed.name_values {
        let ident = nv
            .path
            .get_ident()
            .ok_or_else(|| Error::new_spanned(&nv.path, "expected a method name on the left side"))?
            .to_string();

        match &nv.value {
            Expr::Lit(expr_lit) => match &expr_lit.lit {
                Lit::Str(s) => result.push((ident, s.value())),
                _ => return Err(Error::new_spanned(&nv.value, "expected a string description")),
            },
            _ => return Err(Error::new_spanned(&nv.value, "expected a string description")),
        }
    }
    Ok(result)
}

fn find_method_by_name<'a>(items: &'a [ImplItem], name: &str) -> Option<&'a ImplItemFn> {
    items.iter().find_map(|item| match item {
        ImplItem::Fn(m) if m.sig.ident == name => Some(m),
        _ => None,
    })
}

/// Accepts `fn(&self, params: P) -> R` and `fn(&self, params: P, memory: &mut ToolMemory) -> R`,
/// where `R` is either the response type or `Result<Response, E>`.
fn parse_signature(method: &ImplItemFn) -> syn::Result<ToolMethod<'_>> {
    let typed: Vec<&Type> = method
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => Some(&*pat_type.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();

    let params_ty = match typed.as_slice() {
        [params] | [params, _] => (*params).clone(),
        _ => {
            return Err(Error::new_spanned(
                &method.sig,
                "tool methods take `params` and optionally `memory: &mut ToolMemory`",
            ))
        }
    };
    let takes_memory = typed.len() == 2;
    if takes_memory && !is_memory_ref(typed[1]) {
        return Err(Error::new_spanned(
            typed[1],
            "the second tool argument must be `&mut ToolMemory`",
        ));
    }

    let return_ty = match &method.sig.output {
        ReturnType::Default => {
            return Err(Error::new_spanned(
                &method.sig,
                "tool methods must return a value or a Result",
            ))
        }
        ReturnType::Type(_, ty) => (**ty).clone(),
    };
    let (success_ty, is_result) = parse_success_type(return_ty);

    Ok(ToolMethod {
        method,
        params_ty,
        success_ty,
        is_result,
        takes_memory,
    })
}

fn is_memory_ref(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) if reference.mutability.is_some() => match &*reference.elem {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|seg| seg.ident == "ToolMemory")
                .unwrap_or(false),
            _ => false,
        },
        _ => false,
    }
}

/// `Result<T, E>` yields `(T, true)`, anything else `(ty, false)`
fn parse_success_type(ty: Type) -> (Type, bool) {
    if let Type::Path(type_path) = &ty {
        if let Some(last) = type_path.path.segments.last() {
            if last.ident == "Result" {
                if let syn::PathArguments::AngleBracketed(args) = &last.arguments {
                    if let Some(syn::GenericArgument::Type(success)) = args.args.first() {
                        return (success.clone(), true);
                    }
                }
            }
        }
    }
    (ty, false)
}

fn type_to_ident_str(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
