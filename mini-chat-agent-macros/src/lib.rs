use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, AttributeArgs, ItemFn, NestedMeta, Meta, Lit, Pat, FnArg, Type, ReturnType,
};
use proc_macro_crate::{crate_name, FoundCrate};

/// Resolve host crate path (equivalent to `$crate`)
///
/// The host crate declares `extern crate self as mini_chat_agent;`, so
/// `::mini_chat_agent` resolves both inside it and in its tests and demos.
fn host_crate() -> proc_macro2::TokenStream {
    match crate_name("mini-chat-agent") {
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) | Err(_) => quote!(::mini_chat_agent),
    }
}

/// Turn a free function taking one `String` into a `Tool`.
///
/// ```ignore
/// #[tool(name = "weather", description = "Get current weather for a city")]
/// async fn weather(city: String) -> anyhow::Result<String> { ... }
/// // generates `pub struct WeatherTool;`
/// ```
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttributeArgs);
    let input_fn = parse_macro_input!(item as ItemFn);

    let mut name_override = None;
    let mut description = None;

    for nested in args {
        if let NestedMeta::Meta(Meta::NameValue(nv)) = nested {
            if let (Some(ident), Lit::Str(s)) = (nv.path.get_ident(), &nv.lit) {
                match ident.to_string().as_str() {
                    "name" => name_override = Some(s.value()),
                    "description" => description = Some(s.value()),
                    other => {
                        return syn::Error::new_spanned(
                            ident,
                            format!("unknown tool attribute `{}`", other),
                        )
                        .to_compile_error()
                        .into();
                    }
                }
            }
        }
    }

    let description = match description {
        Some(d) if !d.trim().is_empty() => d,
        _ => {
            return syn::Error::new_spanned(
                &input_fn.sig.ident,
                "tool requires a non-empty `description = \"...\"`",
            )
            .to_compile_error()
            .into();
        }
    };

    let fn_ident = input_fn.sig.ident.clone();
    let fn_name = fn_ident.to_string();
    let tool_name = name_override.unwrap_or(fn_name.clone());

    if input_fn.sig.inputs.len() != 1 {
        return syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "tool functions take exactly one `String` input",
        )
        .to_compile_error()
        .into();
    }
    match &input_fn.sig.inputs[0] {
        FnArg::Typed(pt) => {
            if !matches!(&*pt.pat, Pat::Ident(_)) {
                return syn::Error::new_spanned(
                    &pt.pat,
                    "only simple identifiers are supported",
                )
                .to_compile_error()
                .into();
            }
            if last_segment(&pt.ty).as_deref() != Some("String") {
                return syn::Error::new_spanned(
                    &pt.ty,
                    "the tool input must be a `String`",
                )
                .to_compile_error()
                .into();
            }
        }
        FnArg::Receiver(recv) => {
            return syn::Error::new_spanned(
                recv,
                "methods with self are not supported",
            )
            .to_compile_error()
            .into();
        }
    }

    let tool_struct_ident =
        syn::Ident::new(&format!("{}Tool", pascal_case(&fn_name)), fn_ident.span());

    let host = host_crate();

    let returns_result = match &input_fn.sig.output {
        ReturnType::Type(_, ty) => last_segment(ty).as_deref() == Some("Result"),
        ReturnType::Default => false,
    };
    let call = if input_fn.sig.asyncness.is_some() {
        quote!(#fn_ident(input.to_string()).await)
    } else {
        quote!(#fn_ident(input.to_string()))
    };
    let run_body = if returns_result {
        quote!(Ok(#call?))
    } else {
        quote!(Ok(#call))
    };

    let expanded = quote! {
        #input_fn

        pub struct #tool_struct_ident;

        #[#host::async_trait::async_trait]
        impl #host::tools::traits::Tool for #tool_struct_ident {
            fn name(&self) -> &str { #tool_name }
            fn description(&self) -> &str { #description }
            async fn run(
                &self,
                input: &str,
                _cancel: #host::CancellationToken,
            ) -> #host::anyhow::Result<String> {
                #run_body
            }
        }
    };

    TokenStream::from(expanded)
}

fn pascal_case(s: &str) -> String {
    s.split('_')
        .map(|p| {
            let mut c = p.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}
