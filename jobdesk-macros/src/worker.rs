//! `#[worker]`: impl block to build-time manifest entry.

use crate::job_attr::{find_job_name, result_parts, strip_job_attrs};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, ReturnType, Type, parse_macro_input};

/// Generated pieces for one `#[job]` method.
struct ProvidedFn {
    items: TokenStream2,
    entry: TokenStream2,
}

fn provided_fn(self_ty: &Type, method: &ImplItemFn, job_name: &syn::LitStr) -> syn::Result<ProvidedFn> {
    let sig = &method.sig;
    let name = &sig.ident;

    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "worker methods cannot be generic",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "worker methods must be synchronous",
        ));
    }

    let mut receiver = None;
    let mut params = Vec::new();
    let mut extraction = Vec::new();
    let mut arg_names = Vec::new();
    for input in &sig.inputs {
        match input {
            FnArg::Receiver(recv) => receiver = Some(recv.mutability.is_some()),
            FnArg::Typed(pat_type) => {
                let ty = &pat_type.ty;
                let index = params.len();
                let arg = format_ident!("__arg_{}", index);
                params.push(quote! { ::jobdesk::TypeShape::of::<#ty>() });
                extraction.push(quote! {
                    let #arg: #ty = __args.get::<#ty>(#index)?;
                });
                arg_names.push(arg);
            }
        }
    }

    let (output, fallible) = match &sig.output {
        ReturnType::Default => (quote! { () }, false),
        ReturnType::Type(_, ty) => match result_parts(ty) {
            Some((ok, _)) => (quote! { #ok }, true),
            None => (quote! { #ty }, false),
        },
    };

    let call = match receiver {
        Some(true) => quote! {
            let mut __worker = <#self_ty as ::core::default::Default>::default();
            let __value = __worker.#name(#(#arg_names),*);
        },
        Some(false) => quote! {
            let __worker = <#self_ty as ::core::default::Default>::default();
            let __value = __worker.#name(#(#arg_names),*);
        },
        None => quote! {
            let __value = <#self_ty>::#name(#(#arg_names),*);
        },
    };
    let unwrap = fallible.then(|| {
        quote! {
            let __value = __value.map_err(::core::convert::Into::<::jobdesk::BoxError>::into)?;
        }
    });

    let invoke = format_ident!("__jobdesk_invoke_{}", name);
    let signature = format_ident!("__jobdesk_signature_{}", name);
    let name_str = name.to_string();

    Ok(ProvidedFn {
        items: quote! {
            fn #signature() -> ::jobdesk::Signature {
                ::jobdesk::Signature::new(
                    ::std::vec![#(#params),*],
                    ::jobdesk::TypeShape::of::<#output>(),
                )
            }

            fn #invoke(
                __args: &::jobdesk::JobArgs,
            ) -> ::core::result::Result<::jobdesk::JobValue, ::jobdesk::BoxError> {
                #(#extraction)*
                #call
                #unwrap
                ::core::result::Result::Ok(::std::boxed::Box::new(__value))
            }
        },
        entry: quote! {
            ::jobdesk::discovery::ProvidedMethod {
                name: #name_str,
                job_name: #job_name,
                attributes: &[::jobdesk::discovery::Attribute {
                    name: ::jobdesk::discovery::JOB_ATTRIBUTE,
                    value: #job_name,
                }],
                signature: #signature,
                invoke: #invoke,
            }
        },
    })
}

/// Implementation of the `#[worker]` attribute macro.
pub(crate) fn worker_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[worker] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let input = parse_macro_input!(item as ItemImpl);

    match expand(input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(mut input: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[worker] goes on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "worker types cannot be generic",
        ));
    }
    let self_ty = (*input.self_ty).clone();
    let type_ident = match &self_ty {
        Type::Path(path) => match path.path.segments.last() {
            Some(last) => last.ident.clone(),
            None => return Err(syn::Error::new_spanned(&self_ty, "expected a type name")),
        },
        other => return Err(syn::Error::new_spanned(other, "expected a type name")),
    };

    let mut provided = Vec::new();
    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            if let Some(job_name) = find_job_name(&method.attrs)? {
                provided.push(provided_fn(&self_ty, method, &job_name)?);
            }
        }
    }
    if provided.is_empty() {
        return Err(syn::Error::new_spanned(
            &self_ty,
            "a worker needs at least one #[job(\"name\")] method",
        ));
    }

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            strip_job_attrs(&mut method.attrs);
        }
    }

    let items = provided.iter().map(|p| &p.items);
    let entries = provided.iter().map(|p| &p.entry);

    Ok(quote! {
        #input

        const _: () = {
            #(#items)*

            ::jobdesk::inventory::submit! {
                ::jobdesk::discovery::ProviderRegistration {
                    type_name: ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#type_ident)),
                    attributes: &[::jobdesk::discovery::Attribute {
                        name: ::jobdesk::discovery::WORKER_ATTRIBUTE,
                        value: "",
                    }],
                    methods: &[#(#entries),*],
                }
            }
        };
    })
}
