//! `#[job_offer]`: trait to dispatching client.

use crate::job_attr::{find_job_name, result_parts, strip_job_attrs};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    FnArg, Ident, ItemTrait, LitStr, Pat, ReturnType, Token, TraitItem, TraitItemFn, Type,
    bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// Arguments for the `#[job_offer]` macro.
struct JobOfferArgs {
    namespaces: Vec<LitStr>,
    client: Option<Ident>,
}

impl Parse for JobOfferArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut namespaces = Vec::new();
        let mut client = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "namespaces" => {
                    let content;
                    bracketed!(content in input);
                    let list = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                    namespaces.extend(list);
                }
                "client" => {
                    client = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(JobOfferArgs { namespaces, client })
    }
}

/// Runtime shape of a declared return type.
///
/// `Wrapper<A, B>` becomes a parameterized shape named `Wrapper`; anything
/// else is a concrete shape.
fn shape_of(ty: &Type) -> TokenStream2 {
    if let Type::Path(path) = ty {
        if path.qself.is_none() {
            if let Some(last) = path.path.segments.last() {
                if let syn::PathArguments::AngleBracketed(generics) = &last.arguments {
                    let raw = last.ident.to_string();
                    let args = generics.args.iter().filter_map(|arg| match arg {
                        syn::GenericArgument::Type(ty) => {
                            Some(quote! { ::jobdesk::TypeShape::of::<#ty>() })
                        }
                        _ => None,
                    });
                    return quote! {
                        ::jobdesk::TypeShape::parameterized(#raw, ::std::vec![#(#args),*])
                    };
                }
            }
        }
    }
    quote! { ::jobdesk::TypeShape::of::<#ty>() }
}

/// `module::path::Trait` of the declaring trait, evaluated at the call site.
fn offer_path(trait_name: &Ident) -> TokenStream2 {
    quote! { ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#trait_name)) }
}

/// The forwarding body of one client method.
fn client_method(
    trait_name: &Ident,
    namespaces: &[LitStr],
    method: &TraitItemFn,
) -> syn::Result<TokenStream2> {
    let sig = &method.sig;
    let name = &sig.ident;

    let Some(job_name) = find_job_name(&method.attrs)? else {
        return Err(syn::Error::new_spanned(
            sig,
            "every job offer method needs #[job(\"name\")]",
        ));
    };
    if let Some(body) = &method.default {
        return Err(syn::Error::new_spanned(
            body,
            "job offer methods cannot have a default body",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "job offer methods cannot be generic",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "job offer methods are not async; return a call object instead",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                sig,
                "job offer methods must take `&self`",
            ));
        }
    }

    let mut arg_names = Vec::new();
    let mut params = Vec::new();
    for input in inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new_spanned(input, "unexpected receiver"));
        };
        let Pat::Ident(pat) = &*pat_type.pat else {
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                "job offer parameters must be plain identifiers",
            ));
        };
        let ty = &pat_type.ty;
        arg_names.push(pat.ident.clone());
        params.push(quote! { .param(::jobdesk::TypeShape::of::<#ty>()) });
    }

    let ReturnType::Type(_, output) = &sig.output else {
        return Err(syn::Error::new_spanned(
            sig,
            "job offer methods must return `Result<Shape<T>, E>` where `E: From<JobError>`",
        ));
    };
    let Some((shape, _)) = result_parts(output) else {
        return Err(syn::Error::new_spanned(
            output,
            "job offer methods must return `Result<Shape<T>, E>` where `E: From<JobError>`",
        ));
    };
    let returns = shape_of(shape);

    let offer = offer_path(trait_name);
    let name_str = name.to_string();

    Ok(quote! {
        #sig {
            static METHOD: ::std::sync::LazyLock<::jobdesk::JobMethod> =
                ::std::sync::LazyLock::new(|| {
                    ::jobdesk::JobMethod::new(#offer, #name_str)
                        .job_name(#job_name)
                        .namespaces(&[#(#namespaces),*])
                        #(#params)*
                        .returns(#returns)
                });
            self.dispatcher
                .call::<#shape>(&METHOD, ::jobdesk::job_args![#(#arg_names),*])
                .map_err(::core::convert::Into::into)
        }
    })
}

/// Implementation of the `#[job_offer]` attribute macro.
pub(crate) fn job_offer_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as JobOfferArgs);
    let input = parse_macro_input!(item as ItemTrait);

    match expand(args, input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: JobOfferArgs, mut input: ItemTrait) -> syn::Result<TokenStream2> {
    let trait_name = input.ident.clone();
    let vis = &input.vis;

    if args.namespaces.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "a job offer needs at least one namespace: #[job_offer(namespaces = [\"..\"])]",
        ));
    }
    if let Some(blank) = args.namespaces.iter().find(|ns| ns.value().trim().is_empty()) {
        return Err(syn::Error::new_spanned(blank, "namespaces must not be blank"));
    }
    if !input.supertraits.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.supertraits,
            "a job offer cannot extend other traits",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "a job offer cannot be generic",
        ));
    }

    let mut methods = Vec::new();
    for item in &input.items {
        match item {
            TraitItem::Fn(method) => {
                methods.push(client_method(&trait_name, &args.namespaces, method)?)
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "a job offer may only declare methods",
                ));
            }
        }
    }

    for item in &mut input.items {
        if let TraitItem::Fn(method) = item {
            strip_job_attrs(&mut method.attrs);
        }
    }

    let client = args
        .client
        .unwrap_or_else(|| format_ident!("{}Client", trait_name));
    let namespaces = &args.namespaces;
    let offer = offer_path(&trait_name);

    Ok(quote! {
        #input

        #[doc = concat!("Client for [`", stringify!(#trait_name), "`], generated by `#[job_offer]`.")]
        #[derive(Clone, Debug)]
        #vis struct #client {
            dispatcher: ::jobdesk::Dispatcher,
        }

        impl #client {
            /// Create a client dispatching through `dispatcher`.
            #vis fn new(dispatcher: ::jobdesk::Dispatcher) -> Self {
                Self { dispatcher }
            }

            /// The dispatcher behind this client.
            #vis fn dispatcher(&self) -> &::jobdesk::Dispatcher {
                &self.dispatcher
            }
        }

        impl ::jobdesk::JobOffer for #client {
            const OFFER: &'static str = #offer;
            const NAMESPACES: &'static [&'static str] = &[#(#namespaces),*];
        }

        impl #trait_name for #client {
            #(#methods)*
        }
    })
}
