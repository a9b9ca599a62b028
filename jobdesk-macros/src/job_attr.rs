//! The `#[job("name")]` marker shared by both macros.

use syn::{Attribute, LitStr, Type};

/// Find the `#[job("name")]` attribute.
///
/// Returns `Ok(None)` when the marker is absent and an error when it is
/// present but malformed.
pub(crate) fn find_job_name(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("job")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[job] attribute"));
        }
        let name: LitStr = attr.parse_args().map_err(|_| {
            syn::Error::new_spanned(attr, "expected a job name: #[job(\"name\")]")
        })?;
        if name.value().trim().is_empty() {
            return Err(syn::Error::new_spanned(&name, "job name must not be blank"));
        }
        found = Some(name);
    }
    Ok(found)
}

/// Drop every `#[job]` marker.
pub(crate) fn strip_job_attrs(attrs: &mut Vec<Attribute>) {
    attrs.retain(|attr| !attr.path().is_ident("job"));
}

/// The `T` and `E` of a type spelled `Result<T, E>` (any path ending in
/// `Result`), or `None`.
pub(crate) fn result_parts(ty: &Type) -> Option<(&Type, Option<&Type>)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    let ok = types.next()?;
    Some((ok, types.next()))
}
