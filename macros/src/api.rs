use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{Attribute, Lit, LitStr, Meta, MetaList, NestedMeta, spanned::Spanned};
use synstructure::{BindingInfo, Structure, VariantInfo};

#[derive(Debug)]
struct Error(TokenStream);

impl Error {
    fn new(span: Span, message: &str) -> Error {
        Error(quote_spanned! { span =>
            compile_error!(#message);
        })
    }

    fn into_tokens(self) -> TokenStream {
        self.0
    }
}

/// Parsed contents of an `#[api(...)]` attribute.
enum Api {
    /// Error is not meant to be shown to callers in detail.
    Internal,
    /// Error is reported to callers under a stable code.
    Code(LitStr),
}

pub fn derive_error(s: Structure) -> TokenStream {
    let codes = s.each_variant(|v| match find_code(v) {
        Ok(v) => v,
        Err(e) => e.into_tokens(),
    });

    s.gen_impl(quote! {
        use std::borrow::Cow;

        gen impl ApiError for @Self {
            fn code(&self) -> Option<Cow<str>> {
                match *self { #codes }
            }
        }
    })
}

/// Given a list of attributes find `#[api(...)]`, and ensure there is only one
/// of them.
fn find_api(attrs: &[Attribute]) -> Result<Option<MetaList>, Error> {
    let mut attrs = attrs.iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .filter(|meta| meta.path().is_ident("api"));

    let meta = match attrs.next() {
        Some(Meta::List(meta)) => meta,
        Some(meta) => return Err(Error::new(
            meta.span(),
            "api attribute must take a list in parentheses",
        )),
        None => return Ok(None),
    };

    if let Some(meta) = attrs.next() {
        return Err(Error::new(
            meta.span(),
            "api attribute must be used exactly once",
        ));
    }

    Ok(Some(meta))
}

fn parse_api(meta: MetaList) -> Result<Api, Error> {
    let span = meta.span();
    let mut api = None;

    for item in meta.nested {
        let parsed = match item {
            NestedMeta::Meta(Meta::Path(ref path)) if path.is_ident("internal") =>
                Api::Internal,
            NestedMeta::Meta(Meta::NameValue(ref nv)) if nv.path.is_ident("code") =>
                match nv.lit {
                    Lit::Str(ref s) => Api::Code(s.clone()),
                    _ => return Err(Error::new(
                        nv.lit.span(),
                        "expected a string",
                    )),
                },
            _ => return Err(Error::new(
                item.span(),
                "expected one of: internal, code",
            )),
        };

        if api.is_some() {
            return Err(Error::new(
                item.span(),
                "internal errors can't have codes",
            ));
        }

        api = Some(parsed);
    }

    api.ok_or_else(|| Error::new(
        span,
        "api attribute requires exactly one argument",
    ))
}

/// Find value of `ApiError::code()` for a variant.
fn find_code(v: &VariantInfo) -> Result<TokenStream, Error> {
    let meta = match find_api(v.ast().attrs)? {
        Some(meta) => meta,
        None => return v.bindings()
            .iter()
            .find(is_cause)
            .map(|cause| quote!(#cause.code()))
            .ok_or_else(|| Error::new(
                v.ast().ident.span(),
                "each variant must be #[api]-annotated or have a #[cause]",
            )),
    };

    Ok(match parse_api(meta)? {
        Api::Internal => quote!(None),
        Api::Code(code) => quote!(Some(Cow::Borrowed(#code))),
    })
}

fn is_cause(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .any(|meta| meta.path().is_ident("cause"))
}
