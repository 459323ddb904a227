use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::{
    *,
    parse_quote,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

/// Options accepted by `#[test]`. There are none yet.
#[derive(Debug)]
pub struct TestOptions;

/// Build a test case.
///
/// Unlike the standard `#[test]`, test functions built by this macro may take
/// a fixture as their argument and return any type implementing
/// `TestResult`.
pub fn create_test(_: TestOptions, mut item: ItemFn) -> Result<TokenStream> {
    let vis = item.vis.clone();
    let name = item.sig.ident.clone();

    if item.sig.inputs.len() > 1 {
        return Err(Error::new(
            item.sig.inputs.span(),
            "Test functions take at most one fixture",
        ));
    }

    make_bounds(&mut item.sig);

    let run = if item.sig.inputs.is_empty() {
        quote!(crate::common::run_test(|(): ()| #name()))
    } else {
        quote!(crate::common::run_test(#name))
    };

    Ok(quote_spanned! {item.span()=>
        #[test]
        #vis fn #name() {
            #item

            #run;
        }
    })
}

/// Add where bounds to test functions to ensure `TestResult` and `Fixture` are
/// implemented.
fn make_bounds(sig: &mut Signature) {
    let mut predicates: Vec<WherePredicate> = Vec::new();

    if let ReturnType::Type(_, ref ty) = sig.output {
        predicates.push(parse_quote!(#ty: crate::common::TestResult));
    }

    for arg in &sig.inputs {
        if let FnArg::Typed(PatType { ref ty, .. }) = *arg {
            predicates.push(parse_quote!(#ty: crate::common::Fixture));
        }
    }

    sig.generics.make_where_clause().predicates.extend(predicates);
}

impl Parse for TestOptions {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            Ok(TestOptions)
        } else {
            Err(input.error("Unexpected token"))
        }
    }
}
