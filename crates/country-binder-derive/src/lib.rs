use proc_macro::TokenStream;

mod binders;

/// Declares the `country_field_binder` field attribute and checks every
/// directive at compile time. The binder units themselves are generated by
/// the build script; this derive emits no items.
#[proc_macro_derive(CountryFieldBinders, attributes(country_field_binder))]
pub fn derive_country_field_binders(input: TokenStream) -> TokenStream {
    binders::derive_country_field_binders(input.into()).into()
}
