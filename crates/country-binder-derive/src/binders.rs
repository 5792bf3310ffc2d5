use country_binder_build::{
    DEFAULT_ATTRIBUTE,
    directive::DirectiveArgs,
    extract::{CONSTRUCTOR_PARAMETERS, COUNTRY_PARAMETERIZED_CLASS},
    source::display_path,
};
use proc_macro2::TokenStream;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Path, PathArguments};

// derive_country_field_binders
pub fn derive_country_field_binders(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match check(&input) {
        Ok(()) => TokenStream::new(),
        Err(err) => err.to_compile_error(),
    }
}

// every problem in the struct, combined into one error
fn check(input: &DeriveInput) -> Result<(), Error> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "CountryFieldBinders can only be derived for structs",
        ));
    };

    let mut errors = data
        .fields
        .iter()
        .flat_map(|field| {
            field
                .attrs
                .iter()
                .filter(|attr| attr.path().is_ident(DEFAULT_ATTRIBUTE))
                .map(move |attr| check_field(&data.fields, field, attr))
        })
        .filter_map(Result::err);

    let Some(mut first) = errors.next() else {
        return Ok(());
    };
    for err in errors {
        first.combine(err);
    }

    Err(first)
}

fn check_field(fields: &Fields, field: &Field, attr: &Attribute) -> Result<(), Error> {
    if !matches!(fields, Fields::Named(_)) || field.ident.is_none() {
        return Err(Error::new_spanned(
            attr,
            "country_field_binder is only supported on named fields",
        ));
    }

    let args = DirectiveArgs::from_attribute(attr)
        .map_err(|err| Error::new(err.span(), err.to_string()))?;

    let Some(params) = &args.constructor_parameters else {
        return Err(Error::new_spanned(
            attr,
            format!("{DEFAULT_ATTRIBUTE}: {CONSTRUCTOR_PARAMETERS} is not set"),
        ));
    };
    let Some(base) = &args.country_parameterized_class else {
        return Err(Error::new_spanned(
            attr,
            format!("{DEFAULT_ATTRIBUTE}: {COUNTRY_PARAMETERIZED_CLASS} is not set"),
        ));
    };

    params.iter().chain([&base.0]).try_for_each(check_path)
}

fn check_path(path: &Path) -> Result<(), Error> {
    let generic = path
        .segments
        .iter()
        .any(|segment| !matches!(segment.arguments, PathArguments::None));

    if generic {
        return Err(Error::new_spanned(
            path,
            format!(
                "type reference '{}' must not carry generic arguments",
                display_path(path)
            ),
        ));
    }

    Ok(())
}

///
/// TESTS
///
