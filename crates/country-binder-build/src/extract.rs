use crate::{
    directive::{Directive, SymbolError},
    scan::FieldDescriptor,
    types::TypeRef,
};
use thiserror::Error as ThisError;

pub const CONSTRUCTOR_PARAMETERS: &str = "constructor_parameters";
pub const COUNTRY_PARAMETERIZED_CLASS: &str = "country_parameterized_class";

///
/// ExtractionError
///
/// Recoverable: the field is skipped and its siblings continue.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{attribute}: {reason}")]
pub struct ExtractionError {
    pub attribute: &'static str,
    pub reason: SymbolError,
}

///
/// ResolvedMetadata
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedMetadata {
    pub constructor_param_types: Vec<TypeRef>,
    pub base_type: TypeRef,
}

///
/// MetadataExtractor
///
/// Reads the symbol form of a directive. The scanner resolved every path
/// while loading, so extraction never touches syntax again.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    #[must_use]
    pub fn extract_list(&self, directive: &Directive) -> Option<Vec<TypeRef>> {
        directive.constructor_parameters.as_ref().ok().cloned()
    }

    #[must_use]
    pub fn extract_single(&self, directive: &Directive) -> Option<TypeRef> {
        directive.country_parameterized_class.as_ref().ok().cloned()
    }

    /// Both attributes, or the first one that failed.
    pub fn extract(&self, field: &FieldDescriptor) -> Result<ResolvedMetadata, ExtractionError> {
        let directive = &field.directive;

        let constructor_param_types = directive
            .constructor_parameters
            .clone()
            .map_err(|reason| ExtractionError {
                attribute: CONSTRUCTOR_PARAMETERS,
                reason,
            })?;

        let base_type = directive
            .country_parameterized_class
            .clone()
            .map_err(|reason| ExtractionError {
                attribute: COUNTRY_PARAMETERIZED_CLASS,
                reason,
            })?;

        Ok(ResolvedMetadata {
            constructor_param_types,
            base_type,
        })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scan::DirectiveScanner, source::DeclarationSet, types::Namespace};

    fn field(directive: &str) -> FieldDescriptor {
        let src = format!(
            "use crate::geo::Country;\npub struct Order {{\n{directive}\npub code_field: String,\n}}"
        );
        let decls =
            DeclarationSet::from_sources(Namespace::parse("crate").unwrap(), [("sales.rs", src)])
                .unwrap();

        DirectiveScanner::new("country_field_binder")
            .scan(&decls)
            .remove(0)
    }

    #[test]
    fn extracts_both_attributes() {
        let field = field(
            "#[country_field_binder(constructor_parameters = [String, u8], country_parameterized_class = Country)]",
        );
        let extractor = MetadataExtractor;

        let params = extractor.extract_list(&field.directive).unwrap();
        assert_eq!(
            params.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["String", "u8"]
        );

        let base = extractor.extract_single(&field.directive).unwrap();
        assert_eq!(base.to_string(), "crate::geo::Country");

        let meta = extractor.extract(&field).unwrap();
        assert_eq!(meta.constructor_param_types, params);
        assert_eq!(meta.base_type, base);
    }

    #[test]
    fn missing_base_yields_none_and_names_the_attribute() {
        let field = field("#[country_field_binder(constructor_parameters = [String])]");
        let extractor = MetadataExtractor;

        assert!(extractor.extract_list(&field.directive).is_some());
        assert!(extractor.extract_single(&field.directive).is_none());

        let err = extractor.extract(&field).unwrap_err();
        assert_eq!(err.attribute, COUNTRY_PARAMETERIZED_CLASS);
        assert_eq!(err.reason, SymbolError::Missing);
        assert_eq!(err.to_string(), "country_parameterized_class: attribute is not set");
    }

    #[test]
    fn missing_parameters_are_reported_first() {
        let field = field("#[country_field_binder]");

        let err = MetadataExtractor.extract(&field).unwrap_err();
        assert_eq!(err.attribute, CONSTRUCTOR_PARAMETERS);
    }
}
