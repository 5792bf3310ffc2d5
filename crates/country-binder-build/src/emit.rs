use crate::{
    extract::ResolvedMetadata,
    registry::SubtypeSet,
    scan::FieldDescriptor,
    types::{Namespace, TypeRef},
};
use convert_case::{Case, Casing};
use std::path::PathBuf;

/// First line of every generated unit.
pub const GENERATED_HEADER: &str = "// @generated by country-binder-build. Do not edit.";

///
/// FieldBinding
///
/// Everything emission knows about one field. `subtypes` is resolved but
/// not rendered yet; binder bodies will dispatch over it.
///

#[derive(Clone, Debug)]
pub struct FieldBinding<'a> {
    pub field: &'a FieldDescriptor,
    pub metadata: ResolvedMetadata,
    pub subtypes: SubtypeSet,
}

///
/// GeneratedUnit
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedUnit {
    pub enclosing: TypeRef,
    pub namespace: Namespace,
    pub unit_name: String,
    pub lines: Vec<String>,

    /// Output path relative to the output directory.
    pub path: PathBuf,
}

impl GeneratedUnit {
    #[must_use]
    pub fn contents(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');

        out
    }
}

///
/// SourceEmitter
///

pub struct SourceEmitter<'a> {
    root: &'a Namespace,
    suffix: &'a str,
}

impl<'a> SourceEmitter<'a> {
    #[must_use]
    pub const fn new(root: &'a Namespace, suffix: &'a str) -> Self {
        Self { root, suffix }
    }

    /// `Order` -> `OrderBinder`
    #[must_use]
    pub fn unit_name(&self, enclosing: &TypeRef) -> String {
        format!("{}{}", enclosing.simple_name(), self.suffix)
    }

    /// One directory per namespace segment below the crate root, then the
    /// snake_case unit name: `crate::sales::Order` -> `sales/order_binder.rs`.
    #[must_use]
    pub fn unit_path(&self, enclosing: &TypeRef) -> PathBuf {
        let mut path = enclosing
            .namespace()
            .relative_to(self.root)
            .iter()
            .collect::<PathBuf>();
        path.push(format!(
            "{}.rs",
            self.unit_name(enclosing).to_case(Case::Snake)
        ));

        path
    }

    #[must_use]
    pub fn emit(&self, enclosing: &TypeRef, bindings: &[FieldBinding<'_>]) -> GeneratedUnit {
        let unit_name = self.unit_name(enclosing);

        let mut lines = vec![
            GENERATED_HEADER.to_string(),
            format!("// namespace: {}", enclosing.namespace()),
            format!("// source: {enclosing}"),
            String::new(),
            format!("pub struct {unit_name};"),
            String::new(),
            format!("impl {unit_name} {{"),
        ];
        lines.extend(bindings.iter().map(binder_line));
        lines.push("}".to_string());

        GeneratedUnit {
            enclosing: enclosing.clone(),
            namespace: enclosing.namespace().clone(),
            path: self.unit_path(enclosing),
            unit_name,
            lines,
        }
    }
}

/// Advisory stub documenting the binder signature; the body is a placeholder.
#[must_use]
pub fn binder_line(binding: &FieldBinding<'_>) -> String {
    let params = binding
        .metadata
        .constructor_param_types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "    // pub const {}_binder: BinderFn<[{params}], {}, {}> = |u, b| None;",
        binding.field.field_name, binding.metadata.base_type, binding.field.field_type,
    )
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract::MetadataExtractor, scan::DirectiveScanner, source::DeclarationSet};
    use pretty_assertions::assert_eq;

    const SALES: &str = r"
        use crate::geo::Country;

        pub struct Order {
            #[country_field_binder(constructor_parameters = [String, Currency], country_parameterized_class = Country)]
            pub code_field: Vec<String>,
        }

        pub struct Currency;
    ";

    fn root() -> Namespace {
        Namespace::parse("crate").unwrap()
    }

    #[test]
    fn emits_container_and_one_stub_per_binding() {
        let decls = DeclarationSet::from_sources(root(), [("sales.rs", SALES)]).unwrap();
        let fields = DirectiveScanner::new("country_field_binder").scan(&decls);
        let bindings = fields
            .iter()
            .map(|field| FieldBinding {
                field,
                metadata: MetadataExtractor.extract(field).unwrap(),
                subtypes: SubtypeSet::new(),
            })
            .collect::<Vec<_>>();

        let root = root();
        let emitter = SourceEmitter::new(&root, "Binder");
        let order = TypeRef::parse("crate::sales::Order").unwrap();
        let unit = emitter.emit(&order, &bindings);

        assert_eq!(unit.unit_name, "OrderBinder");
        assert_eq!(unit.namespace.to_string(), "crate::sales");
        assert_eq!(unit.path, PathBuf::from("sales/order_binder.rs"));
        assert_eq!(
            unit.contents(),
            "\
// @generated by country-binder-build. Do not edit.
// namespace: crate::sales
// source: crate::sales::Order

pub struct OrderBinder;

impl OrderBinder {
    // pub const code_field_binder: BinderFn<[String, crate::sales::Currency], crate::geo::Country, Vec<String>> = |u, b| None;
}
"
        );
    }

    #[test]
    fn root_namespace_units_sit_at_the_top_of_the_output() {
        let root = root();
        let emitter = SourceEmitter::new(&root, "Binder");
        let ty = TypeRef::parse("crate::Settings").unwrap();

        assert_eq!(emitter.unit_path(&ty), PathBuf::from("settings_binder.rs"));

        let unit = emitter.emit(&ty, &[]);
        assert_eq!(unit.lines.last().map(String::as_str), Some("}"));
        assert!(!unit.lines.iter().any(|line| line.contains("_binder")));
    }
}
