use crate::{scan::FieldDescriptor, types::TypeRef};
use derive_more::IntoIterator;
use std::collections::BTreeMap;

///
/// GroupingIndex
///
/// Annotated fields partitioned by enclosing type. Groups iterate in
/// qualified-name order and keep the scanner's declaration order inside.
///

#[derive(Clone, Debug, Default, IntoIterator)]
pub struct GroupingIndex(BTreeMap<TypeRef, Vec<FieldDescriptor>>);

impl GroupingIndex {
    #[must_use]
    pub fn build(fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let mut groups: BTreeMap<TypeRef, Vec<FieldDescriptor>> = BTreeMap::new();

        for field in fields {
            groups.entry(field.enclosing.clone()).or_default().push(field);
        }

        Self(groups)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, enclosing: &TypeRef) -> Option<&[FieldDescriptor]> {
        self.0.get(enclosing).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeRef, &[FieldDescriptor])> {
        self.0.iter().map(|(ty, fields)| (ty, fields.as_slice()))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scan::DirectiveScanner, source::DeclarationSet, types::Namespace};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn fields(sources: &[(String, String)]) -> Vec<FieldDescriptor> {
        let decls = DeclarationSet::from_sources(
            Namespace::parse("crate").unwrap(),
            sources.iter().map(|(p, s)| (p.clone(), s.clone())),
        )
        .unwrap();

        DirectiveScanner::new("country_field_binder").scan(&decls)
    }

    fn struct_source(name: &str, annotated: usize) -> String {
        let mut src = format!("pub struct {name} {{\n");
        for i in 0..annotated {
            src.push_str(&format!(
                "#[country_field_binder(constructor_parameters = [String], country_parameterized_class = Country)]\npub f{i}: String,\n"
            ));
        }
        src.push_str("pub plain: u8,\n}\n");

        src
    }

    #[test]
    fn one_group_per_enclosing_type_in_declaration_order() {
        let src = format!("{}{}", struct_source("Order", 2), struct_source("Invoice", 1));
        let index = GroupingIndex::build(fields(&[("sales.rs".into(), src)]));

        assert_eq!(index.len(), 2);

        let order = TypeRef::parse("crate::sales::Order").unwrap();
        let names = index
            .get(&order)
            .unwrap()
            .iter()
            .map(|f| f.field_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["f0", "f1"]);
    }

    #[test]
    fn types_without_annotated_fields_never_appear() {
        let src = format!("{}{}", struct_source("Order", 0), struct_source("Invoice", 1));
        let index = GroupingIndex::build(fields(&[("sales.rs".into(), src)]));

        let groups = index.iter().map(|(ty, _)| ty.to_string()).collect::<Vec<_>>();
        assert_eq!(groups, ["crate::sales::Invoice"]);

        let none = GroupingIndex::build(fields(&[("sales.rs".into(), struct_source("Order", 0))]));
        assert!(none.is_empty());
    }

    proptest! {
        #[test]
        fn group_count_matches_distinct_enclosing_types(
            counts in prop::collection::vec(0usize..4, 1..6)
        ) {
            let src = counts
                .iter()
                .enumerate()
                .map(|(i, n)| struct_source(&format!("S{i}"), *n))
                .collect::<String>();
            let fields = fields(&[("lib.rs".into(), src)]);

            let distinct = fields
                .iter()
                .map(|f| f.enclosing.clone())
                .collect::<BTreeSet<_>>();
            let index = GroupingIndex::build(fields);

            prop_assert_eq!(index.len(), distinct.len());
            prop_assert_eq!(index.len(), counts.iter().filter(|n| **n > 0).count());
        }
    }
}
