//! Implementor discovery.
//!
//! The registry is a precomputed edge set `Base -> {Implementors}` built once
//! per round from the declaration set; resolution during emission is a map
//! lookup.

use crate::{
    source::{DeclKind, DeclarationSet, Module},
    types::{Namespace, TypeRef},
};
use std::collections::{BTreeMap, BTreeSet};
use syn::{Item, ItemImpl, Type, TypeParamBound};
use thiserror::Error as ThisError;

/// Concrete implementors of one base trait.
pub type SubtypeSet = BTreeSet<TypeRef>;

///
/// ResolutionError
///
/// Fatal for the round.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ResolutionError {
    #[error("base type '{base}' is a {kind:?}, not a trait")]
    NotATrait { base: TypeRef, kind: DeclKind },

    #[error("base type '{base}' cannot be loaded: it is not declared in the scanned sources")]
    UnknownBase { base: TypeRef },
}

///
/// ImplRegistry
///

#[derive(Clone, Debug, Default)]
pub struct ImplRegistry {
    implementors: BTreeMap<TypeRef, SubtypeSet>,
}

impl ImplRegistry {
    /// Index every trait the crate declares against its concrete
    /// implementors, restricted to the trait's namespace. With
    /// `include_nested` the namespace covers its child modules too.
    #[must_use]
    pub fn build(decls: &DeclarationSet, include_nested: bool) -> Self {
        let mut traits = BTreeSet::new();
        let mut direct: BTreeMap<TypeRef, BTreeSet<TypeRef>> = BTreeMap::new();
        let mut subtraits: BTreeMap<TypeRef, BTreeSet<TypeRef>> = BTreeMap::new();

        for module in decls.modules() {
            for item in &module.items {
                match item {
                    Item::Trait(item_trait) => {
                        let this = module.namespace.qualify(&item_trait.ident.to_string());

                        for bound in &item_trait.supertraits {
                            if let TypeParamBound::Trait(bound) = bound
                                && let Some(parent) = resolve_trait(decls, module, &bound.path)
                            {
                                subtraits.entry(parent).or_default().insert(this.clone());
                            }
                        }
                        traits.insert(this);
                    }
                    Item::Impl(item_impl) => {
                        if let Some((base, implementor)) = concrete_impl(decls, module, item_impl) {
                            direct.entry(base).or_default().insert(implementor);
                        }
                    }
                    _ => {}
                }
            }
        }

        let implementors = traits
            .into_iter()
            .map(|base| {
                let set = collect_implementors(&base, &direct, &subtraits)
                    .into_iter()
                    .filter(|ty| in_namespace(ty.namespace(), base.namespace(), include_nested))
                    .collect();

                (base, set)
            })
            .collect();

        Self { implementors }
    }

    #[must_use]
    pub fn implementors(&self, base: &TypeRef) -> Option<&SubtypeSet> {
        self.implementors.get(base)
    }
}

// Direct implementors of `base` plus those of every trait below it.
fn collect_implementors(
    base: &TypeRef,
    direct: &BTreeMap<TypeRef, BTreeSet<TypeRef>>,
    subtraits: &BTreeMap<TypeRef, BTreeSet<TypeRef>>,
) -> SubtypeSet {
    let mut found = SubtypeSet::new();
    let mut seen = BTreeSet::new();
    let mut pending = vec![base.clone()];

    while let Some(current) = pending.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(types) = direct.get(&current) {
            found.extend(types.iter().cloned());
        }
        if let Some(subs) = subtraits.get(&current) {
            pending.extend(subs.iter().cloned());
        }
    }

    found
}

fn in_namespace(ns: &Namespace, base: &Namespace, include_nested: bool) -> bool {
    if include_nested {
        ns.is_within(base)
    } else {
        ns == base
    }
}

fn resolve_trait(decls: &DeclarationSet, module: &Module, path: &syn::Path) -> Option<TypeRef> {
    let written = module.scope.resolve(path).ok()?;
    match decls.canonicalize(&written) {
        Some((ty, DeclKind::Trait)) => Some(ty),
        _ => None,
    }
}

// `impl Base for Concrete` with no generics anywhere. Blanket, generic and
// negative impls never name a concrete implementor.
fn concrete_impl(
    decls: &DeclarationSet,
    module: &Module,
    item: &ItemImpl,
) -> Option<(TypeRef, TypeRef)> {
    let (negative, trait_path, _) = item.trait_.as_ref()?;
    if negative.is_some() || !item.generics.params.is_empty() {
        return None;
    }

    let Type::Path(self_ty) = item.self_ty.as_ref() else {
        return None;
    };
    if self_ty.qself.is_some() {
        return None;
    }

    let base = resolve_trait(decls, module, trait_path)?;
    let written = module.scope.resolve(&self_ty.path).ok()?;
    let (implementor, kind) = decls.canonicalize(&written)?;

    kind.is_concrete().then_some((base, implementor))
}

///
/// SubtypeResolver
///

pub struct SubtypeResolver<'a> {
    decls: &'a DeclarationSet,
    registry: &'a ImplRegistry,
}

impl<'a> SubtypeResolver<'a> {
    #[must_use]
    pub const fn new(decls: &'a DeclarationSet, registry: &'a ImplRegistry) -> Self {
        Self { decls, registry }
    }

    /// Every concrete implementor of `base` within its namespace.
    pub fn resolve(&self, base: &TypeRef) -> Result<SubtypeSet, ResolutionError> {
        let Some((canonical, kind)) = self.decls.canonicalize(base) else {
            return Err(ResolutionError::UnknownBase { base: base.clone() });
        };
        if kind != DeclKind::Trait {
            return Err(ResolutionError::NotATrait {
                base: base.clone(),
                kind,
            });
        }

        let Some(found) = self.registry.implementors(&canonical) else {
            return Ok(SubtypeSet::new());
        };

        // hand back only names the declaration set still knows as concrete
        Ok(found
            .iter()
            .filter(|ty| self.decls.lookup(ty).is_some_and(DeclKind::is_concrete))
            .cloned()
            .collect())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    const GEO: &str = r"
        pub trait Country {}
        pub trait Nordic: Country {}

        pub struct France;
        pub enum Spain { Mainland, Islands }
        pub struct Norway;
        pub struct Wrapper<T>(T);
        pub type Alias = France;

        impl Country for France {}
        impl Country for Spain {}
        impl Country for Norway {}
        impl Nordic for Norway {}
        impl<T> Country for Wrapper<T> {}
        impl Country for &'static France {}

        pub mod nordic {
            use super::Country;
            pub struct Sweden;
            impl Country for Sweden {}
        }
    ";

    const ELSEWHERE: &str = r"
        use crate::geo::Country;

        pub struct Atlantis;
        impl Country for Atlantis {}
        impl std::fmt::Display for Atlantis {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { Ok(()) }
        }
    ";

    const LIB: &str = "pub mod elsewhere; pub mod geo; pub use geo::Country;";

    fn decls() -> DeclarationSet {
        DeclarationSet::from_sources(
            Namespace::parse("crate").unwrap(),
            [("geo.rs", GEO), ("elsewhere.rs", ELSEWHERE), ("lib.rs", LIB)],
        )
        .unwrap()
    }

    fn resolve(decls: &DeclarationSet, include_nested: bool, base: &str) -> Result<Vec<String>, ResolutionError> {
        let registry = ImplRegistry::build(decls, include_nested);
        let resolver = SubtypeResolver::new(decls, &registry);

        resolver
            .resolve(&TypeRef::parse(base).unwrap())
            .map(|set| set.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn finds_exactly_the_concrete_implementors_in_the_namespace() {
        let found = resolve(&decls(), false, "crate::geo::Country").unwrap();

        assert_eq!(
            found,
            ["crate::geo::France", "crate::geo::Norway", "crate::geo::Spain"]
        );
    }

    #[test]
    fn nested_namespaces_are_included_on_request() {
        let found = resolve(&decls(), true, "crate::geo::Country").unwrap();

        assert_eq!(
            found,
            [
                "crate::geo::France",
                "crate::geo::Norway",
                "crate::geo::Spain",
                "crate::geo::nordic::Sweden",
            ]
        );
    }

    #[test]
    fn re_exported_base_resolves_to_its_declaration() {
        let found = resolve(&decls(), false, "crate::Country").unwrap();

        assert_eq!(found.len(), 3);
    }

    #[test]
    fn subtrait_implementors_count_for_the_base() {
        let src = r"
            pub trait Country {}
            pub trait Nordic: Country {}
            pub struct Iceland;
            impl Nordic for Iceland {}
        ";
        let decls =
            DeclarationSet::from_sources(Namespace::parse("crate").unwrap(), [("geo.rs", src)])
                .unwrap();

        assert_eq!(
            resolve(&decls, false, "crate::geo::Country").unwrap(),
            ["crate::geo::Iceland"]
        );
    }

    #[test]
    fn unknown_base_is_fatal() {
        let err = resolve(&decls(), true, "crate::geo::Planet").unwrap_err();

        assert!(matches!(err, ResolutionError::UnknownBase { .. }));
    }

    #[test]
    fn non_trait_base_is_fatal() {
        let err = resolve(&decls(), true, "crate::geo::France").unwrap_err();

        assert_eq!(
            err,
            ResolutionError::NotATrait {
                base: TypeRef::parse("crate::geo::France").unwrap(),
                kind: DeclKind::Struct,
            }
        );
    }
}
