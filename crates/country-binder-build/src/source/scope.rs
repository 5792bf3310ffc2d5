use crate::types::{Namespace, TypeRef};
use quote::ToTokens;
use std::collections::BTreeMap;
use syn::{Item, Path, PathArguments, UseTree};
use thiserror::Error as ThisError;

///
/// PathError
///
/// A path that cannot be turned into a type reference from its module.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PathError {
    #[error("type reference '{path}' must not carry generic arguments")]
    GenericArguments { path: String },

    #[error("type reference '{path}' climbs above the crate root")]
    OutsideCrate { path: String },
}

///
/// DeclKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeclKind {
    Enum,
    Module,
    Struct,
    Trait,
    TypeAlias,
    Union,
}

impl DeclKind {
    /// Types that can be instantiated, as opposed to traits and aliases.
    #[must_use]
    pub const fn is_concrete(self) -> bool {
        matches!(self, Self::Struct | Self::Enum | Self::Union)
    }

    const fn of(item: &Item) -> Option<Self> {
        match item {
            Item::Enum(_) => Some(Self::Enum),
            Item::Mod(_) => Some(Self::Module),
            Item::Struct(_) => Some(Self::Struct),
            Item::Trait(_) => Some(Self::Trait),
            Item::Type(_) => Some(Self::TypeAlias),
            Item::Union(_) => Some(Self::Union),
            _ => None,
        }
    }
}

///
/// ModuleScope
///
/// Names visible inside one module: its own declarations and its `use`
/// imports, the latter already made absolute. Glob imports are kept as
/// absolute module paths until the declaration set links them to names.
///

#[derive(Clone, Debug)]
pub struct ModuleScope {
    namespace: Namespace,
    root: Namespace,
    declared: BTreeMap<String, DeclKind>,
    imports: BTreeMap<String, Vec<String>>,
    globs: Vec<Vec<String>>,
}

impl ModuleScope {
    #[must_use]
    pub fn build(namespace: Namespace, root: &Namespace, items: &[Item]) -> Self {
        let mut scope = Self {
            namespace,
            root: root.clone(),
            declared: BTreeMap::new(),
            imports: BTreeMap::new(),
            globs: Vec::new(),
        };

        for item in items {
            if let (Some(kind), Some(ident)) = (DeclKind::of(item), item_ident(item)) {
                scope.declared.insert(ident, kind);
            }
        }

        // imports are made absolute against the declarations collected above
        for item in items {
            let Item::Use(item_use) = item else {
                continue;
            };

            let leading_colon = item_use.leading_colon.is_some();
            let mut flat = Vec::new();
            let mut globs = Vec::new();
            flatten_use(&item_use.tree, &mut Vec::new(), &mut flat, &mut globs);

            for (alias, segments) in flat {
                if let Ok(absolute) = scope.absolutize(segments, leading_colon) {
                    scope.imports.insert(alias, absolute);
                }
            }
            for segments in globs {
                if let Ok(absolute) = scope.absolutize(segments, leading_colon) {
                    scope.globs.push(absolute);
                }
            }
        }

        scope
    }

    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub fn declared(&self, name: &str) -> Option<DeclKind> {
        self.declared.get(name).copied()
    }

    /// Absolute target of an imported name.
    #[must_use]
    pub fn import(&self, name: &str) -> Option<&[String]> {
        self.imports.get(name).map(Vec::as_slice)
    }

    /// Modules whose names this module imports with `use path::*`.
    #[must_use]
    pub fn globs(&self) -> &[Vec<String>] {
        &self.globs
    }

    /// Every name declared or imported here.
    pub fn visible_names(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().chain(self.imports.keys()).map(String::as_str)
    }

    /// Whether `name` is bound here explicitly, shadowing any glob import.
    #[must_use]
    pub fn binds(&self, name: &str) -> bool {
        self.declared.contains_key(name) || self.imports.contains_key(name)
    }

    // A name reached through a glob; explicit bindings win.
    pub(super) fn import_glob_name(&mut self, name: &str, target: Vec<String>) -> bool {
        if self.binds(name) {
            return false;
        }
        self.imports.insert(name.to_string(), target);

        true
    }

    /// Resolve a type path as written in this module to a type reference.
    ///
    /// Names that are neither declared nor imported here are kept verbatim
    /// so prelude and primitive types (`String`, `u32`) survive unchanged.
    pub fn resolve(&self, path: &Path) -> Result<TypeRef, PathError> {
        let has_arguments = path
            .segments
            .iter()
            .any(|segment| !matches!(segment.arguments, PathArguments::None));
        if has_arguments {
            return Err(PathError::GenericArguments {
                path: display_path(path),
            });
        }

        let segments = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>();

        let absolute = self
            .absolutize(segments, path.leading_colon.is_some())
            .map_err(|()| PathError::OutsideCrate {
                path: display_path(path),
            })?;

        TypeRef::from_segments(absolute).ok_or_else(|| PathError::OutsideCrate {
            path: display_path(path),
        })
    }

    // Make segments absolute; Err(()) when `super` leaves the crate.
    fn absolutize(&self, segments: Vec<String>, leading_colon: bool) -> Result<Vec<String>, ()> {
        if leading_colon {
            return Ok(segments);
        }

        let Some(first) = segments.first() else {
            return Ok(segments);
        };

        match first.as_str() {
            "crate" => Ok(join(&self.root, &segments[1..])),
            "self" => Ok(join(&self.namespace, &segments[1..])),
            "super" => {
                let mut base = self.namespace.clone();
                let mut rest = segments.as_slice();

                while let Some(("super", tail)) =
                    rest.split_first().map(|(head, tail)| (head.as_str(), tail))
                {
                    if base.len() <= self.root.len() {
                        return Err(());
                    }
                    base = base.parent().ok_or(())?;
                    rest = tail;
                }

                Ok(join(&base, rest))
            }
            name => {
                if let Some(target) = self.imports.get(name) {
                    let mut absolute = target.clone();
                    absolute.extend_from_slice(&segments[1..]);

                    Ok(absolute)
                } else if self.declared.contains_key(name) {
                    Ok(join(&self.namespace, &segments))
                } else {
                    Ok(segments)
                }
            }
        }
    }
}

fn join(base: &Namespace, rest: &[String]) -> Vec<String> {
    base.iter().chain(rest).cloned().collect()
}

fn item_ident(item: &Item) -> Option<String> {
    let ident = match item {
        Item::Enum(i) => &i.ident,
        Item::Mod(i) => &i.ident,
        Item::Struct(i) => &i.ident,
        Item::Trait(i) => &i.ident,
        Item::Type(i) => &i.ident,
        Item::Union(i) => &i.ident,
        _ => return None,
    };

    Some(ident.to_string())
}

// Flatten a use tree into (alias, path) pairs plus the module paths of its
// globs. `_` renames bind no name and are dropped.
fn flatten_use(
    tree: &UseTree,
    prefix: &mut Vec<String>,
    out: &mut Vec<(String, Vec<String>)>,
    globs: &mut Vec<Vec<String>>,
) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            flatten_use(&path.tree, prefix, out, globs);
            prefix.pop();
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last() {
                    out.push((last.clone(), prefix.clone()));
                }
            } else {
                let mut target = prefix.clone();
                target.push(ident.clone());
                out.push((ident, target));
            }
        }
        UseTree::Rename(rename) => {
            let alias = rename.rename.to_string();
            if alias == "_" {
                return;
            }

            let mut target = prefix.clone();
            if rename.ident != "self" {
                target.push(rename.ident.to_string());
            }
            out.push((alias, target));
        }
        UseTree::Group(group) => {
            for tree in &group.items {
                flatten_use(tree, prefix, out, globs);
            }
        }
        UseTree::Glob(_) => globs.push(prefix.clone()),
    }
}

/// Render a path the way it reads in source, without token spacing.
#[must_use]
pub fn display_path(path: &Path) -> String {
    let mut out = String::new();
    if path.leading_colon.is_some() {
        out.push_str("::");
    }

    for (i, segment) in path.segments.iter().enumerate() {
        if i > 0 {
            out.push_str("::");
        }
        out.push_str(&segment.ident.to_string());
        if !matches!(segment.arguments, PathArguments::None) {
            out.push_str(&segment.arguments.to_token_stream().to_string().replace(' ', ""));
        }
    }

    out
}

///
/// TESTS
///
