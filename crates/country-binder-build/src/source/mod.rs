//! The declaration set of a generation round: every module of the scanned
//! crate, its items, and the names visible inside it.

mod load;
mod scope;

pub use scope::*;

use crate::types::{Namespace, TypeRef};
use std::{collections::BTreeMap, path::PathBuf};
use thiserror::Error as ThisError;

/// Re-export chains longer than this are treated as unresolved.
const MAX_REEXPORT_HOPS: usize = 16;

///
/// SourceError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum SourceError {
    #[error("module '{namespace}' is declared by both {first} and {second}")]
    DuplicateModule {
        namespace: Namespace,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },
}

///
/// Module
///
/// One module of the crate, either a file or an inline `mod` block.
///

#[derive(Debug)]
pub struct Module {
    pub namespace: Namespace,
    pub file: PathBuf,
    pub items: Vec<syn::Item>,
    pub scope: ModuleScope,
}

///
/// DeclarationSet
///

#[derive(Debug)]
pub struct DeclarationSet {
    root: Namespace,
    modules: BTreeMap<Namespace, Module>,
}

impl DeclarationSet {
    #[must_use]
    pub const fn new(root: Namespace) -> Self {
        Self {
            root,
            modules: BTreeMap::new(),
        }
    }

    /// Crate root namespace that `crate::` paths resolve against.
    #[must_use]
    pub const fn root(&self) -> &Namespace {
        &self.root
    }

    /// Modules in ascending namespace order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    #[must_use]
    pub fn module(&self, namespace: &Namespace) -> Option<&Module> {
        self.modules.get(namespace)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Kind of the declaration a type reference names, if the crate declares it.
    #[must_use]
    pub fn lookup(&self, ty: &TypeRef) -> Option<DeclKind> {
        self.module(ty.namespace())?
            .scope
            .declared(ty.simple_name())
    }

    /// Follow `use` re-exports from `ty` to the module that declares it.
    #[must_use]
    pub fn canonicalize(&self, ty: &TypeRef) -> Option<(TypeRef, DeclKind)> {
        let mut current = ty.clone();

        for _ in 0..MAX_REEXPORT_HOPS {
            let scope = &self.module(current.namespace())?.scope;
            if let Some(kind) = scope.declared(current.simple_name()) {
                return Some((current, kind));
            }

            let target = scope.import(current.simple_name())?;
            current = TypeRef::from_segments(target.to_vec())?;
        }

        None
    }

    /// Bind the names behind every `use path::*` to the importing module.
    ///
    /// Runs until no glob adds a name, so globs of globs are followed.
    /// Globs of modules outside the set (enums, extern crates) bind nothing.
    pub fn link_globs(&mut self) {
        for _ in 0..MAX_REEXPORT_HOPS {
            let mut additions = Vec::new();

            for module in self.modules.values() {
                for glob in module.scope.globs() {
                    let Some(target) = self.modules.get(&Namespace::new(glob.iter().cloned())) else {
                        continue;
                    };

                    for name in target.scope.visible_names() {
                        if !module.scope.binds(name) {
                            let mut path = glob.clone();
                            path.push(name.to_string());
                            additions.push((module.namespace.clone(), name.to_string(), path));
                        }
                    }
                }
            }

            let mut linked = 0;
            for (namespace, name, path) in additions {
                if let Some(module) = self.modules.get_mut(&namespace)
                    && module.scope.import_glob_name(&name, path)
                {
                    linked += 1;
                }
            }

            if linked == 0 {
                return;
            }
            tracing::debug!(linked, "linked glob imports");
        }
    }

    /// Register a parsed file (or inline module) and all inline child modules.
    pub fn insert(
        &mut self,
        namespace: Namespace,
        file: PathBuf,
        items: Vec<syn::Item>,
    ) -> Result<(), SourceError> {
        if let Some(existing) = self.modules.get(&namespace) {
            return Err(SourceError::DuplicateModule {
                namespace,
                first: existing.file.clone(),
                second: file,
            });
        }

        let mut children = Vec::new();
        for item in &items {
            if let syn::Item::Mod(item_mod) = item
                && let Some((_, content)) = &item_mod.content
            {
                children.push((namespace.child(&item_mod.ident.to_string()), content.clone()));
            }
        }

        let scope = ModuleScope::build(namespace.clone(), &self.root, &items);
        self.modules.insert(
            namespace.clone(),
            Module {
                namespace,
                file: file.clone(),
                items,
                scope,
            },
        );

        for (child, content) in children {
            self.insert(child, file.clone(), content)?;
        }

        Ok(())
    }
}
