//! The field directive in its two forms.
//!
//! `DirectiveArgs` is the syntax form exactly as written in the attribute,
//! parsed with darling; it can be turned back into tokens. `Directive` pairs
//! it with the symbol form, every path resolved against the enclosing module
//! when the directive is loaded.

use crate::{
    source::{ModuleScope, PathError},
    types::TypeRef,
};
use darling::{Error as DarlingError, FromMeta, ast::NestedMeta};
use derive_more::{Deref, IntoIterator};
use syn::{Attribute, Expr, ExprLit, Lit, Meta, Path};
use thiserror::Error as ThisError;

///
/// TypeListMeta
///
/// Ordered type paths, written either as `name = [A, B]` or `name(A, B)`.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator)]
pub struct TypeListMeta(pub Vec<Path>);

impl FromMeta for TypeListMeta {
    fn from_list(items: &[NestedMeta]) -> Result<Self, DarlingError> {
        items
            .iter()
            .map(path_from_nested)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    fn from_expr(expr: &Expr) -> Result<Self, DarlingError> {
        match expr {
            Expr::Array(array) => array
                .elems
                .iter()
                .map(path_from_expr)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            Expr::Group(group) => Self::from_expr(&group.expr),
            other => Err(DarlingError::unexpected_expr_type(other).with_span(other)),
        }
    }
}

///
/// TypeMeta
///
/// A single type path, written as `name = Base`, `name = "path::Base"` or
/// `name(Base)`.
///

#[derive(Clone, Debug, Deref)]
pub struct TypeMeta(pub Path);

impl FromMeta for TypeMeta {
    fn from_list(items: &[NestedMeta]) -> Result<Self, DarlingError> {
        match items {
            [item] => path_from_nested(item).map(Self),
            _ => Err(DarlingError::custom("expected exactly one type")),
        }
    }

    fn from_expr(expr: &Expr) -> Result<Self, DarlingError> {
        path_from_expr(expr).map(Self)
    }

    fn from_string(value: &str) -> Result<Self, DarlingError> {
        syn::parse_str::<Path>(value)
            .map(Self)
            .map_err(|_| DarlingError::unknown_value(value))
    }
}

fn path_from_nested(item: &NestedMeta) -> Result<Path, DarlingError> {
    match item {
        NestedMeta::Meta(Meta::Path(path)) => Ok(path.clone()),
        NestedMeta::Lit(Lit::Str(lit)) => lit.parse::<Path>().map_err(DarlingError::from),
        NestedMeta::Meta(meta) => Err(DarlingError::unexpected_type("type path").with_span(meta)),
        NestedMeta::Lit(lit) => Err(DarlingError::unexpected_lit_type(lit)),
    }
}

fn path_from_expr(expr: &Expr) -> Result<Path, DarlingError> {
    match expr {
        Expr::Path(expr_path) if expr_path.qself.is_none() => Ok(expr_path.path.clone()),
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => lit.parse::<Path>().map_err(DarlingError::from),
        Expr::Group(group) => path_from_expr(&group.expr),
        other => Err(DarlingError::unexpected_expr_type(other).with_span(other)),
    }
}

///
/// DirectiveArgs
///

#[derive(Clone, Debug, Default, FromMeta)]
pub struct DirectiveArgs {
    #[darling(default)]
    pub constructor_parameters: Option<TypeListMeta>,

    #[darling(default)]
    pub country_parameterized_class: Option<TypeMeta>,
}

impl DirectiveArgs {
    /// Parse the arguments of a directive attribute. A bare attribute
    /// carries no arguments at all.
    pub fn from_attribute(attr: &Attribute) -> Result<Self, DarlingError> {
        match &attr.meta {
            Meta::Path(_) => Ok(Self::default()),
            Meta::List(list) => {
                let items = NestedMeta::parse_meta_list(list.tokens.clone())?;
                Self::from_list(&items)
            }
            Meta::NameValue(name_value) => {
                Err(DarlingError::unsupported_format("name-value").with_span(name_value))
            }
        }
    }
}

///
/// SymbolError
///
/// Why one directive attribute has no symbol form.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SymbolError {
    #[error("malformed directive: {0}")]
    Malformed(String),

    #[error("attribute is not set")]
    Missing,

    #[error(transparent)]
    Path(#[from] PathError),
}

///
/// Directive
///

#[derive(Clone, Debug)]
pub struct Directive {
    pub args: DirectiveArgs,
    pub constructor_parameters: Result<Vec<TypeRef>, SymbolError>,
    pub country_parameterized_class: Result<TypeRef, SymbolError>,
}

impl Directive {
    /// Load a directive attribute, resolving its paths in `scope`.
    /// Never fails: problems are kept per attribute for extraction.
    #[must_use]
    pub fn load(attr: &Attribute, scope: &ModuleScope) -> Self {
        match DirectiveArgs::from_attribute(attr) {
            Ok(args) => Self::resolve(args, scope),
            Err(err) => {
                let reason = SymbolError::Malformed(err.to_string());

                Self {
                    args: DirectiveArgs::default(),
                    constructor_parameters: Err(reason.clone()),
                    country_parameterized_class: Err(reason),
                }
            }
        }
    }

    #[must_use]
    pub fn resolve(args: DirectiveArgs, scope: &ModuleScope) -> Self {
        let constructor_parameters = match &args.constructor_parameters {
            Some(list) => list
                .iter()
                .map(|path| scope.resolve(path).map_err(SymbolError::from))
                .collect(),
            None => Err(SymbolError::Missing),
        };

        let country_parameterized_class = match &args.country_parameterized_class {
            Some(base) => scope.resolve(base).map_err(SymbolError::from),
            None => Err(SymbolError::Missing),
        };

        Self {
            args,
            constructor_parameters,
            country_parameterized_class,
        }
    }
}

///
/// TESTS
///
