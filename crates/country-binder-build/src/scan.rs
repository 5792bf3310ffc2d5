use crate::{
    directive::Directive,
    render::render_type,
    source::{DeclarationSet, Module},
    types::TypeRef,
};
use std::{fmt, path::PathBuf};
use syn::{Fields, Item, ItemStruct};

///
/// SourceOrigin
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceOrigin {
    pub file: PathBuf,
    pub line: usize,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

///
/// FieldDescriptor
///
/// One annotated field, as found by the scanner.
///

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub enclosing: TypeRef,
    pub field_name: String,
    pub field_type: String,
    pub directive: Directive,
    pub origin: SourceOrigin,
}

impl FieldDescriptor {
    /// `crate::sales::Order::code_field`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.enclosing, self.field_name)
    }
}

///
/// DirectiveScanner
///

pub struct DirectiveScanner<'a> {
    attribute: &'a str,
}

impl<'a> DirectiveScanner<'a> {
    #[must_use]
    pub const fn new(attribute: &'a str) -> Self {
        Self { attribute }
    }

    /// Every named struct field carrying the directive, in module order and
    /// then declaration order.
    #[must_use]
    pub fn scan(&self, decls: &DeclarationSet) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();

        for module in decls.modules() {
            for item in &module.items {
                if let Item::Struct(item_struct) = item {
                    self.scan_struct(module, item_struct, &mut fields);
                }
            }
        }

        fields
    }

    fn scan_struct(&self, module: &Module, item: &ItemStruct, out: &mut Vec<FieldDescriptor>) {
        let Fields::Named(named) = &item.fields else {
            return;
        };

        let enclosing = module.namespace.qualify(&item.ident.to_string());

        for field in &named.named {
            let Some(ident) = &field.ident else {
                continue;
            };
            let Some(attr) = field
                .attrs
                .iter()
                .find(|attr| attr.path().is_ident(self.attribute))
            else {
                continue;
            };

            out.push(FieldDescriptor {
                enclosing: enclosing.clone(),
                field_name: ident.to_string(),
                field_type: render_type(&field.ty),
                directive: Directive::load(attr, &module.scope),
                origin: SourceOrigin {
                    file: module.file.clone(),
                    line: ident.span().start().line,
                },
            });
        }
    }
}

///
/// TESTS
///
