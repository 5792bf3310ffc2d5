use quote::ToTokens;
use syn::{GenericArgument, Path, PathArguments, ReturnType, Type, TypeParamBound};

/// Render a type the way it is written in source.
///
/// `quote` spaces every token (`Vec < String >`); generated text keeps the
/// compact form instead.
#[must_use]
pub fn render_type(ty: &Type) -> String {
    let mut out = String::new();
    write_type(ty, &mut out);

    out
}

fn write_type(ty: &Type, out: &mut String) {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => write_path(&type_path.path, out),
        Type::Reference(reference) => {
            out.push('&');
            if let Some(lifetime) = &reference.lifetime {
                out.push_str(&lifetime.to_string());
                out.push(' ');
            }
            if reference.mutability.is_some() {
                out.push_str("mut ");
            }
            write_type(&reference.elem, out);
        }
        Type::Slice(slice) => {
            out.push('[');
            write_type(&slice.elem, out);
            out.push(']');
        }
        Type::Array(array) => {
            out.push('[');
            write_type(&array.elem, out);
            out.push_str("; ");
            out.push_str(&array.len.to_token_stream().to_string());
            out.push(']');
        }
        Type::Tuple(tuple) => {
            out.push('(');
            for (i, elem) in tuple.elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(elem, out);
            }
            if tuple.elems.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Type::Ptr(ptr) => {
            out.push_str(if ptr.mutability.is_some() { "*mut " } else { "*const " });
            write_type(&ptr.elem, out);
        }
        Type::TraitObject(object) => {
            if object.dyn_token.is_some() {
                out.push_str("dyn ");
            }
            write_bounds(object.bounds.iter(), out);
        }
        Type::ImplTrait(imp) => {
            out.push_str("impl ");
            write_bounds(imp.bounds.iter(), out);
        }
        Type::Group(group) => write_type(&group.elem, out),
        Type::Paren(paren) => {
            out.push('(');
            write_type(&paren.elem, out);
            out.push(')');
        }
        Type::Never(_) => out.push('!'),
        Type::Infer(_) => out.push('_'),
        other => out.push_str(&other.to_token_stream().to_string()),
    }
}

fn write_bounds<'a>(bounds: impl Iterator<Item = &'a TypeParamBound>, out: &mut String) {
    for (i, bound) in bounds.enumerate() {
        if i > 0 {
            out.push_str(" + ");
        }
        match bound {
            TypeParamBound::Trait(trait_bound) => write_path(&trait_bound.path, out),
            TypeParamBound::Lifetime(lifetime) => out.push_str(&lifetime.to_string()),
            other => out.push_str(&other.to_token_stream().to_string()),
        }
    }
}

fn write_path(path: &Path, out: &mut String) {
    if path.leading_colon.is_some() {
        out.push_str("::");
    }

    for (i, segment) in path.segments.iter().enumerate() {
        if i > 0 {
            out.push_str("::");
        }
        out.push_str(&segment.ident.to_string());

        match &segment.arguments {
            PathArguments::None => {}
            PathArguments::AngleBracketed(args) => {
                if args.colon2_token.is_some() {
                    out.push_str("::");
                }
                out.push('<');
                for (i, arg) in args.args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_generic_argument(arg, out);
                }
                out.push('>');
            }
            PathArguments::Parenthesized(args) => {
                out.push('(');
                for (i, input) in args.inputs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(input, out);
                }
                out.push(')');
                if let ReturnType::Type(_, ty) = &args.output {
                    out.push_str(" -> ");
                    write_type(ty, out);
                }
            }
        }
    }
}

fn write_generic_argument(arg: &GenericArgument, out: &mut String) {
    match arg {
        GenericArgument::Type(ty) => write_type(ty, out),
        GenericArgument::Lifetime(lifetime) => out.push_str(&lifetime.to_string()),
        GenericArgument::AssocType(assoc) => {
            out.push_str(&assoc.ident.to_string());
            out.push_str(" = ");
            write_type(&assoc.ty, out);
        }
        other => out.push_str(&other.to_token_stream().to_string()),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn render(ty: Type) -> String {
        render_type(&ty)
    }

    #[test]
    fn renders_paths_compactly() {
        assert_eq!(render(parse_quote!(String)), "String");
        assert_eq!(render(parse_quote!(Vec<String>)), "Vec<String>");
        assert_eq!(
            render(parse_quote!(std::collections::BTreeMap<String, Vec<u8>>)),
            "std::collections::BTreeMap<String, Vec<u8>>"
        );
    }

    #[test]
    fn renders_compound_types() {
        assert_eq!(render(parse_quote!(&'static str)), "&'static str");
        assert_eq!(render(parse_quote!(&mut [u8])), "&mut [u8]");
        assert_eq!(render(parse_quote!([u8; 2])), "[u8; 2]");
        assert_eq!(render(parse_quote!((String, u32))), "(String, u32)");
        assert_eq!(render(parse_quote!((String,))), "(String,)");
        assert_eq!(render(parse_quote!(Box<dyn Fn(u8) -> bool>)), "Box<dyn Fn(u8) -> bool>");
        assert_eq!(render(parse_quote!(Option<Box<dyn Country + Send>>)), "Option<Box<dyn Country + Send>>");
    }
}
