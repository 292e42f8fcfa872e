use syn::{Attribute, Type};

macro_rules! catch {
    ($result:expr) => {
        match $result {
            Ok(r) => r,
            Err(e) => {
                return proc_macro::TokenStream::from(darling::Error::from(e).write_errors());
            }
        }
    };
}

pub(crate) use catch;

/// Whether `ty` is written as `Option<..>` (any path ending in `Option`)
pub(crate) fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

pub(crate) fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
