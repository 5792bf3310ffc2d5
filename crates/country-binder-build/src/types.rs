use derive_more::Deref;
use std::fmt::{self, Display};

///
/// Namespace
///
/// Module path qualifying a declaration, e.g. `crate::geo`.
/// The empty namespace holds prelude and primitive names such as `String`.
///

#[derive(Clone, Debug, Default, Deref, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Namespace(Vec<String>);

impl Namespace {
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    #[must_use]
    /// Parse a `::`-separated module path. Empty segments are rejected.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Some(Self::default());
        }

        let segments = path.split("::").map(str::trim).collect::<Vec<_>>();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        Some(Self::new(segments))
    }

    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());

        Self(segments)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;

        Some(Self(rest.to_vec()))
    }

    /// True when `self` equals `outer` or is nested below it.
    #[must_use]
    pub fn is_within(&self, outer: &Self) -> bool {
        self.0.starts_with(&outer.0)
    }

    #[must_use]
    pub fn qualify(&self, name: &str) -> TypeRef {
        TypeRef::new(self.clone(), name)
    }

    /// Segments below `root`, or all segments when `self` is not under it.
    #[must_use]
    pub fn relative_to(&self, root: &Self) -> &[String] {
        self.0.strip_prefix(root.0.as_slice()).unwrap_or(&self.0)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("::"))
    }
}

///
/// TypeRef
///
/// Resolved reference to a type: its namespace plus simple name.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TypeRef {
    namespace: Namespace,
    name: String,
}

impl TypeRef {
    #[must_use]
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    #[must_use]
    /// Parse a qualified name such as `crate::geo::Country`.
    pub fn parse(qualified: &str) -> Option<Self> {
        let mut namespace = Namespace::parse(qualified)?;
        let name = namespace.0.pop()?;

        Some(Self { namespace, name })
    }

    #[must_use]
    pub fn from_segments(mut segments: Vec<String>) -> Option<Self> {
        let name = segments.pop()?;

        Some(Self {
            namespace: Namespace(segments),
            name,
        })
    }

    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// The namespace this type opens when used as a module path.
    #[must_use]
    pub fn as_namespace(&self) -> Namespace {
        self.namespace.child(&self.name)
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.namespace, self.name)
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_qualified_name_minus_last_segment() {
        let ty = TypeRef::parse("crate::geo::Country").unwrap();

        assert_eq!(ty.namespace().to_string(), "crate::geo");
        assert_eq!(ty.simple_name(), "Country");
        assert_eq!(ty.to_string(), "crate::geo::Country");
    }

    #[test]
    fn unqualified_names_render_bare() {
        let ty = TypeRef::parse("String").unwrap();

        assert!(ty.namespace().is_empty());
        assert_eq!(ty.to_string(), "String");
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(TypeRef::parse("crate::::Country").is_none());
        assert!(TypeRef::parse("").is_none());
    }

    #[test]
    fn nested_namespaces_are_within_their_parent() {
        let geo = Namespace::parse("crate::geo").unwrap();
        let nordic = geo.child("nordic");

        assert!(nordic.is_within(&geo));
        assert!(geo.is_within(&geo));
        assert!(!geo.is_within(&nordic));
        assert!(!Namespace::parse("crate::geography").unwrap().is_within(&geo));
    }

    #[test]
    fn relative_path_strips_crate_root() {
        let root = Namespace::parse("crate").unwrap();
        let ns = Namespace::parse("crate::sales::orders").unwrap();

        assert_eq!(ns.relative_to(&root), ["sales", "orders"]);
        assert!(root.relative_to(&root).is_empty());
    }
}
