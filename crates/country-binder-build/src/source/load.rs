use super::{DeclarationSet, SourceError};
use crate::types::Namespace;
use std::{
    fs,
    path::{Path, PathBuf},
};

impl DeclarationSet {
    /// Parse every `.rs` file of the library crate below `source_root`.
    ///
    /// File paths map onto module paths the way rustc lays them out:
    /// `lib.rs` is the crate root, `a/mod.rs` and `a.rs` are `a`, `a/b.rs`
    /// is `a::b`. `main.rs` is the root only when there is no `lib.rs`;
    /// `bin/` holds separate crates and is never scanned.
    pub fn load(source_root: &Path, root: Namespace) -> Result<Self, SourceError> {
        let mut files = Vec::new();
        collect_rs_files(source_root, &mut files)?;

        let files = files
            .into_iter()
            .map(|file| {
                let relative = file.strip_prefix(source_root).unwrap_or(&file).to_path_buf();
                (relative, file)
            })
            .collect::<Vec<_>>();
        let has_lib = files.iter().any(|(relative, _)| is_lib_root(relative));

        let mut set = Self::new(root);
        for (relative, file) in files {
            if !belongs_to_crate(&relative, has_lib) {
                continue;
            }

            let text = fs::read_to_string(&file).map_err(|source| SourceError::Io {
                path: file.clone(),
                source,
            })?;
            set.insert_source(&relative, file, &text)?;
        }
        set.link_globs();

        Ok(set)
    }

    /// Build a declaration set from in-memory sources keyed by their path
    /// relative to the source root.
    pub fn from_sources<I, P, S>(root: Namespace, sources: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        let mut sources = sources
            .into_iter()
            .map(|(path, text)| (path.into(), text))
            .collect::<Vec<(PathBuf, S)>>();
        sources.sort_by(|a, b| a.0.cmp(&b.0));
        let has_lib = sources.iter().any(|(path, _)| is_lib_root(path));

        let mut set = Self::new(root);
        for (path, text) in sources {
            if belongs_to_crate(&path, has_lib) {
                set.insert_source(&path, path.clone(), text.as_ref())?;
            }
        }
        set.link_globs();

        Ok(set)
    }

    fn insert_source(
        &mut self,
        relative: &Path,
        file: PathBuf,
        text: &str,
    ) -> Result<(), SourceError> {
        let parsed = syn::parse_file(text).map_err(|source| SourceError::Parse {
            path: file.clone(),
            source,
        })?;

        let mut namespace = self.root().clone();
        for segment in module_segments(relative) {
            namespace = namespace.child(&segment);
        }

        self.insert(namespace, file, parsed.items)
    }
}

fn is_lib_root(relative: &Path) -> bool {
    relative == Path::new("lib.rs")
}

// `bin/**` are binary crates; `main.rs` next to `lib.rs` is one too.
fn belongs_to_crate(relative: &Path, has_lib: bool) -> bool {
    let in_bin = relative
        .components()
        .next()
        .is_some_and(|c| c.as_os_str() == "bin");
    let skipped = in_bin || (has_lib && relative == Path::new("main.rs"));

    if skipped {
        tracing::debug!(path = %relative.display(), "not part of the library crate");
    }

    !skipped
}

// module_segments
fn module_segments(relative: &Path) -> Vec<String> {
    let mut segments = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>();

    if let Some(stem) = relative.file_stem().map(|s| s.to_string_lossy().into_owned())
        && !matches!(stem.as_str(), "lib" | "main" | "mod")
    {
        segments.push(stem);
    }

    segments
}

// Sorted so module registration order never depends on the file system.
fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DeclKind;
    use crate::types::TypeRef;

    fn root() -> Namespace {
        Namespace::parse("crate").unwrap()
    }

    #[test]
    fn maps_file_paths_to_module_paths() {
        assert!(module_segments(Path::new("lib.rs")).is_empty());
        assert_eq!(module_segments(Path::new("geo.rs")), ["geo"]);
        assert_eq!(module_segments(Path::new("geo/mod.rs")), ["geo"]);
        assert_eq!(module_segments(Path::new("geo/nordic.rs")), ["geo", "nordic"]);
    }

    #[test]
    fn registers_inline_modules() {
        let set = DeclarationSet::from_sources(
            root(),
            [("lib.rs", "mod geo { pub trait Country {} pub struct France; }")],
        )
        .unwrap();

        let country = TypeRef::parse("crate::geo::Country").unwrap();
        let france = TypeRef::parse("crate::geo::France").unwrap();

        assert_eq!(set.lookup(&country), Some(DeclKind::Trait));
        assert_eq!(set.lookup(&france), Some(DeclKind::Struct));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn binary_roots_next_to_lib_are_not_scanned() {
        let set = DeclarationSet::from_sources(
            root(),
            [
                ("lib.rs", "pub mod geo;"),
                ("main.rs", "fn main() {}"),
                ("geo.rs", "pub trait Country {}"),
                ("bin/tool.rs", "pub struct Tool;"),
            ],
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.module(&Namespace::parse("crate::bin::tool").unwrap()).is_none());
        assert_eq!(
            set.module(&root()).unwrap().file,
            PathBuf::from("lib.rs")
        );
    }

    #[test]
    fn main_is_the_root_of_a_binary_only_crate() {
        let set = DeclarationSet::from_sources(root(), [("main.rs", "pub struct App;")]).unwrap();

        let app = TypeRef::parse("crate::App").unwrap();
        assert_eq!(set.lookup(&app), Some(DeclKind::Struct));
    }

    #[test]
    fn glob_imports_see_the_target_module() {
        let set = DeclarationSet::from_sources(
            root(),
            [
                ("lib.rs", "pub mod geo; pub mod sales;"),
                ("geo.rs", "pub trait Country {} pub use self::Country as Land;"),
                ("sales.rs", "use crate::geo::*; pub struct Order;"),
            ],
        )
        .unwrap();

        let sales = set.module(&Namespace::parse("crate::sales").unwrap()).unwrap();
        let country = sales.scope.resolve(&syn::parse_quote!(Country)).unwrap();
        let land = sales.scope.resolve(&syn::parse_quote!(Land)).unwrap();
        let order = sales.scope.resolve(&syn::parse_quote!(Order)).unwrap();

        assert_eq!(country.to_string(), "crate::geo::Country");
        assert_eq!(set.canonicalize(&land).map(|(ty, _)| ty), Some(country));
        assert_eq!(order.to_string(), "crate::sales::Order");
    }

    #[test]
    fn rejects_duplicate_module_files() {
        let err = DeclarationSet::from_sources(root(), [("geo.rs", ""), ("geo/mod.rs", "")])
            .unwrap_err();

        assert!(matches!(err, SourceError::DuplicateModule { .. }));
    }

    #[test]
    fn reports_parse_errors_with_the_file() {
        let err = DeclarationSet::from_sources(root(), [("broken.rs", "struct {")]).unwrap_err();

        match err {
            SourceError::Parse { path, .. } => assert_eq!(path, PathBuf::from("broken.rs")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
