//! Collaborators the generation round reports to and writes through.

use crate::{
    emit::GeneratedUnit,
    scan::{FieldDescriptor, SourceOrigin},
    types::TypeRef,
};
use derive_more::{Deref, IntoIterator};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error as ThisError;

///
/// Severity
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Severity {
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Error => "error",
        };

        f.write_str(label)
    }
}

///
/// Diagnostic
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,

    /// Field the diagnostic refers to, when there is one.
    pub origin: Option<SourceOrigin>,
    pub element: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            origin: None,
            element: None,
        }
    }

    #[must_use]
    pub fn on_field(mut self, field: &FieldDescriptor) -> Self {
        self.origin = Some(field.origin.clone());
        self.element = Some(field.qualified_name());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(origin) = &self.origin {
            write!(f, "{origin}: ")?;
        }
        if let Some(element) = &self.element {
            write!(f, "{element}: ")?;
        }

        f.write_str(&self.message)
    }
}

///
/// DiagnosticSink
///

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

///
/// Diagnostics
///
/// In-memory collector.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }
}

///
/// CargoDiagnostics
///
/// Forwards every diagnostic to Cargo as a `cargo:warning=` line and keeps
/// a copy so the caller can decide whether the build script fails.
///

#[derive(Debug, Default, Deref)]
pub struct CargoDiagnostics {
    #[deref]
    reported: Diagnostics,
}

impl CargoDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for CargoDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        println!("cargo:warning={diagnostic}");
        self.reported.report(diagnostic);
    }
}

///
/// EmissionError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum EmissionError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{first} and {second} would both be written to {path}")]
    PathCollision {
        path: PathBuf,
        first: TypeRef,
        second: TypeRef,
    },
}

impl EmissionError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

///
/// FileSink
///
/// Receives every unit of a round at once; a failed commit leaves the
/// output as it was before.
///

pub trait FileSink {
    fn commit(&mut self, units: &[GeneratedUnit]) -> Result<(), EmissionError>;
}

///
/// FsFileSink
///

#[derive(Debug)]
pub struct FsFileSink {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
    unchanged: Vec<PathBuf>,
}

impl FsFileSink {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Vec::new(),
            unchanged: Vec::new(),
        }
    }

    /// Files rewritten by the last commit.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Files the last commit left alone because their contents matched.
    #[must_use]
    pub fn unchanged(&self) -> &[PathBuf] {
        &self.unchanged
    }

    // Write one unit next to its target. The temporary file deletes itself
    // when dropped, so an abandoned commit cleans up after itself.
    fn stage(target: &Path, contents: &str) -> Result<NamedTempFile, EmissionError> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(EmissionError::io(dir))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(EmissionError::io(target))?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            writer
                .write_all(contents.as_bytes())
                .and_then(|()| writer.flush())
                .map_err(EmissionError::io(target))?;
        }

        Ok(staged)
    }

    // Undo the persisted part of a failed commit, newest first.
    fn roll_back(persisted: &[(PathBuf, Option<Vec<u8>>)]) {
        for (target, previous) in persisted.iter().rev() {
            let restored = match previous {
                Some(bytes) => fs::write(target, bytes),
                None => fs::remove_file(target),
            };

            if let Err(err) = restored {
                tracing::warn!(path = %target.display(), %err, "failed to roll back generated unit");
            }
        }
    }
}

impl FileSink for FsFileSink {
    fn commit(&mut self, units: &[GeneratedUnit]) -> Result<(), EmissionError> {
        self.written.clear();
        self.unchanged.clear();

        let mut staged = Vec::new();
        for unit in units {
            let target = self.out_dir.join(&unit.path);
            let contents = unit.contents();

            if fs::read_to_string(&target).is_ok_and(|existing| existing == contents) {
                self.unchanged.push(target);
                continue;
            }

            staged.push((Self::stage(&target, &contents)?, target));
        }

        let mut persisted = Vec::with_capacity(staged.len());
        for (file, target) in staged {
            let previous = fs::read(&target).ok();

            if let Err(err) = file.persist(&target) {
                Self::roll_back(&persisted);
                return Err(EmissionError::io(&target)(err.error));
            }
            tracing::debug!(path = %target.display(), "wrote generated unit");
            persisted.push((target, previous));
        }

        self.written = persisted.into_iter().map(|(target, _)| target).collect();

        Ok(())
    }
}

///
/// MemoryFileSink
///
/// Keeps committed units keyed by their relative path.
///

#[derive(Clone, Debug, Default, Deref)]
pub struct MemoryFileSink {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFileSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }
}

impl FileSink for MemoryFileSink {
    fn commit(&mut self, units: &[GeneratedUnit]) -> Result<(), EmissionError> {
        for unit in units {
            self.files.insert(unit.path.clone(), unit.contents());
        }

        Ok(())
    }
}

///
/// TESTS
///
