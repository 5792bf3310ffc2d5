//! Build-time generator for country field binders.
//!
//! A build script scans its crate's sources for fields carrying
//! `#[country_field_binder(..)]`, groups them by enclosing struct, resolves
//! every implementor of each field's base trait and writes one
//! `<Struct>Binder` unit per struct into `OUT_DIR`.

mod macros;

pub mod directive;
pub mod emit;
pub mod extract;
pub mod group;
pub mod registry;
pub mod render;
pub mod round;
pub mod scan;
pub mod sink;
pub mod source;
pub mod types;

pub use country_binder_config_build::{
    BinderConfig, CONFIG_FILE, ConfigError, DEFAULT_ATTRIBUTE, DEFAULT_UNIT_SUFFIX,
};
pub use round::{GenerationRound, RoundError, RoundReport};

use crate::{
    sink::{CargoDiagnostics, FsFileSink},
    source::{DeclarationSet, SourceError},
    types::Namespace,
};
use std::path::Path;
use thiserror::Error as ThisError;

///
/// Error
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl GenerationRound {
    /// Round settings taken from a validated configuration.
    #[must_use]
    pub fn from_config(config: &BinderConfig) -> Self {
        Self::new(crate_namespace(config))
            .with_attribute(config.attribute.as_str())
            .with_unit_suffix(config.unit_suffix.as_str())
            .include_nested_namespaces(config.include_nested_namespaces)
    }
}

// validate() has already checked every segment
fn crate_namespace(config: &BinderConfig) -> Namespace {
    Namespace::new(config.crate_namespace.split("::"))
}

/// Run one generation round for the crate at `manifest_dir`, writing units
/// below `out_dir`.
pub fn generate(
    config: &BinderConfig,
    manifest_dir: &Path,
    out_dir: &Path,
) -> Result<RoundReport, Error> {
    config.validate()?;

    let source_root = manifest_dir.join(&config.source_root);
    println!("cargo:rerun-if-changed={}", source_root.display());

    let decls = DeclarationSet::load(&source_root, crate_namespace(config))?;

    let out_dir = match &config.out_subdir {
        Some(subdir) => out_dir.join(subdir),
        None => out_dir.to_path_buf(),
    };

    let mut diagnostics = CargoDiagnostics::new();
    let mut files = FsFileSink::new(out_dir);
    let report = GenerationRound::from_config(config).run(&decls, &mut diagnostics, &mut files)?;

    Ok(report)
}

/// Load `country-binder.toml` from `manifest_dir` when it exists, then
/// [`generate`].
pub fn generate_crate(manifest_dir: &Path, out_dir: &Path) -> Result<RoundReport, Error> {
    let config_path = manifest_dir.join(CONFIG_FILE);
    println!("cargo:rerun-if-changed={}", config_path.display());

    let config = BinderConfig::load_or_default(&config_path)?;

    generate(&config, manifest_dir, out_dir)
}

///
/// TESTS
///
