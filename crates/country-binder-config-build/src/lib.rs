//! Build-time configuration for the country binder generator, read from
//! `country-binder.toml` next to the crate manifest.

use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

pub const CONFIG_FILE: &str = "country-binder.toml";
pub const DEFAULT_ATTRIBUTE: &str = "country_field_binder";
pub const DEFAULT_UNIT_SUFFIX: &str = "Binder";

///
/// ConfigError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

///
/// BinderConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BinderConfig {
    /// Directory holding the crate sources, relative to the manifest.
    pub source_root: PathBuf,

    /// Path that `crate::` refers to in generated names.
    pub crate_namespace: String,

    /// Field attribute that marks a binder directive.
    pub attribute: String,

    /// Appended to the enclosing type name to name each unit.
    pub unit_suffix: String,

    /// Count implementors declared in modules nested below the base trait.
    pub include_nested_namespaces: bool,

    /// Write units below this directory inside `OUT_DIR`.
    pub out_subdir: Option<PathBuf>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("src"),
            crate_namespace: "crate".to_string(),
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            unit_suffix: DEFAULT_UNIT_SUFFIX.to_string(),
            include_nested_namespaces: true,
            out_subdir: None,
        }
    }
}

impl BinderConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&text, path)
    }

    /// Defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_ident(&self.attribute) {
            return Err(ConfigError::Invalid(format!(
                "attribute '{}' is not an identifier",
                self.attribute
            )));
        }

        if self.crate_namespace.split("::").any(|segment| !is_ident(segment)) {
            return Err(ConfigError::Invalid(format!(
                "crate_namespace '{}' is not a module path",
                self.crate_namespace
            )));
        }

        // appended to a type name, so a leading digit is fine
        let suffix_ok = !self.unit_suffix.is_empty()
            && self
                .unit_suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !suffix_ok {
            return Err(ConfigError::Invalid(format!(
                "unit_suffix '{}' cannot extend a type name",
                self.unit_suffix
            )));
        }

        Ok(())
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && s != "_"
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<BinderConfig, ConfigError> {
        BinderConfig::from_toml_str(text, Path::new(CONFIG_FILE))
    }

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse("").unwrap(), BinderConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse(
            r#"
            attribute = "binder"
            unit_suffix = "Bindings"
            include_nested_namespaces = false
            out_subdir = "binders"
            "#,
        )
        .unwrap();

        assert_eq!(config.attribute, "binder");
        assert_eq!(config.unit_suffix, "Bindings");
        assert!(!config.include_nested_namespaces);
        assert_eq!(config.out_subdir, Some(PathBuf::from("binders")));
        assert_eq!(config.source_root, PathBuf::from("src"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(parse("atribute = \"x\""), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn identifiers_are_validated() {
        assert!(matches!(parse("attribute = \"two words\""), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse("crate_namespace = \"crate::\""), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse("unit_suffix = \"\""), Err(ConfigError::Invalid(_))));
        assert!(parse("crate_namespace = \"crate::app\"").is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BinderConfig::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config, BinderConfig::default());
    }
}
