use crate::{
    emit::{FieldBinding, GeneratedUnit, SourceEmitter},
    extract::MetadataExtractor,
    group::GroupingIndex,
    registry::{ImplRegistry, ResolutionError, SubtypeResolver},
    scan::{DirectiveScanner, FieldDescriptor},
    sink::{Diagnostic, DiagnosticSink, EmissionError, FileSink},
    source::DeclarationSet,
    types::{Namespace, TypeRef},
};
use country_binder_config_build::{DEFAULT_ATTRIBUTE, DEFAULT_UNIT_SUFFIX};
use std::{collections::BTreeMap, fmt, path::PathBuf};
use thiserror::Error as ThisError;
use tracing::{debug, info, info_span, warn};

///
/// Phase
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Scan,
    Group,
    Extract,
    Validate,
    Resolve,
    Emit,
    Commit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scan => "scan",
            Self::Group => "group",
            Self::Extract => "extract",
            Self::Validate => "validate",
            Self::Resolve => "resolve",
            Self::Emit => "emit",
            Self::Commit => "commit",
        };

        f.write_str(label)
    }
}

///
/// RoundError
///
/// Aborts the round. Nothing has been written when one is returned.
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum RoundError {
    #[error("{phase} failed: {source}")]
    Emission {
        phase: Phase,
        #[source]
        source: EmissionError,
    },

    #[error("{phase} failed for {enclosing}: {source}")]
    Resolution {
        phase: Phase,
        enclosing: TypeRef,
        #[source]
        source: ResolutionError,
    },
}

impl RoundError {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Emission { phase, .. } | Self::Resolution { phase, .. } => *phase,
        }
    }

    /// Enclosing type whose group failed, if the failure belongs to one.
    #[must_use]
    pub const fn enclosing(&self) -> Option<&TypeRef> {
        match self {
            Self::Emission { .. } => None,
            Self::Resolution { enclosing, .. } => Some(enclosing),
        }
    }
}

///
/// RoundReport
///

#[derive(Clone, Debug, Default)]
pub struct RoundReport {
    pub units: Vec<GeneratedUnit>,
    pub emitted_fields: usize,
    pub skipped_fields: usize,

    /// Implementor count per base type referenced by an emitted field.
    pub implementors: BTreeMap<TypeRef, usize>,
}

///
/// GenerationRound
///

#[derive(Clone, Debug)]
pub struct GenerationRound {
    root: Namespace,
    attribute: String,
    unit_suffix: String,
    include_nested: bool,
}

impl GenerationRound {
    #[must_use]
    pub fn new(root: Namespace) -> Self {
        Self {
            root,
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            unit_suffix: DEFAULT_UNIT_SUFFIX.to_string(),
            include_nested: true,
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    #[must_use]
    pub fn with_unit_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.unit_suffix = suffix.into();
        self
    }

    #[must_use]
    pub const fn include_nested_namespaces(mut self, include: bool) -> Self {
        self.include_nested = include;
        self
    }

    /// Run one round over `decls`.
    ///
    /// Fields whose directive does not resolve are reported and skipped.
    /// A base type that cannot be resolved, or a failed commit, aborts the
    /// round; units are only handed to `files` once every group succeeded.
    pub fn run(
        &self,
        decls: &DeclarationSet,
        diagnostics: &mut dyn DiagnosticSink,
        files: &mut dyn FileSink,
    ) -> Result<RoundReport, RoundError> {
        let span = info_span!("generation_round", root = %self.root, attribute = %self.attribute);
        let _enter = span.enter();

        debug!(phase = %Phase::Scan, modules = decls.len());
        let fields = DirectiveScanner::new(&self.attribute).scan(decls);

        debug!(phase = %Phase::Group, fields = fields.len());
        let groups = GroupingIndex::build(fields);

        let registry = ImplRegistry::build(decls, self.include_nested);
        let resolver = SubtypeResolver::new(decls, &registry);
        let emitter = SourceEmitter::new(&self.root, &self.unit_suffix);

        let mut report = RoundReport::default();
        let mut units = Vec::with_capacity(groups.len());

        for (enclosing, fields) in groups.iter() {
            debug!(%enclosing, fields = fields.len(), "processing group");

            let mut bindings = Vec::with_capacity(fields.len());
            for field in fields {
                let Some(binding) = self.bind(field, &resolver, diagnostics)? else {
                    report.skipped_fields += 1;
                    continue;
                };

                report
                    .implementors
                    .insert(binding.metadata.base_type.clone(), binding.subtypes.len());
                bindings.push(binding);
            }

            debug!(phase = %Phase::Emit, %enclosing, bindings = bindings.len());
            report.emitted_fields += bindings.len();
            units.push(emitter.emit(enclosing, &bindings));
        }

        if let Err(source) = check_unit_paths(&units) {
            return Err(abort(Phase::Emit, source, diagnostics));
        }

        debug!(phase = %Phase::Commit, units = units.len());
        if let Err(source) = files.commit(&units) {
            return Err(abort(Phase::Commit, source, diagnostics));
        }

        info!(
            units = units.len(),
            emitted = report.emitted_fields,
            skipped = report.skipped_fields,
            "generation round complete"
        );
        report.units = units;

        Ok(report)
    }

    // Extract, validate and resolve one field. Ok(None) means the field was
    // reported and skipped.
    fn bind<'f>(
        &self,
        field: &'f FieldDescriptor,
        resolver: &SubtypeResolver<'_>,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<Option<FieldBinding<'f>>, RoundError> {
        debug!(phase = %Phase::Extract, field = %field.field_name);
        let metadata = match MetadataExtractor.extract(field) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(phase = %Phase::Validate, field = %field.qualified_name(), %err, "skipping field");
                diagnostics.report(
                    Diagnostic::error(format!("{}: {err}", self.attribute)).on_field(field),
                );

                return Ok(None);
            }
        };

        let subtypes = match resolver.resolve(&metadata.base_type) {
            Ok(subtypes) => subtypes,
            Err(source) => {
                let err = RoundError::Resolution {
                    phase: Phase::Resolve,
                    enclosing: field.enclosing.clone(),
                    source,
                };
                diagnostics.report(Diagnostic::error(err.to_string()).on_field(field));

                return Err(err);
            }
        };

        Ok(Some(FieldBinding {
            field,
            metadata,
            subtypes,
        }))
    }
}

fn abort(phase: Phase, source: EmissionError, diagnostics: &mut dyn DiagnosticSink) -> RoundError {
    let err = RoundError::Emission { phase, source };
    diagnostics.report(Diagnostic::error(err.to_string()));

    err
}

// Distinct type names can snake-case to the same file name.
fn check_unit_paths(units: &[GeneratedUnit]) -> Result<(), EmissionError> {
    let mut claimed = BTreeMap::<&PathBuf, &TypeRef>::new();

    for unit in units {
        if let Some(first) = claimed.insert(&unit.path, &unit.enclosing) {
            return Err(EmissionError::PathCollision {
                path: unit.path.clone(),
                first: first.clone(),
                second: unit.enclosing.clone(),
            });
        }
    }

    Ok(())
}

///
/// TESTS
///
