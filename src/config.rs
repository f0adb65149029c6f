use std::path::PathBuf;

use crate::constants::ingest::{DEFAULT_QUOTA, DEFAULT_SEED};
use crate::constants::paths::{
    DEFAULT_ADJUDICATION_OUT, DEFAULT_ANNOTATIONS, DEFAULT_CATALOG, DEFAULT_RATING_OUT,
};
use crate::constants::schema::BOOKKEEPING_FIELDS;
use crate::types::FieldName;

/// Controls how annotation export fields beyond the core schema are handled.
#[derive(Clone, Debug)]
pub struct SchemaPolicy {
    /// Fields dropped on load (UI bookkeeping, rendered HTML).
    pub ignored_fields: Vec<FieldName>,
    /// Item fields kept and carried into consolidated output.
    pub passthrough_fields: Vec<FieldName>,
    /// When false, any other field is a schema error. When true it is dropped with a warning.
    pub allow_unknown_fields: bool,
}

impl Default for SchemaPolicy {
    fn default() -> Self {
        Self {
            ignored_fields: BOOKKEEPING_FIELDS.iter().map(|f| f.to_string()).collect(),
            passthrough_fields: Vec::new(),
            allow_unknown_fields: false,
        }
    }
}

impl SchemaPolicy {
    /// Add an item field that should survive consolidation.
    pub fn with_passthrough_field(mut self, field: impl Into<FieldName>) -> Self {
        self.passthrough_fields.push(field.into());
        self
    }

    /// Add a field to drop on load.
    pub fn with_ignored_field(mut self, field: impl Into<FieldName>) -> Self {
        self.ignored_fields.push(field.into());
        self
    }

    /// Switch between strict and lenient handling of unknown fields.
    pub fn with_unknown_fields_allowed(mut self, allow: bool) -> Self {
        self.allow_unknown_fields = allow;
        self
    }
}

/// Output file per subset. `None` skips writing that subset.
#[derive(Clone, Debug)]
pub struct SubsetOutputs {
    /// Catalog rows of items that need more ratings.
    pub rating: Option<PathBuf>,
    /// Consolidated records that need adjudication.
    pub adjudication: Option<PathBuf>,
    /// Consolidated records both annotators rated all 3s.
    pub approved: Option<PathBuf>,
    /// Consolidated records with a 1 on any dimension.
    pub rejected: Option<PathBuf>,
}

impl Default for SubsetOutputs {
    fn default() -> Self {
        Self {
            rating: Some(PathBuf::from(DEFAULT_RATING_OUT)),
            adjudication: Some(PathBuf::from(DEFAULT_ADJUDICATION_OUT)),
            approved: None,
            rejected: None,
        }
    }
}

/// Everything a single aggregation run needs. Passed explicitly into
/// [`crate::pipeline::run_pipeline`]; nothing is read from process state.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Annotation export (JSONL).
    pub annotations: PathBuf,
    /// Item catalog (CSV) used to re-queue incomplete items.
    pub catalog: PathBuf,
    /// Exports of already-adjudicated items (JSONL, only `idx` is read).
    pub adjudicated: Vec<PathBuf>,
    /// Optional destination for the validated, bookkeeping-stripped annotations.
    pub clean_annotations: Option<PathBuf>,
    /// Field handling for the annotation export.
    pub schema: SchemaPolicy,
    /// Where each subset is written.
    pub outputs: SubsetOutputs,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            annotations: PathBuf::from(DEFAULT_ANNOTATIONS),
            catalog: PathBuf::from(DEFAULT_CATALOG),
            adjudicated: Vec::new(),
            clean_annotations: None,
            schema: SchemaPolicy::default(),
            outputs: SubsetOutputs::default(),
        }
    }
}

/// Assigns a fixed annotator quota to a run of consecutive catalog rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaTier {
    /// Number of rows covered by this tier.
    pub rows: usize,
    /// Annotators requested per row; `0` means "every annotator".
    pub annotators: u32,
}

/// Catalog ingestion settings.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// RNG seed for the shuffle and sample.
    pub seed: u64,
    /// Shuffle the catalog before writing.
    pub shuffle: bool,
    /// When set, draw this many rows into the primary output and write the rest separately.
    pub sample_size: Option<usize>,
    /// Quota tiers applied in order to the (shuffled) primary output.
    pub quota_tiers: Vec<QuotaTier>,
    /// Quota for rows past the last tier; only used when tiers are present.
    pub default_quota: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            shuffle: true,
            sample_size: None,
            quota_tiers: Vec::new(),
            default_quota: DEFAULT_QUOTA,
        }
    }
}
