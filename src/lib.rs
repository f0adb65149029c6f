#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Completeness and agreement filters.
pub mod agreement;
/// Command-line runners shared by the binaries.
pub mod apps;
/// Item catalog loading, shuffling, sampling, and quota assignment.
pub mod catalog;
/// Pipeline and ingestion configuration types.
pub mod config;
/// Revision consolidation.
pub mod consolidate;
/// Centralized constants: schema field names, rating bounds, default paths.
pub mod constants;
/// Annotation, rating, and output record types.
pub mod data;
/// Grouping of annotation records by item.
pub mod grouping;
/// Annotation export ingestion and schema validation.
pub mod ingestion;
/// Per-annotator progress metrics.
pub mod metrics;
/// End-to-end entry points.
pub mod pipeline;
/// Subset routing.
pub mod router;
/// Input/output transports (JSONL files today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use agreement::{Agreement, Completeness, agreement, completeness, rated_pair};
pub use config::{IngestConfig, PipelineConfig, QuotaTier, SchemaPolicy, SubsetOutputs};
pub use consolidate::consolidate;
pub use data::{AnnotationRecord, CatalogItem, ConsolidatedRecord, ItemText, Rating, Scores};
pub use errors::PipelineError;
pub use grouping::{ItemGroup, group_by_item};
pub use pipeline::{IngestSummary, PipelineSummary, progress_report, run_ingest, run_pipeline};
pub use router::{RoutedSubsets, Subset, classify, route};
pub use types::{AnnotatorId, FieldName, ItemId};
