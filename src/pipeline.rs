//! End-to-end entry points: sampling, catalog ingestion, progress.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::{assign_quotas, load_catalog, sample_split, shuffle_items};
use crate::config::{IngestConfig, PipelineConfig};
use crate::errors::PipelineError;
use crate::grouping::group_by_item;
use crate::ingestion::{load_adjudicated_ids, load_annotations, load_annotator_ids};
use crate::metrics::{AnnotatorProgress, annotator_counts, annotator_progress};
use crate::router::{RoutedSubsets, Subset, route};
use crate::transport::fs::write_jsonl;

/// What a sampling run produced.
#[derive(Clone, Debug)]
pub struct PipelineSummary {
    /// Annotation records read.
    pub records: usize,
    /// Distinct items seen in the annotations.
    pub items: usize,
    /// Items per subset.
    pub counts: BTreeMap<Subset, usize>,
    /// Files written per subset.
    pub written: BTreeMap<Subset, PathBuf>,
}

/// Load annotations, route every item, and write the configured subsets.
///
/// Subset files are only written once routing, including the disjointness
/// check, has succeeded.
pub fn run_pipeline(
    config: &PipelineConfig,
) -> Result<(PipelineSummary, RoutedSubsets), PipelineError> {
    let records = load_annotations(&config.annotations, &config.schema)?;
    let record_count = records.len();
    if let Some(path) = &config.clean_annotations {
        let written = write_jsonl(path, &records)?;
        info!(path = %path.display(), records = written, "wrote cleaned annotations");
    }

    let catalog = load_catalog(&config.catalog)?;
    let adjudicated = load_adjudicated_ids(&config.adjudicated)?;
    let groups = group_by_item(records)?;
    let routed = route(&groups, &catalog, &adjudicated)?;

    let outputs = &config.outputs;
    let mut written = BTreeMap::new();
    if let Some(path) = &outputs.rating {
        write_subset(&mut written, Subset::Rating, path, &routed.rating)?;
    }
    if let Some(path) = &outputs.adjudication {
        write_subset(&mut written, Subset::Adjudication, path, &routed.adjudication)?;
    }
    if let Some(path) = &outputs.approved {
        write_subset(&mut written, Subset::Approved, path, &routed.approved)?;
    }
    if let Some(path) = &outputs.rejected {
        write_subset(&mut written, Subset::Rejected, path, &routed.rejected)?;
    }

    let summary = PipelineSummary {
        records: record_count,
        items: groups.len(),
        counts: routed.counts(),
        written,
    };
    Ok((summary, routed))
}

fn write_subset<T: serde::Serialize>(
    written: &mut BTreeMap<Subset, PathBuf>,
    subset: Subset,
    path: &Path,
    items: &[T],
) -> Result<(), PipelineError> {
    let lines = write_jsonl(path, items)?;
    info!(%subset, path = %path.display(), lines, "wrote subset");
    written.insert(subset, path.to_path_buf());
    Ok(())
}

/// What a catalog ingestion run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestSummary {
    /// Rows written to the primary output.
    pub primary: usize,
    /// Rows written to the remainder output, when sampling.
    pub remainder: Option<usize>,
}

/// Shuffle and optionally sample a CSV catalog into JSONL annotation inputs.
///
/// With `sample_size` set, the sample goes to `primary_out` and the rest (in
/// catalog order) to `remainder_out`, which is then required.
pub fn run_ingest(
    catalog: &Path,
    config: &IngestConfig,
    primary_out: &Path,
    remainder_out: Option<&Path>,
) -> Result<IngestSummary, PipelineError> {
    let items = load_catalog(catalog)?;
    let (mut primary, remainder) = match config.sample_size {
        Some(size) => {
            let out = remainder_out.ok_or_else(|| {
                PipelineError::Configuration(
                    "a remainder output path is required when sampling".to_string(),
                )
            })?;
            let (sampled, rest) = sample_split(items, size, config.seed)?;
            (sampled, Some((rest, out)))
        }
        None if config.shuffle => (shuffle_items(items, config.seed), None),
        None => (items, None),
    };

    if !config.quota_tiers.is_empty() {
        assign_quotas(&mut primary, &config.quota_tiers, config.default_quota);
    }

    let primary_count = write_jsonl(primary_out, &primary)?;
    let remainder_count = match remainder {
        Some((rest, out)) => Some(write_jsonl(out, &rest)?),
        None => None,
    };
    info!(
        catalog = %catalog.display(),
        primary = primary_count,
        remainder = ?remainder_count,
        "ingested catalog"
    );
    Ok(IngestSummary {
        primary: primary_count,
        remainder: remainder_count,
    })
}

/// Count annotations per annotator, keeping ids that start with `prefix`.
pub fn progress_report(
    annotations: &Path,
    prefix: Option<&str>,
) -> Result<Option<AnnotatorProgress>, PipelineError> {
    let ids = load_annotator_ids(annotations)?;
    let counts = annotator_counts(ids.iter().map(String::as_str), prefix);
    Ok(annotator_progress(&counts))
}
