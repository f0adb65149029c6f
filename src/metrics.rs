use std::collections::HashMap;

use crate::types::AnnotatorId;

/// Aggregate annotation counts across annotators.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatorProgress {
    /// Annotations counted.
    pub total: usize,
    /// Distinct annotators counted.
    pub annotators: usize,
    /// Fewest annotations by one annotator.
    pub min: usize,
    /// Most annotations by one annotator.
    pub max: usize,
    /// Mean annotations per annotator.
    pub mean: f64,
    /// Shares ordered by count, descending, then by annotator id.
    pub per_annotator: Vec<AnnotatorShare>,
}

/// One annotator's share of all counted annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatorShare {
    /// Annotator session id.
    pub annotator: AnnotatorId,
    /// Annotations by this annotator.
    pub count: usize,
    /// Fraction of `total` in `0.0..=1.0`.
    pub share: f64,
}

/// Count annotations per annotator id, keeping only ids that start with `prefix`.
pub fn annotator_counts<'a, I>(ids: I, prefix: Option<&str>) -> HashMap<AnnotatorId, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = HashMap::new();
    for id in ids {
        if prefix.is_some_and(|prefix| !id.starts_with(prefix)) {
            continue;
        }
        *counts.entry(id.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Summarize per-annotator counts. `None` when nothing was counted.
pub fn annotator_progress(counts: &HashMap<AnnotatorId, usize>) -> Option<AnnotatorProgress> {
    let min = *counts.values().min()?;
    let max = *counts.values().max()?;
    let total: usize = counts.values().sum();
    let annotators = counts.len();
    let mut per_annotator: Vec<AnnotatorShare> = counts
        .iter()
        .map(|(annotator, count)| AnnotatorShare {
            annotator: annotator.clone(),
            count: *count,
            share: if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64
            },
        })
        .collect();
    per_annotator.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.annotator.cmp(&b.annotator))
    });
    Some(AnnotatorProgress {
        total,
        annotators,
        min,
        max,
        mean: total as f64 / annotators as f64,
        per_annotator,
    })
}
