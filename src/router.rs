//! Routes every item into exactly one output subset.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, info};

use crate::agreement::{Agreement, Completeness, agreement, completeness};
use crate::consolidate::consolidate;
use crate::data::{CatalogItem, ConsolidatedRecord};
use crate::errors::PipelineError;
use crate::grouping::ItemGroup;
use crate::types::ItemId;

/// Named destination of an item after one pipeline pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subset {
    /// Not enough full ratings yet; re-queued for annotation.
    Rating,
    /// Complete but not unanimous; needs a human adjudicator.
    Adjudication,
    /// Both raters gave 3 everywhere.
    Approved,
    /// A rater gave 1 somewhere.
    Rejected,
    /// Complete and already present in an adjudicated export; not re-routed.
    AlreadyAdjudicated,
}

impl Subset {
    /// Every subset, in report order.
    pub const ALL: [Subset; 5] = [
        Subset::Rating,
        Subset::Adjudication,
        Subset::Approved,
        Subset::Rejected,
        Subset::AlreadyAdjudicated,
    ];

    /// Stable lowercase name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Subset::Rating => "rating",
            Subset::Adjudication => "adjudication",
            Subset::Approved => "approved",
            Subset::Rejected => "rejected",
            Subset::AlreadyAdjudicated => "already_adjudicated",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the subset of one item.
pub fn classify(group: &ItemGroup, adjudicated: &BTreeSet<ItemId>) -> Subset {
    if completeness(group) == Completeness::Incomplete {
        return Subset::Rating;
    }
    if adjudicated.contains(&group.idx()) {
        return Subset::AlreadyAdjudicated;
    }
    match agreement(group) {
        Some(Agreement::Approved) => Subset::Approved,
        Some(Agreement::Rejected) => Subset::Rejected,
        Some(Agreement::NeedsAdjudication) => Subset::Adjudication,
        // Unreachable for complete groups; treat like any other incomplete item.
        None => Subset::Rating,
    }
}

/// Output of one routing pass.
#[derive(Clone, Debug, Default)]
pub struct RoutedSubsets {
    /// Catalog rows to re-queue, in catalog order.
    pub rating: Vec<CatalogItem>,
    /// Consolidated records that need an adjudicator, in id order.
    pub adjudication: Vec<ConsolidatedRecord>,
    /// Consolidated records rated all 3s, in id order.
    pub approved: Vec<ConsolidatedRecord>,
    /// Consolidated records with a 1 somewhere, in id order.
    pub rejected: Vec<ConsolidatedRecord>,
    /// Complete items skipped because they were already adjudicated.
    pub already_adjudicated: Vec<ItemId>,
}

impl RoutedSubsets {
    /// Item ids routed to `subset`.
    pub fn ids(&self, subset: Subset) -> BTreeSet<ItemId> {
        let consolidated = |records: &[ConsolidatedRecord]| -> BTreeSet<ItemId> {
            records.iter().map(|record| record.idx).collect()
        };
        match subset {
            Subset::Rating => self.rating.iter().map(|item| item.idx).collect(),
            Subset::Adjudication => consolidated(&self.adjudication),
            Subset::Approved => consolidated(&self.approved),
            Subset::Rejected => consolidated(&self.rejected),
            Subset::AlreadyAdjudicated => self.already_adjudicated.iter().copied().collect(),
        }
    }

    /// Item count per subset.
    pub fn counts(&self) -> BTreeMap<Subset, usize> {
        BTreeMap::from([
            (Subset::Rating, self.rating.len()),
            (Subset::Adjudication, self.adjudication.len()),
            (Subset::Approved, self.approved.len()),
            (Subset::Rejected, self.rejected.len()),
            (Subset::AlreadyAdjudicated, self.already_adjudicated.len()),
        ])
    }

    /// Fail when an item is queued for both more rating and adjudication.
    pub fn assert_disjoint(&self) -> Result<(), PipelineError> {
        let rating = self.ids(Subset::Rating);
        let ids: Vec<ItemId> = self
            .ids(Subset::Adjudication)
            .intersection(&rating)
            .copied()
            .collect();
        if ids.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::SubsetOverlap { ids })
        }
    }
}

/// Route every group.
///
/// Incomplete items are re-queued using their catalog row; an incomplete
/// item missing from `catalog` is an error. Everything else is consolidated.
pub fn route(
    groups: &[ItemGroup],
    catalog: &[CatalogItem],
    adjudicated: &BTreeSet<ItemId>,
) -> Result<RoutedSubsets, PipelineError> {
    let mut routed = RoutedSubsets::default();
    let mut needs_rating: BTreeSet<ItemId> = BTreeSet::new();

    for group in groups {
        let subset = classify(group, adjudicated);
        debug!(idx = group.idx(), records = group.len(), %subset, "routed item");
        match subset {
            Subset::Rating => {
                needs_rating.insert(group.idx());
            }
            Subset::AlreadyAdjudicated => routed.already_adjudicated.push(group.idx()),
            Subset::Adjudication => routed.adjudication.push(consolidate(group)),
            Subset::Approved => routed.approved.push(consolidate(group)),
            Subset::Rejected => routed.rejected.push(consolidate(group)),
        }
    }

    routed.rating = catalog
        .iter()
        .filter(|item| needs_rating.contains(&item.idx))
        .cloned()
        .collect();
    if routed.rating.len() != needs_rating.len() {
        let found = routed.ids(Subset::Rating);
        let ids: Vec<ItemId> = needs_rating.difference(&found).copied().collect();
        return Err(PipelineError::CatalogMissing { ids });
    }

    routed.assert_disjoint()?;

    let revised = routed
        .adjudication
        .iter()
        .filter(|record| !record.modified_fields().is_empty())
        .count();
    info!(
        rating = routed.rating.len(),
        adjudication = routed.adjudication.len(),
        revised_for_adjudication = revised,
        approved = routed.approved.len(),
        rejected = routed.rejected.len(),
        already_adjudicated = routed.already_adjudicated.len(),
        "routing complete"
    );
    Ok(routed)
}
