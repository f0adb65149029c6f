//! Grouping of annotation records by item.
//!
//! Groups are the unit every filter and the consolidator operate on. Inside a
//! group records are ordered by submission time, ties keeping input order,
//! so "earliest" is well defined even with second-resolution timestamps.

use std::collections::BTreeMap;

use crate::data::AnnotationRecord;
use crate::errors::PipelineError;
use crate::types::ItemId;

/// All annotation records for one item, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemGroup {
    idx: ItemId,
    records: Vec<AnnotationRecord>,
}

impl ItemGroup {
    /// Build a group, ordering `records` by timestamp.
    ///
    /// An empty group, or a record belonging to a different item, is a data error.
    pub fn new(idx: ItemId, mut records: Vec<AnnotationRecord>) -> Result<Self, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyGroup(idx));
        }
        if let Some(stray) = records.iter().find(|record| record.idx != idx) {
            return Err(PipelineError::MisgroupedRecord {
                expected: idx,
                found: stray.idx,
            });
        }
        // Stable sort keeps export order for equal timestamps.
        records.sort_by_key(|record| record.timestamp);
        Ok(Self { idx, records })
    }

    /// Item id shared by every record.
    pub fn idx(&self) -> ItemId {
        self.idx
    }

    /// Records, oldest first.
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed group.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Group records by item id. Groups come back in ascending id order.
pub fn group_by_item(records: Vec<AnnotationRecord>) -> Result<Vec<ItemGroup>, PipelineError> {
    let mut buckets: BTreeMap<ItemId, Vec<AnnotationRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.idx).or_default().push(record);
    }
    buckets
        .into_iter()
        .map(|(idx, records)| ItemGroup::new(idx, records))
        .collect()
}
