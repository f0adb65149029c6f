use crate::data::ConsolidatedRecord;
use crate::grouping::ItemGroup;

/// Collapse an item's revisions into one record.
///
/// Base fields come from the earliest record. With two or more records the
/// `*_orig` text is replaced by the second-earliest record's live text, so
/// the result holds exactly two revision states. Scores, annotator ids and
/// timestamps are dropped.
pub fn consolidate(group: &ItemGroup) -> ConsolidatedRecord {
    let records = group.records();
    let base = &records[0];
    let orig = match records.get(1) {
        Some(second) => second.text.clone(),
        None => base.orig.clone(),
    };
    ConsolidatedRecord {
        idx: base.idx,
        text: base.text.clone(),
        orig,
        extra: base.extra.clone(),
    }
}
