//! Completeness and agreement filters over an [`ItemGroup`].

use std::collections::HashSet;

use crate::constants::ratings::REQUIRED_ANNOTATORS;
use crate::data::{AnnotationRecord, Rating};
use crate::grouping::ItemGroup;

/// Whether an item has enough independent full ratings to be judged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completeness {
    /// Two or more distinct annotators rated every dimension.
    Complete,
    /// Needs more ratings.
    Incomplete,
}

/// Quality judgment for a complete item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Agreement {
    /// Both raters gave 3 on every dimension.
    Approved,
    /// A rater gave 1 on some dimension.
    Rejected,
    /// Anything else: disagreement or mid-range scores.
    NeedsAdjudication,
}

/// `Complete` iff at least two distinct annotators have a fully-rated record.
pub fn completeness(group: &ItemGroup) -> Completeness {
    let annotators: HashSet<&str> = group
        .records()
        .iter()
        .filter(|record| record.scores.is_complete())
        .map(|record| record.annotator_id.as_str())
        .collect();
    if annotators.len() >= REQUIRED_ANNOTATORS {
        Completeness::Complete
    } else {
        Completeness::Incomplete
    }
}

/// The earliest fully-rated record of each of the first two annotators to
/// fully rate the item, oldest first. `None` when fewer than two exist.
pub fn rated_pair(group: &ItemGroup) -> Option<[&AnnotationRecord; 2]> {
    let mut seen = HashSet::new();
    let mut earliest = group
        .records()
        .iter()
        .filter(|record| record.scores.is_complete())
        .filter(|record| seen.insert(record.annotator_id.as_str()));
    let first = earliest.next()?;
    let second = earliest.next()?;
    Some([first, second])
}

/// Judge agreement between the two earliest full ratings.
///
/// Returns `None` for incomplete groups; only complete items are judged.
pub fn agreement(group: &ItemGroup) -> Option<Agreement> {
    let pair = rated_pair(group)?;
    let ratings: Vec<Rating> = pair
        .iter()
        .filter_map(|record| record.scores.full())
        .flatten()
        .collect();
    Some(judge(&ratings))
}

fn judge(ratings: &[Rating]) -> Agreement {
    if ratings.iter().all(|rating| *rating == Rating::HIGH) {
        Agreement::Approved
    } else if ratings.contains(&Rating::LOW) {
        Agreement::Rejected
    } else {
        Agreement::NeedsAdjudication
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::fixtures::record;

    fn group(records: Vec<AnnotationRecord>) -> ItemGroup {
        let idx = records[0].idx;
        ItemGroup::new(idx, records).unwrap()
    }

    #[test]
    fn single_annotator_is_incomplete() {
        let g = group(vec![
            record(1, "alice", 0, [3, 3, 3, 3], "a"),
            record(1, "alice", 10, [2, 2, 2, 2], "b"),
        ]);
        assert_eq!(completeness(&g), Completeness::Incomplete);
        assert_eq!(agreement(&g), None);
    }

    #[test]
    fn partial_rating_does_not_count() {
        let g = group(vec![
            record(1, "alice", 0, [3, 3, 3, 3], "a"),
            record(1, "bob", 10, [3, 0, 3, 3], "b"),
        ]);
        assert_eq!(completeness(&g), Completeness::Incomplete);
    }

    #[test]
    fn two_full_annotators_are_complete() {
        let g = group(vec![
            record(1, "alice", 0, [3, 3, 3, 3], "a"),
            record(1, "bob", 10, [2, 2, 2, 2], "b"),
        ]);
        assert_eq!(completeness(&g), Completeness::Complete);
    }

    #[test]
    fn unanimous_threes_are_approved() {
        let g = group(vec![
            record(1, "alice", 0, [3, 3, 3, 3], "a"),
            record(1, "bob", 10, [3, 3, 3, 3], "b"),
        ]);
        assert_eq!(agreement(&g), Some(Agreement::Approved));
    }

    #[test]
    fn any_one_rejects_even_with_a_three() {
        let g = group(vec![
            record(1, "alice", 0, [3, 3, 3, 3], "a"),
            record(1, "bob", 10, [3, 3, 1, 3], "b"),
        ]);
        assert_eq!(agreement(&g), Some(Agreement::Rejected));
    }

    #[test]
    fn mid_range_scores_need_adjudication() {
        let g = group(vec![
            record(1, "alice", 0, [2, 2, 2, 2], "a"),
            record(1, "bob", 10, [2, 2, 2, 2], "b"),
        ]);
        assert_eq!(agreement(&g), Some(Agreement::NeedsAdjudication));
    }

    #[test]
    fn only_earliest_two_annotators_are_judged() {
        let g = group(vec![
            record(1, "carol", 30, [1, 1, 1, 1], "late"),
            record(1, "bob", 10, [3, 3, 3, 3], "b"),
            record(1, "alice", 0, [3, 3, 3, 3], "a"),
        ]);
        let [first, second] = rated_pair(&g).unwrap();
        assert_eq!(first.annotator_id, "alice");
        assert_eq!(second.annotator_id, "bob");
        assert_eq!(agreement(&g), Some(Agreement::Approved));
    }

    #[test]
    fn repeat_submissions_use_each_annotators_earliest_full_rating() {
        let g = group(vec![
            record(1, "alice", 0, [2, 3, 3, 3], "a1"),
            record(1, "alice", 5, [3, 3, 3, 3], "a2"),
            record(1, "bob", 10, [3, 3, 3, 3], "b"),
        ]);
        let [first, second] = rated_pair(&g).unwrap();
        assert_eq!(first.timestamp, g.records()[0].timestamp);
        assert_eq!(second.annotator_id, "bob");
        assert_eq!(agreement(&g), Some(Agreement::NeedsAdjudication));
    }

    #[test]
    fn incomplete_records_are_skipped_when_pairing() {
        let g = group(vec![
            record(1, "alice", 0, [0, 0, 0, 0], "blank"),
            record(1, "bob", 5, [3, 3, 3, 3], "b"),
            record(1, "alice", 10, [3, 3, 3, 3], "a"),
        ]);
        let [first, second] = rated_pair(&g).unwrap();
        assert_eq!(first.annotator_id, "bob");
        assert_eq!(second.annotator_id, "alice");
        assert_eq!(second.text.question.as_deref(), Some("question a"));
    }
}
