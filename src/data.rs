use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::constants::ratings::{MAX_RATING, MIN_RATING};
use crate::constants::schema::{
    FIELD_ANNOTATOR_ID, FIELD_IDX, FIELD_TIMESTAMP, ORIG_TEXT_FIELDS, SCORE_FIELDS, TEXT_FIELDS,
};

pub use crate::types::{AnnotatorId, FieldName, ItemId};

/// A single rating on one quality dimension.
///
/// Only `1..=3` is representable; anything else is "not rated".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    /// Lowest rating ("wrong").
    pub const LOW: Rating = Rating(MIN_RATING);
    /// Middle rating ("partially correct").
    pub const MID: Rating = Rating(2);
    /// Highest rating ("fully correct").
    pub const HIGH: Rating = Rating(MAX_RATING);

    /// Build a rating, rejecting values outside `1..=3`.
    pub fn new(value: u8) -> Option<Self> {
        (MIN_RATING..=MAX_RATING)
            .contains(&value)
            .then_some(Rating(value))
    }

    /// Coerce a raw JSON value into a rating.
    ///
    /// Integers, integral floats, and numeric strings are accepted. Nulls,
    /// empty strings, fractions, and out-of-range values yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let raw = match value {
            Value::Number(number) => match number.as_i64() {
                Some(int) => int,
                None => {
                    let float = number.as_f64()?;
                    if float.fract() != 0.0 {
                        return None;
                    }
                    float as i64
                }
            },
            Value::String(text) => text.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        u8::try_from(raw).ok().and_then(Rating::new)
    }

    /// Raw numeric value.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four rating dimensions of one annotation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scores {
    /// Overall item quality.
    pub overall: Option<Rating>,
    /// Fit of the item to its stated topic.
    pub topic: Option<Rating>,
    /// Mathematical vocabulary and notation.
    pub vocabulary: Option<Rating>,
    /// Quality of the answer options.
    pub choices: Option<Rating>,
}

impl Scores {
    /// Build a fully-rated score set from raw values; invalid values become unrated.
    pub fn from_values(overall: u8, topic: u8, vocabulary: u8, choices: u8) -> Self {
        Self {
            overall: Rating::new(overall),
            topic: Rating::new(topic),
            vocabulary: Rating::new(vocabulary),
            choices: Rating::new(choices),
        }
    }

    /// Dimensions in `overall, topic, vocabulary, choices` order.
    pub fn dimensions(&self) -> [Option<Rating>; 4] {
        [self.overall, self.topic, self.vocabulary, self.choices]
    }

    /// All four ratings when every dimension is rated.
    pub fn full(&self) -> Option<[Rating; 4]> {
        Some([self.overall?, self.topic?, self.vocabulary?, self.choices?])
    }

    /// True when every dimension carries a valid rating.
    pub fn is_complete(&self) -> bool {
        self.full().is_some()
    }
}

/// Question stem plus the four answer options.
///
/// A field is `None` when the export carried an explicit `null` (for example
/// an item whose catalog row had an empty option cell).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemText {
    /// Question stem.
    pub question: Option<String>,
    /// Option A.
    pub choice_a: Option<String>,
    /// Option B.
    pub choice_b: Option<String>,
    /// Option C.
    pub choice_c: Option<String>,
    /// Option D.
    pub choice_d: Option<String>,
}

impl ItemText {
    /// Field values in `question, choice_A..choice_D` order.
    pub fn values(&self) -> [Option<&str>; 5] {
        [
            self.question.as_deref(),
            self.choice_a.as_deref(),
            self.choice_b.as_deref(),
            self.choice_c.as_deref(),
            self.choice_d.as_deref(),
        ]
    }

    /// Build from values in `question, choice_A..choice_D` order.
    pub fn from_values(
        [question, choice_a, choice_b, choice_c, choice_d]: [Option<String>; 5],
    ) -> Self {
        Self {
            question,
            choice_a,
            choice_b,
            choice_c,
            choice_d,
        }
    }
}

/// One annotator's rating/edit pass over an item, as exported by the annotation UI.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRecord {
    /// Item the annotation belongs to.
    pub idx: ItemId,
    /// Annotator session that produced the record.
    pub annotator_id: AnnotatorId,
    /// Submission time.
    pub timestamp: DateTime<Utc>,
    /// Text as submitted (possibly edited by the annotator).
    pub text: ItemText,
    /// Text as presented to the annotator before editing.
    pub orig: ItemText,
    /// Per-dimension ratings.
    pub scores: Scores,
    /// Configured pass-through item fields, in input order.
    pub extra: IndexMap<FieldName, Value>,
}

impl Serialize for AnnotationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(FIELD_IDX, &self.idx)?;
        write_text_entries(&mut map, &self.text, &self.orig)?;
        for (name, rating) in SCORE_FIELDS.iter().zip(self.scores.dimensions()) {
            map.serialize_entry(name, &rating.map(Rating::value))?;
        }
        for (name, value) in &self.extra {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(FIELD_ANNOTATOR_ID, &self.annotator_id)?;
        map.serialize_entry(FIELD_TIMESTAMP, &self.timestamp.timestamp())?;
        map.end()
    }
}

/// Canonical record for one item after collapsing its revisions.
///
/// Carries no annotator identity, timestamps, or scores.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolidatedRecord {
    /// Item the record describes.
    pub idx: ItemId,
    /// Live text of the earliest record.
    pub text: ItemText,
    /// Live text of the second-earliest record, or the earliest record's
    /// pre-edit text when only one record exists.
    pub orig: ItemText,
    /// Pass-through fields of the earliest record.
    pub extra: IndexMap<FieldName, Value>,
}

impl ConsolidatedRecord {
    /// Live text field names whose value differs from the `*_orig` value.
    pub fn modified_fields(&self) -> Vec<&'static str> {
        TEXT_FIELDS
            .iter()
            .zip(self.text.values().into_iter().zip(self.orig.values()))
            .filter(|(_, (live, orig))| live != orig)
            .map(|(name, _)| *name)
            .collect()
    }
}

impl Serialize for ConsolidatedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(FIELD_IDX, &self.idx)?;
        write_text_entries(&mut map, &self.text, &self.orig)?;
        for (name, value) in &self.extra {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn write_text_entries<M: SerializeMap>(
    map: &mut M,
    text: &ItemText,
    orig: &ItemText,
) -> Result<(), M::Error> {
    for (name, value) in TEXT_FIELDS.iter().zip(text.values()) {
        map.serialize_entry(name, &value)?;
    }
    for (name, value) in ORIG_TEXT_FIELDS.iter().zip(orig.values()) {
        map.serialize_entry(name, &value)?;
    }
    Ok(())
}

/// A catalog row: the item id plus every column in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogItem {
    /// Parsed `idx` column.
    pub idx: ItemId,
    /// All columns (including `idx`) in their original order.
    pub fields: IndexMap<FieldName, Value>,
}

impl Serialize for CatalogItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
