//! Annotation export ingestion.
//!
//! Every line is validated against an explicit schema before it becomes an
//! [`AnnotationRecord`]: required fields must be present with the right
//! type, UI bookkeeping fields are stripped, configured pass-through fields
//! are kept in input order, and anything else is rejected (or dropped with a
//! warning when the policy allows unknown fields). Ratings are the one
//! exception: a missing or malformed rating is read as "not rated".

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::SchemaPolicy;
use crate::constants::schema::{
    FIELD_ANNOTATOR_ID, FIELD_IDX, FIELD_TIMESTAMP, ORIG_TEXT_FIELDS, SCORE_FIELDS, TEXT_FIELDS,
};
use crate::data::{AnnotationRecord, ItemText, Rating, Scores};
use crate::errors::PipelineError;
use crate::transport::fs::{json_kind, read_jsonl_objects};
use crate::types::{AnnotatorId, FieldName, ItemId};

/// Validates raw export objects against a [`SchemaPolicy`].
pub struct AnnotationSchema<'a> {
    policy: &'a SchemaPolicy,
    known: HashSet<&'static str>,
}

impl<'a> AnnotationSchema<'a> {
    /// Build a validator for `policy`.
    pub fn new(policy: &'a SchemaPolicy) -> Self {
        let known = [FIELD_IDX, FIELD_ANNOTATOR_ID, FIELD_TIMESTAMP]
            .into_iter()
            .chain(TEXT_FIELDS)
            .chain(ORIG_TEXT_FIELDS)
            .chain(SCORE_FIELDS)
            .collect();
        Self { policy, known }
    }

    /// Convert one export object into a record.
    ///
    /// `path` and `line` are only used to locate errors.
    pub fn parse(
        &self,
        path: &Path,
        line: usize,
        object: &Map<String, Value>,
    ) -> Result<AnnotationRecord, PipelineError> {
        let schema_err = |details: String| PipelineError::Schema {
            path: path.to_path_buf(),
            line,
            details,
        };

        let idx = parse_item_id(object.get(FIELD_IDX)).map_err(&schema_err)?;
        let annotator_id = match object.get(FIELD_ANNOTATOR_ID) {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(Value::String(_)) => {
                return Err(schema_err(format!("'{FIELD_ANNOTATOR_ID}' is empty")));
            }
            Some(other) => {
                return Err(schema_err(format!(
                    "'{FIELD_ANNOTATOR_ID}' must be a string, found {}",
                    json_kind(other)
                )));
            }
            None => return Err(schema_err(missing(FIELD_ANNOTATOR_ID))),
        };
        let timestamp = parse_timestamp(object.get(FIELD_TIMESTAMP)).map_err(&schema_err)?;
        let text = parse_text(object, TEXT_FIELDS).map_err(&schema_err)?;
        let orig = parse_text(object, ORIG_TEXT_FIELDS).map_err(&schema_err)?;

        let rating = |field: &str| object.get(field).and_then(Rating::from_json);
        let scores = Scores {
            overall: rating(SCORE_FIELDS[0]),
            topic: rating(SCORE_FIELDS[1]),
            vocabulary: rating(SCORE_FIELDS[2]),
            choices: rating(SCORE_FIELDS[3]),
        };

        let mut extra = IndexMap::new();
        for (name, value) in object {
            if self.known.contains(name.as_str()) || self.is_ignored(name) {
                continue;
            }
            if self.is_passthrough(name) {
                extra.insert(name.clone(), value.clone());
            } else if !self.policy.allow_unknown_fields {
                return Err(schema_err(format!("unexpected field '{name}'")));
            }
        }

        Ok(AnnotationRecord {
            idx,
            annotator_id,
            timestamp,
            text,
            orig,
            scores,
            extra,
        })
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.policy.ignored_fields.iter().any(|f| f == name)
    }

    fn is_passthrough(&self, name: &str) -> bool {
        self.policy.passthrough_fields.iter().any(|f| f == name)
    }

    /// Fields of `object` that the policy would drop as unknown.
    fn unknown_fields<'o>(&self, object: &'o Map<String, Value>) -> Vec<&'o str> {
        object
            .keys()
            .map(String::as_str)
            .filter(|name| {
                !self.known.contains(*name) && !self.is_ignored(name) && !self.is_passthrough(name)
            })
            .collect()
    }
}

/// Load and validate every record of an annotation export.
pub fn load_annotations(
    path: &Path,
    policy: &SchemaPolicy,
) -> Result<Vec<AnnotationRecord>, PipelineError> {
    let schema = AnnotationSchema::new(policy);
    let mut warned: BTreeSet<FieldName> = BTreeSet::new();
    let mut records = Vec::new();
    for (line, object) in read_jsonl_objects(path)? {
        if policy.allow_unknown_fields {
            for name in schema.unknown_fields(&object) {
                if warned.insert(name.to_string()) {
                    warn!(path = %path.display(), line, field = name, "dropping unknown field");
                }
            }
        }
        records.push(schema.parse(path, line, &object)?);
    }
    let unrated = records.iter().filter(|r| !r.scores.is_complete()).count();
    info!(
        path = %path.display(),
        records = records.len(),
        partially_rated = unrated,
        "loaded annotations"
    );
    Ok(records)
}

/// Collect item ids from already-adjudicated exports. Only `idx` is read.
pub fn load_adjudicated_ids(paths: &[PathBuf]) -> Result<BTreeSet<ItemId>, PipelineError> {
    let mut ids = BTreeSet::new();
    for path in paths {
        let before = ids.len();
        for (line, object) in read_jsonl_objects(path)? {
            let idx =
                parse_item_id(object.get(FIELD_IDX)).map_err(|details| PipelineError::Schema {
                    path: path.clone(),
                    line,
                    details,
                })?;
            ids.insert(idx);
        }
        debug!(path = %path.display(), new_ids = ids.len() - before, "loaded adjudicated ids");
    }
    Ok(ids)
}

/// Read only the annotator id of every record, for progress reporting.
///
/// Records need not satisfy the full schema, but every line must carry a
/// string `_annotator_id`.
pub fn load_annotator_ids(path: &Path) -> Result<Vec<AnnotatorId>, PipelineError> {
    read_jsonl_objects(path)?
        .into_iter()
        .map(|(line, object)| match object.get(FIELD_ANNOTATOR_ID) {
            Some(Value::String(id)) => Ok(id.clone()),
            other => Err(PipelineError::Schema {
                path: path.to_path_buf(),
                line,
                details: match other {
                    Some(value) => format!(
                        "'{FIELD_ANNOTATOR_ID}' must be a string, found {}",
                        json_kind(value)
                    ),
                    None => missing(FIELD_ANNOTATOR_ID),
                },
            }),
        })
        .collect()
}

// Floats in this range convert to an `ItemId` without saturating.
const ITEM_ID_FLOAT_RANGE: std::ops::Range<f64> = ItemId::MIN as f64..ItemId::MAX as f64;

/// Parse an item id from an integer, an integral float, or a numeric string.
pub fn parse_item_id(value: Option<&Value>) -> Result<ItemId, String> {
    let value = match value {
        None | Some(Value::Null) => return Err(missing(FIELD_IDX)),
        Some(value) => value,
    };
    let parsed = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && ITEM_ID_FLOAT_RANGE.contains(f))
                .map(|f| f as ItemId)
        }),
        Value::String(text) => text.trim().parse::<ItemId>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| format!("'{FIELD_IDX}' must be an integer, found {value}"))
}

fn parse_timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, String> {
    match value {
        None | Some(Value::Null) => Err(missing(FIELD_TIMESTAMP)),
        Some(Value::Number(number)) => number
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| format!("'{FIELD_TIMESTAMP}' {number} is not a unix timestamp")),
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| format!("'{FIELD_TIMESTAMP}' '{text}' is not RFC 3339: {err}")),
        Some(other) => Err(format!(
            "'{FIELD_TIMESTAMP}' must be a number or string, found {}",
            json_kind(other)
        )),
    }
}

/// Text fields must be present; an explicit `null` is kept as `None`.
fn parse_text(object: &Map<String, Value>, fields: [&str; 5]) -> Result<ItemText, String> {
    let mut values: [Option<String>; 5] = Default::default();
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = match object.get(field) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Null) => None,
            Some(other) => {
                return Err(format!(
                    "'{field}' must be a string or null, found {}",
                    json_kind(other)
                ));
            }
            None => return Err(missing(field)),
        };
    }
    Ok(ItemText::from_values(values))
}

fn missing(field: &str) -> String {
    format!("missing required field '{field}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn raw_record() -> Map<String, Value> {
        let value = json!({
            "idx": 5,
            "_annotator_id": "ume-final-alice",
            "_timestamp": 1_700_000_000,
            "question": "What is $2+2$?",
            "choice_A": "3",
            "choice_B": "4",
            "choice_C": "5",
            "choice_D": "22",
            "question_orig": "What is $2+2$?",
            "choice_A_orig": "3",
            "choice_B_orig": "4",
            "choice_C_orig": "5",
            "choice_D_orig": "22",
            "overall": 3,
            "topic": 2,
            "vocabulary": "",
            "choices": null,
            "html": "<div/>",
            "_input_hash": 123,
            "_session_id": "ume-final-alice",
        });
        match value {
            Value::Object(object) => object,
            _ => unreachable!(),
        }
    }

    fn parse(
        object: &Map<String, Value>,
        policy: &SchemaPolicy,
    ) -> Result<AnnotationRecord, PipelineError> {
        AnnotationSchema::new(policy).parse(Path::new("test.jsonl"), 1, object)
    }

    #[test]
    fn parses_record_and_coerces_blank_ratings() {
        let record = parse(&raw_record(), &SchemaPolicy::default()).unwrap();
        assert_eq!(record.idx, 5);
        assert_eq!(record.annotator_id, "ume-final-alice");
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(record.text.choice_b.as_deref(), Some("4"));
        assert_eq!(record.scores.overall, Some(Rating::HIGH));
        assert_eq!(record.scores.topic, Some(Rating::MID));
        assert_eq!(record.scores.vocabulary, None);
        assert_eq!(record.scores.choices, None);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn missing_scores_are_not_an_error() {
        let mut object = raw_record();
        for field in SCORE_FIELDS {
            object.remove(field);
        }
        let record = parse(&object, &SchemaPolicy::default()).unwrap();
        assert_eq!(record.scores, Scores::default());
    }

    #[test]
    fn missing_idx_is_a_schema_error() {
        let mut object = raw_record();
        object.remove("idx");
        let err = parse(&object, &SchemaPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("missing required field 'idx'"));
    }

    #[test]
    fn null_text_field_is_kept_as_none() {
        let mut object = raw_record();
        object.insert("choice_D".to_string(), Value::Null);
        object.insert("choice_D_orig".to_string(), Value::Null);
        let record = parse(&object, &SchemaPolicy::default()).unwrap();
        assert_eq!(record.text.choice_d, None);
        assert_eq!(record.orig.choice_d, None);
        assert_eq!(record.text.choice_c.as_deref(), Some("5"));

        object.insert("question".to_string(), json!(7));
        let err = parse(&object, &SchemaPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("'question' must be a string or null"));
    }

    #[test]
    fn missing_text_field_is_a_schema_error() {
        let mut object = raw_record();
        object.remove("choice_C_orig");
        let err = parse(&object, &SchemaPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("choice_C_orig"));
    }

    #[test]
    fn unknown_field_fails_strict_policy() {
        let mut object = raw_record();
        object.insert("surprise".to_string(), json!(true));
        let err = parse(&object, &SchemaPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("unexpected field 'surprise'"));

        let lenient = SchemaPolicy::default().with_unknown_fields_allowed(true);
        let record = parse(&object, &lenient).unwrap();
        assert!(!record.extra.contains_key("surprise"));
    }

    #[test]
    fn passthrough_fields_are_kept() {
        let mut object = raw_record();
        object.insert("source".to_string(), json!("exam-2019"));
        let policy = SchemaPolicy::default().with_passthrough_field("source");
        let record = parse(&object, &policy).unwrap();
        assert_eq!(record.extra.get("source"), Some(&json!("exam-2019")));
    }

    #[test]
    fn accepts_string_idx_and_rfc3339_timestamp() {
        let mut object = raw_record();
        object.insert("idx".to_string(), json!("17"));
        object.insert("_timestamp".to_string(), json!("2025-03-01T10:00:00Z"));
        let record = parse(&object, &SchemaPolicy::default()).unwrap();
        assert_eq!(record.idx, 17);
        assert_eq!(record.timestamp.to_rfc3339(), "2025-03-01T10:00:00+00:00");
    }

    #[test]
    fn rejects_fractional_idx() {
        assert!(parse_item_id(Some(&json!(1.5))).is_err());
        assert!(parse_item_id(Some(&json!(1e20))).is_err());
        assert!(parse_item_id(Some(&json!(-1e20))).is_err());
        assert_eq!(parse_item_id(Some(&json!(4.0))), Ok(4));
        assert!(parse_item_id(Some(&Value::Null)).is_err());
    }

    #[test]
    fn load_annotations_reports_failing_line() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ume.jsonl");
        let good = Value::Object(raw_record()).to_string();
        let mut bad = raw_record();
        bad.remove("_annotator_id");
        let bad = Value::Object(bad).to_string();
        fs::write(&path, format!("{good}\n{bad}\n")).unwrap();

        match load_annotations(&path, &SchemaPolicy::default()) {
            Err(PipelineError::Schema { line, details, .. }) => {
                assert_eq!(line, 2);
                assert!(details.contains("_annotator_id"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn annotator_ids_skip_full_validation() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("progress.jsonl");
        fs::write(
            &path,
            "{\"_annotator_id\": \"ume-final-a\"}\n{\"_annotator_id\": \"ume-b\", \"x\": 1}\n",
        )
        .unwrap();
        assert_eq!(load_annotator_ids(&path).unwrap(), vec!["ume-final-a", "ume-b"]);

        fs::write(&path, "{\"idx\": 1}\n").unwrap();
        assert!(matches!(
            load_annotator_ids(&path),
            Err(PipelineError::Schema { line: 1, .. })
        ));
    }

    #[test]
    fn adjudicated_ids_union_across_files() {
        let temp = tempdir().unwrap();
        let first = temp.path().join("a.jsonl");
        let second = temp.path().join("b.jsonl");
        fs::write(&first, "{\"idx\": 1, \"question\": \"q\"}\n{\"idx\": 2}\n").unwrap();
        fs::write(&second, "{\"idx\": 2}\n{\"idx\": \"9\"}\n").unwrap();

        let ids = load_adjudicated_ids(&[first, second]).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 2, 9]);
    }
}
