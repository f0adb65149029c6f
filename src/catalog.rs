//! Item catalog loading and ingestion helpers (shuffle, sample, quotas).

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::QuotaTier;
use crate::constants::ingest::QUOTA_FIELD;
use crate::constants::schema::{FIELD_IDX, TEXT_FIELDS};
use crate::data::CatalogItem;
use crate::errors::PipelineError;
use crate::transport::fs::open_input;
use crate::types::ItemId;

/// Load a CSV item catalog.
///
/// `idx`, `question`, and `choice_A`..`choice_D` are required columns. Every
/// column is kept in file order; `idx` becomes an integer and empty cells
/// become null. Question and option cells stay strings so annotation exports
/// keep a string schema; numeric cells of other columns become JSON numbers.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogItem>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_input(path)?);
    let headers = reader.headers()?.clone();

    let missing: Vec<String> = std::iter::once(FIELD_IDX)
        .chain(TEXT_FIELDS)
        .filter(|column| !headers.iter().any(|header| header == *column))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut items = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|pos| pos.line() as usize).unwrap_or(0);
        let schema_err = |details: String| PipelineError::Schema {
            path: path.to_path_buf(),
            line,
            details,
        };

        let mut idx = None;
        let mut fields = IndexMap::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(row.iter()) {
            let value = if header == FIELD_IDX {
                let parsed = cell.trim().parse::<ItemId>().map_err(|_| {
                    schema_err(format!("'{FIELD_IDX}' must be an integer, found '{cell}'"))
                })?;
                idx = Some(parsed);
                Value::from(parsed)
            } else if TEXT_FIELDS.contains(&header) {
                text_value(cell)
            } else {
                cell_value(cell)
            };
            fields.insert(header.to_string(), value);
        }
        let idx = idx.ok_or_else(|| schema_err(format!("row has no '{FIELD_IDX}' cell")))?;
        if !seen.insert(idx) {
            return Err(schema_err(format!("duplicate item {idx}")));
        }
        items.push(CatalogItem { idx, fields });
    }

    info!(path = %path.display(), items = items.len(), "loaded item catalog");
    Ok(items)
}

fn text_value(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}

/// Infer a JSON value for a pass-through cell: null, integer, finite float, or string.
fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    let trimmed = cell.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

/// Deterministically shuffle `items` for `seed`.
pub fn shuffle_items(mut items: Vec<CatalogItem>, seed: u64) -> Vec<CatalogItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items
}

/// Draw `sample_size` items at random; return `(sampled, remainder)`.
///
/// The sample is in draw order; the remainder keeps catalog order.
pub fn sample_split(
    items: Vec<CatalogItem>,
    sample_size: usize,
    seed: u64,
) -> Result<(Vec<CatalogItem>, Vec<CatalogItem>), PipelineError> {
    if sample_size > items.len() {
        return Err(PipelineError::Configuration(format!(
            "cannot sample {sample_size} items from a catalog of {}",
            items.len()
        )));
    }
    let mut positions: Vec<usize> = (0..items.len()).collect();
    positions.shuffle(&mut StdRng::seed_from_u64(seed));
    positions.truncate(sample_size);

    let mut slots: Vec<Option<CatalogItem>> = items.into_iter().map(Some).collect();
    let sampled: Vec<CatalogItem> = positions
        .iter()
        .filter_map(|&pos| slots[pos].take())
        .collect();
    let remainder: Vec<CatalogItem> = slots.into_iter().flatten().collect();
    debug!(
        sampled = sampled.len(),
        remainder = remainder.len(),
        seed,
        "split catalog sample"
    );
    Ok((sampled, remainder))
}

/// Write an `n_annotators` column: each tier covers the next `rows` items,
/// later items get `default_quota`.
pub fn assign_quotas(items: &mut [CatalogItem], tiers: &[QuotaTier], default_quota: u32) {
    let mut quotas = tiers
        .iter()
        .flat_map(|tier| std::iter::repeat_n(tier.annotators, tier.rows));
    for item in items.iter_mut() {
        let quota = quotas.next().unwrap_or(default_quota);
        item.fields.insert(QUOTA_FIELD.to_string(), Value::from(quota));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "idx,question,choice_A,choice_B,choice_C,choice_D,source";

    fn write_catalog(dir: &Path, rows: usize) -> std::path::PathBuf {
        let path = dir.join("subset.csv");
        let mut contents = format!("{HEADER}\n");
        for i in 0..rows {
            contents.push_str(&format!("{i},\"Q{i}, with comma\",a,b,c,d,\n"));
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn ids(items: &[CatalogItem]) -> Vec<ItemId> {
        items.iter().map(|item| item.idx).collect()
    }

    #[test]
    fn loads_rows_in_column_order() {
        let temp = tempdir().unwrap();
        let path = write_catalog(temp.path(), 2);
        let items = load_catalog(&path).unwrap();

        assert_eq!(ids(&items), vec![0, 1]);
        let keys: Vec<&str> = items[1].fields.keys().map(String::as_str).collect();
        assert_eq!(keys, HEADER.split(',').collect::<Vec<_>>());
        assert_eq!(items[1].fields["idx"], Value::from(1));
        assert_eq!(items[1].fields["question"], Value::from("Q1, with comma"));
        assert_eq!(items[1].fields["source"], Value::Null);
    }

    #[test]
    fn numeric_cells_become_numbers() {
        assert_eq!(cell_value("2"), Value::from(2));
        assert_eq!(cell_value("-7"), Value::from(-7));
        assert_eq!(cell_value("0.5"), Value::from(0.5));
        assert_eq!(cell_value("NaN"), Value::from("NaN"));
        assert_eq!(cell_value("inf"), Value::from("inf"));
        assert_eq!(cell_value("$2+2$"), Value::from("$2+2$"));
        assert_eq!(cell_value(""), Value::Null);

        let temp = tempdir().unwrap();
        let path = temp.path().join("numeric.csv");
        fs::write(
            &path,
            "idx,question,choice_A,choice_B,choice_C,choice_D,n_annotators,answer\n1,q,4,b,c,,2,3\n",
        )
        .unwrap();
        let items = load_catalog(&path).unwrap();
        assert_eq!(items[0].fields["n_annotators"], Value::from(2));
        assert_eq!(items[0].fields["answer"], Value::from(3));
        assert_eq!(items[0].fields["choice_A"], Value::from("4"));
        assert_eq!(items[0].fields["choice_D"], Value::Null);
    }

    #[test]
    fn missing_columns_are_listed() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.csv");
        fs::write(&path, "idx,question,choice_A\n1,q,a\n").unwrap();

        match load_catalog(&path) {
            Err(PipelineError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, vec!["choice_B", "choice_C", "choice_D"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_integer_and_duplicate_idx_fail() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.csv");
        fs::write(
            &path,
            "idx,question,choice_A,choice_B,choice_C,choice_D\nx,q,a,b,c,d\n",
        )
        .unwrap();
        assert!(matches!(
            load_catalog(&path),
            Err(PipelineError::Schema { line: 2, .. })
        ));

        fs::write(
            &path,
            "idx,question,choice_A,choice_B,choice_C,choice_D\n1,q,a,b,c,d\n1,q,a,b,c,d\n",
        )
        .unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate item 1"));
    }

    #[test]
    fn shuffle_is_a_seeded_permutation() {
        let temp = tempdir().unwrap();
        let items = load_catalog(&write_catalog(temp.path(), 20)).unwrap();

        let first = shuffle_items(items.clone(), 42);
        let again = shuffle_items(items.clone(), 42);
        let other = shuffle_items(items.clone(), 7);
        assert_eq!(ids(&first), ids(&again));
        assert_ne!(ids(&first), ids(&other));

        let mut sorted = ids(&first);
        sorted.sort();
        assert_eq!(sorted, ids(&items));
    }

    #[test]
    fn sample_split_partitions_catalog() {
        let temp = tempdir().unwrap();
        let items = load_catalog(&write_catalog(temp.path(), 12)).unwrap();

        let (sampled, remainder) = sample_split(items.clone(), 5, 42).unwrap();
        assert_eq!(sampled.len(), 5);
        assert_eq!(remainder.len(), 7);

        let remainder_ids = ids(&remainder);
        let mut sorted_remainder = remainder_ids.clone();
        sorted_remainder.sort();
        assert_eq!(remainder_ids, sorted_remainder);

        let mut all: Vec<ItemId> = ids(&sampled).into_iter().chain(remainder_ids).collect();
        all.sort();
        assert_eq!(all, ids(&items));

        let (again, _) = sample_split(items.clone(), 5, 42).unwrap();
        assert_eq!(ids(&sampled), ids(&again));
        assert!(sample_split(items, 13, 42).is_err());
    }

    #[test]
    fn quotas_follow_tiers_then_default() {
        let temp = tempdir().unwrap();
        let mut items = load_catalog(&write_catalog(temp.path(), 6)).unwrap();
        let tiers = [
            QuotaTier {
                rows: 2,
                annotators: 0,
            },
            QuotaTier {
                rows: 3,
                annotators: 2,
            },
        ];
        assign_quotas(&mut items, &tiers, 1);

        let quotas: Vec<Value> = items
            .iter()
            .map(|item| item.fields[QUOTA_FIELD].clone())
            .collect();
        assert_eq!(
            quotas,
            [0, 0, 2, 2, 2, 1].map(Value::from).to_vec()
        );
        assert_eq!(items[0].fields.keys().last().map(String::as_str), Some(QUOTA_FIELD));
    }
}
