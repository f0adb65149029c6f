use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{FieldName, ItemId};

/// Error type for ingestion, validation, routing, and output failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input file is missing or unreadable.
    #[error("cannot open input {}: {source}", path.display())]
    InputUnavailable {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying open error.
        source: io::Error,
    },
    /// A JSONL line is not valid JSON.
    #[error("{}:{line}: malformed JSON: {source}", path.display())]
    Json {
        /// Offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Parser error.
        source: serde_json::Error,
    },
    /// A record or row violates the expected schema.
    #[error("{}:{line}: schema violation: {details}", path.display())]
    Schema {
        /// Offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        details: String,
    },
    /// The catalog header lacks required columns.
    #[error("{} is missing required columns: {}", path.display(), columns.join(", "))]
    MissingColumns {
        /// Catalog file.
        path: PathBuf,
        /// Required columns not found.
        columns: Vec<FieldName>,
    },
    /// An item group was built without records.
    #[error("item group {0} has no annotation records")]
    EmptyGroup(ItemId),
    /// A record was placed in the group of another item.
    #[error("record for item {found} was grouped under item {expected}")]
    MisgroupedRecord {
        /// Item id of the group.
        expected: ItemId,
        /// Item id carried by the record.
        found: ItemId,
    },
    /// Items were routed to both rating and adjudication.
    #[error("rating and adjudication subsets overlap on items {ids:?}")]
    SubsetOverlap {
        /// Items present in both subsets.
        ids: Vec<ItemId>,
    },
    /// Incomplete items have no catalog row to re-queue.
    #[error("items {ids:?} need more ratings but are absent from the item catalog")]
    CatalogMissing {
        /// Items missing from the catalog.
        ids: Vec<ItemId>,
    },
    /// CSV decoding failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),
}
