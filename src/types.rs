/// Canonical exam item identifier (the `idx` column).
/// Example: `5`
pub type ItemId = i64;
/// Identifier of the annotator session that produced a record.
/// Examples: `ume-final-alice`, `ume-final-bob`
pub type AnnotatorId = String;
/// Name of a record or catalog field.
/// Examples: `question`, `choice_A_orig`, `n_annotators`
pub type FieldName = String;
