/// Field names of the annotation record schema.
pub mod schema {
    /// Item identifier shared by annotation records and catalog rows.
    pub const FIELD_IDX: &str = "idx";
    /// Annotator session id written by the annotation UI.
    pub const FIELD_ANNOTATOR_ID: &str = "_annotator_id";
    /// Submission time written by the annotation UI.
    pub const FIELD_TIMESTAMP: &str = "_timestamp";
    /// Live text fields in output order.
    pub const TEXT_FIELDS: [&str; 5] = ["question", "choice_A", "choice_B", "choice_C", "choice_D"];
    /// Pre-edit text fields in output order.
    pub const ORIG_TEXT_FIELDS: [&str; 5] = [
        "question_orig",
        "choice_A_orig",
        "choice_B_orig",
        "choice_C_orig",
        "choice_D_orig",
    ];
    /// Rating dimensions in output order.
    pub const SCORE_FIELDS: [&str; 4] = ["overall", "topic", "vocabulary", "choices"];
    /// Bookkeeping fields the annotation UI adds; always stripped on load.
    pub const BOOKKEEPING_FIELDS: [&str; 11] = [
        "display_question",
        "display_choice_A",
        "display_choice_B",
        "display_choice_C",
        "display_choice_D",
        "html",
        "_input_hash",
        "_task_hash",
        "_session_id",
        "_view_id",
        "answer",
    ];
}

/// Rating value bounds.
pub mod ratings {
    /// Lowest valid rating ("wrong").
    pub const MIN_RATING: u8 = 1;
    /// Highest valid rating ("fully correct").
    pub const MAX_RATING: u8 = 3;
    /// Number of distinct fully-rated annotators needed for completeness.
    pub const REQUIRED_ANNOTATORS: usize = 2;
}

/// Default input and output locations, relative to the working directory.
pub mod paths {
    /// Annotation export read by the sampling pipeline.
    pub const DEFAULT_ANNOTATIONS: &str = "data/ume-final.jsonl";
    /// Item catalog used to re-queue incomplete items.
    pub const DEFAULT_CATALOG: &str = "data/subset-1.csv";
    /// Output for items that need more ratings.
    pub const DEFAULT_RATING_OUT: &str = "inputs/ume-rating/subset-1b.jsonl";
    /// Output for items that need adjudication.
    pub const DEFAULT_ADJUDICATION_OUT: &str = "inputs/ume-adjudication/subset-1a.jsonl";
}

/// Defaults for catalog ingestion.
pub mod ingest {
    /// Seed used for catalog shuffles and samples.
    pub const DEFAULT_SEED: u64 = 42;
    /// Column written by quota assignment.
    pub const QUOTA_FIELD: &str = "n_annotators";
    /// Quota given to rows not covered by an explicit tier.
    pub const DEFAULT_QUOTA: u32 = 1;
}
