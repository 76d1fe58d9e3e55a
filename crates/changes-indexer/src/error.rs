use thiserror::Error;

/// Reasons a single change is dropped or its write skipped.
#[derive(Error, Debug)]
pub enum ChangeError {
    #[error("Failed to parse change: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Change is not a JSON object")]
    NotAnObject,

    #[error("Feed reported error [{error}], reason [{reason}]")]
    FeedReported { error: String, reason: String },

    #[error("Missing id or seq")]
    MissingIdOrSeq,

    #[error("Field {field} must be a string, got {value}")]
    InvalidField {
        field: &'static str,
        value: serde_json::Value,
    },
}

/// Errors surfaced to the indexer loop by one indexing round.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// The bulk request was rejected in part or in whole, or could not be
    /// sent. The checkpoint of the batch was not persisted.
    #[error("Failed to execute bulk request: {0}")]
    BatchFailure(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IndexerError {
    pub fn batch_failure(source: &anyhow::Error) -> Self {
        Self::BatchFailure(format!("{source:#}"))
    }
}

pub type Result<T, E = IndexerError> = std::result::Result<T, E>;
