//! Formatting of the `last_seq` checkpoint persisted after every bulk write.

use crate::{Sequence, LAST_SEQ};

/// Converts the last sequence seen in a batch into the string persisted
/// under [`LAST_SEQ`].
#[derive(Debug, Clone)]
pub struct LastSeqFormatter {
    database: String,
}

impl LastSeqFormatter {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns `None` when no change of the batch yielded a sequence, in
    /// which case no checkpoint update must be recorded.
    pub fn format(&self, last_seq: Option<&Sequence>) -> Option<String> {
        let seq = last_seq?;
        let formatted = seq.to_checkpoint_string();
        tracing::trace!(
            database = %self.database,
            "Formatted {} [{:?}] as [{}]",
            LAST_SEQ,
            seq,
            formatted
        );
        Some(formatted)
    }
}
