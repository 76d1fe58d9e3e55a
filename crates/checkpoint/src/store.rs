//! Checkpoint storage trait
//!
//! The checkpoint is written by the same bulk request as the changes it
//! accounts for, so storage only needs a read side: whoever restarts the
//! feed asks the store where to resume from.

use anyhow::Result;
use async_trait::async_trait;

use crate::Sequence;

/// Trait for reading the persisted `last_seq` of a database.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the raw persisted checkpoint string.
    ///
    /// Returns None if nothing was persisted yet.
    async fn read_last_seq(&self, database: &str) -> Result<Option<String>>;

    /// Read the persisted checkpoint and parse it back into a [`Sequence`]
    /// suitable for resuming the feed.
    async fn resume_from(&self, database: &str) -> Result<Option<Sequence>> {
        let raw = self.read_last_seq(database).await?;
        Ok(raw.map(|s| s.parse().unwrap_or_else(|never| match never {})))
    }
}
