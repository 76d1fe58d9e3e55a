//! Checkpoint management for feed-indexer
//!
//! A change feed tags each change with a sequence value. After a batch of
//! changes has been written to the index, the last sequence of that batch is
//! persisted as the `last_seq` checkpoint so that the feed can be resumed
//! from there after a restart.
//!
//! # Architecture
//!
//! - [`Sequence`] models the opaque sequence value (plain token or compound
//!   cursor)
//! - [`LastSeqFormatter`] renders it into the canonical persisted string
//! - [`CheckpointStore`] reads the persisted value back for resuming

mod formatter;
mod seq;
pub mod store;


pub use formatter::LastSeqFormatter;
pub use seq::{SeqScalar, Sequence};
pub use store::CheckpointStore;

/// Key under which the checkpoint is persisted.
pub const LAST_SEQ: &str = "last_seq";
