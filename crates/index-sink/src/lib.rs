//! Index sink abstraction.
//!
//! This crate defines the write side of feed-indexer: the [`WriteOp`]s a
//! bulk request is made of, the [`RequestFactory`] that builds them from
//! classified changes, and the [`IndexSink`] trait that submits one bulk
//! request to the downstream index.
//!
//! Two sinks ship with the crate:
//! - [`MemorySink`] keeps documents in memory and applies each bulk
//!   all-or-nothing
//! - [`NdjsonSink`] writes the bulk body to any async writer

mod factory;
mod memory;
mod ndjson;
mod ops;
mod traits;

pub use factory::{RequestFactory, RiverRequestFactory, SEQ_DOC_ID};
pub use memory::MemorySink;
pub use ndjson::NdjsonSink;
pub use ops::{DocTarget, WriteOp};
pub use traits::{BulkItem, BulkResponse, IndexSink};
