//! Change feed batching engine for feed-indexer.
//!
//! This crate provides:
//! - Parsing and classification of raw feed changes into index and delete
//!   operations
//! - Coalescing of changes into bulk requests (size or timeout bound)
//! - Execution of each bulk request together with its `last_seq` checkpoint
//! - The consumer loop with cooperative shutdown
//!
//! # Data Flow
//!
//! ```text
//! queue ──► coalescer ──► ChangeProcessor ──► RequestFactory ──► Batch
//!                                                                  │
//!           IndexSink ◄── executor ◄── last_seq update (appended last)
//! ```
//!
//! The checkpoint update ships inside the same bulk request as the changes
//! it accounts for, so a failed request never advances the checkpoint.

pub mod batch;
pub mod change;
pub mod coalescer;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod indexer;
pub mod queue;
pub mod transform;

pub use batch::Batch;
pub use change::{ChangeProcessor, Processed};
pub use coalescer::{coalesce, Coalesced};
pub use config::{parse_duration, IndexConfig};
pub use context::ChangeContext;
pub use error::{ChangeError, IndexerError, Result};
pub use executor::execute_batch;
pub use indexer::{Indexer, IndexerHandle, Round};
pub use queue::{changes_channel, ChangeQueue, ChannelQueue};
pub use transform::{ExcludeFields, Transform};
