//! The consumer loop of one database.

use std::sync::Arc;
use std::time::Duration;

use checkpoint::{LastSeqFormatter, LAST_SEQ};
use index_sink::IndexSink;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::coalescer::{coalesce, Coalesced};
use crate::error::{IndexerError, Result};
use crate::executor::execute_batch;
use crate::{ChangeProcessor, ChangeQueue};

/// Outcome of one indexing round.
#[derive(Debug, PartialEq)]
pub enum Round {
    /// A batch was processed; carries the persisted checkpoint, if the batch
    /// had one.
    Indexed(Option<String>),
    /// The indexer was closed while waiting for changes.
    Closed,
}

/// Requests a running [`Indexer`] to stop.
///
/// Closing is cooperative: the indexer stops at its next suspension point
/// or at the start of its next round, and never sends another bulk request
/// after noticing it.
#[derive(Debug, Clone)]
pub struct IndexerHandle {
    shutdown: CancellationToken,
}

impl IndexerHandle {
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Replays the changes of one queue into the index, one bulk request per
/// round.
pub struct Indexer<Q, S: ?Sized> {
    database: String,
    queue: Q,
    sink: Arc<S>,
    processor: ChangeProcessor,
    formatter: LastSeqFormatter,
    shutdown: CancellationToken,
}

impl<Q, S> Indexer<Q, S>
where
    Q: ChangeQueue,
    S: IndexSink + ?Sized,
{
    pub fn new(
        database: impl Into<String>,
        queue: Q,
        sink: Arc<S>,
        processor: ChangeProcessor,
    ) -> Self {
        let database = database.into();
        Self {
            formatter: LastSeqFormatter::new(database.clone()),
            database,
            queue,
            sink,
            processor,
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie this indexer to an external shutdown token, e.g. a child of a
    /// process wide one.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn handle(&self) -> IndexerHandle {
        IndexerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Run rounds until closed.
    ///
    /// A failed bulk request is logged and the loop moves on; its checkpoint
    /// was not persisted, so its changes are replayed after a restart. Any
    /// other error is logged and followed by a pause of `error_backoff`.
    pub async fn run(mut self) {
        let span = info_span!("indexer", database = %self.database);
        async move {
            while !self.shutdown.is_cancelled() {
                match self.index().await {
                    Ok(Round::Indexed(Some(seq))) => {
                        debug!("Succeeded to index change with seq=[{}].", seq);
                    }
                    Ok(Round::Indexed(None)) => {}
                    Ok(Round::Closed) => self.shutdown.cancel(),
                    Err(IndexerError::BatchFailure(message)) => {
                        warn!("Failed to execute bulk request: {}", message);
                    }
                    Err(e) => {
                        error!("Unhandled error: {:#}", e);
                        let pause = self.processor.config().error_backoff;
                        backoff(pause, self.shutdown.clone()).await;
                    }
                }
            }
            info!("Closed.");
        }
        .instrument(span)
        .await
    }

    /// Run one round: coalesce a batch, append the checkpoint update and
    /// send it.
    pub async fn index(&mut self) -> Result<Round> {
        let (mut batch, last_seq) =
            match coalesce(&mut self.queue, &self.processor, &self.shutdown).await? {
                Coalesced::Closed => return Ok(Round::Closed),
                Coalesced::Batch { batch, last_seq } => (batch, last_seq),
            };

        let last_seq = self.formatter.format(last_seq.as_ref());
        if let Some(seq) = &last_seq {
            batch.push(self.processor.factory().last_seq_request(seq)?);
            debug!("Will update {} to [{}].", LAST_SEQ, seq);
        }

        execute_batch(self.sink.as_ref(), &batch).await?;
        Ok(Round::Indexed(last_seq))
    }
}

/// Pause after an unexpected error, cut short by shutdown.
async fn backoff(pause: Duration, shutdown: CancellationToken) {
    debug!("Pausing {:?} to avoid log flooding", pause);
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(pause) => {}
    }
}

impl<Q, S> Indexer<Q, S>
where
    Q: ChangeQueue + 'static,
    S: IndexSink + ?Sized + 'static,
{
    /// Run the loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
