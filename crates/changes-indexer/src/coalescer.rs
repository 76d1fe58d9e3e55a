//! Assembly of one batch from the input queue.
//!
//! The first change of a round is awaited without limit. Once it arrived,
//! further changes are pulled with the configured bulk timeout until the
//! queue stays quiet for that long or the batch holds `bulk_size` actions.
//! Shutdown is honored at every wait and abandons the batch.
//! Latency is therefore capped by the timeout and throughput by the size.

use checkpoint::Sequence;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::change::ChangeProcessor;
use crate::error::Result;
use crate::{Batch, ChangeQueue};

/// Outcome of one coalescing round.
#[derive(Debug, PartialEq)]
pub enum Coalesced {
    /// A batch was assembled. `last_seq` is the sequence of the last change
    /// that could be read, if any.
    Batch {
        batch: Batch,
        last_seq: Option<Sequence>,
    },
    /// Shutdown was requested, or the queue was closed while waiting for the
    /// first change. A partially assembled batch is abandoned.
    Closed,
}

pub async fn coalesce<Q>(
    queue: &mut Q,
    processor: &ChangeProcessor,
    shutdown: &CancellationToken,
) -> Result<Coalesced>
where
    Q: ChangeQueue + ?Sized,
{
    let first = tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        change = queue.take() => change,
    };
    let Some(first) = first else {
        return Ok(Coalesced::Closed);
    };

    let config = processor.config();
    let mut batch = Batch::new();
    let mut last_seq = append(processor, &first, &mut batch)?;

    while batch.len() < config.bulk_size {
        let change = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(Coalesced::Closed),
            change = queue.poll(config.bulk_timeout) => change,
        };
        let Some(change) = change else {
            break;
        };
        if let Some(seq) = append(processor, &change, &mut batch)? {
            last_seq = Some(seq);
        }
    }
    if batch.len() >= config.bulk_size {
        trace!("Batch reached bulk_size={}", config.bulk_size);
    }

    Ok(Coalesced::Batch { batch, last_seq })
}

fn append(processor: &ChangeProcessor, raw: &str, batch: &mut Batch) -> Result<Option<Sequence>> {
    let processed = processor.process(raw)?;
    if let Some(op) = processed.op {
        batch.push(op);
    }
    Ok(processed.seq)
}
