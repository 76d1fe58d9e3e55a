//! Submission of an assembled batch as one bulk request.

use index_sink::IndexSink;
use tracing::trace;

use crate::error::{IndexerError, Result};
use crate::Batch;

/// Send `batch` to `sink` as a single bulk request.
///
/// An empty batch is not sent. Any rejected operation, as well as a failed
/// call, is reported as [`IndexerError::BatchFailure`].
pub async fn execute_batch<S>(sink: &S, batch: &Batch) -> Result<()>
where
    S: IndexSink + ?Sized,
{
    if batch.is_empty() {
        return Ok(());
    }

    trace!("Executing bulk request with {} actions", batch.len());
    let response = sink
        .bulk(batch.ops())
        .await
        .map_err(|e| IndexerError::batch_failure(&e))?;

    if response.has_failures() {
        return Err(IndexerError::BatchFailure(response.failure_message()));
    }
    Ok(())
}
