//! feed-indexer library
//!
//! Wires the batching engine of `changes-indexer` to a line based change
//! feed and an NDJSON bulk body output.
//!
//! # CLI Usage
//!
//! ```bash
//! # Replay a saved _changes feed into a bulk body
//! feed-indexer --database users --input changes.jsonl --output bulk.ndjson
//!
//! # Stream from stdin with bigger bulks and attachment stripping
//! curl -s 'http://localhost:5984/users/_changes?feed=continuous&include_docs=true' \
//!   | feed-indexer --database users --bulk-size 500 --ignore-attachments
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use changes_indexer::{changes_channel, ChangeProcessor, ExcludeFields, IndexConfig, Indexer};
use clap::Args;
use index_sink::{NdjsonSink, RiverRequestFactory};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Args, Clone, Debug)]
pub struct RunOpts {
    /// Name of the source database; also the default index and type
    #[arg(long, env = "FEED_INDEXER_DATABASE")]
    pub database: String,

    /// File with one change per line (defaults to stdin)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// File the bulk body is appended to (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Index holding the last_seq checkpoint documents
    #[arg(long, default_value = "_river")]
    pub river_index: String,

    /// Field removed from every document body before indexing (repeatable)
    #[arg(long = "exclude-field", value_name = "FIELD")]
    pub exclude_fields: Vec<String>,

    /// Maximum number of changes buffered between the feed and the indexer
    #[arg(long, default_value_t = 1000)]
    pub queue_capacity: usize,

    /// TOML file with an [index] table; replaces the index flags when given
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub index: IndexConfig,
}

impl RunOpts {
    /// Index configuration from `--config` if given, otherwise from flags,
    /// with defaults taken from the database name.
    pub fn index_config(&self) -> anyhow::Result<IndexConfig> {
        let config = match &self.config {
            Some(path) => IndexConfig::from_file(path)?,
            None => self.index.clone().validate()?,
        };
        Ok(config.for_database(&self.database))
    }

    pub fn processor(&self, config: IndexConfig) -> ChangeProcessor {
        let factory = Arc::new(RiverRequestFactory::new(&self.river_index, &self.database));
        let processor = ChangeProcessor::new(config, factory);
        if self.exclude_fields.is_empty() {
            processor
        } else {
            processor.with_transform(Arc::new(ExcludeFields::new(self.exclude_fields.clone())))
        }
    }
}

/// Replay the feed until it ends or `shutdown` is cancelled.
pub async fn run(opts: RunOpts, shutdown: CancellationToken) -> anyhow::Result<()> {
    let config = opts.index_config()?;
    info!(
        "Indexing database {} into index {} (bulk_size={}, bulk_timeout={:?})",
        opts.database,
        config.index_name(),
        config.bulk_size,
        config.bulk_timeout
    );

    let input = open_input(opts.input.as_deref()).await?;
    let output = open_output(opts.output.as_deref()).await?;

    let (tx, queue) = changes_channel(opts.queue_capacity.max(1));
    let sink = Arc::new(NdjsonSink::new(output));
    let indexer = Indexer::new(&opts.database, queue, sink, opts.processor(config))
        .with_shutdown(shutdown.child_token());
    let handle = indexer.handle();
    let task = indexer.spawn();

    let read = read_changes(input, tx, &shutdown).await;
    if read.is_err() {
        handle.close();
    }
    task.await.context("Indexer task panicked")?;

    let count = read?;
    info!("Feed of {} ended after {} changes", opts.database, count);
    Ok(())
}

/// Push every non-blank line of `reader` onto the queue.
///
/// Returns the number of lines pushed. Stops early when `shutdown` is
/// cancelled or the indexer went away. Dropping `tx` on return lets the
/// indexer drain the queue and close.
pub async fn read_changes<R>(
    reader: R,
    tx: mpsc::Sender<String>,
    shutdown: &CancellationToken,
) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read change feed")?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(line).await.is_err() {
            debug!("Indexer stopped, no longer reading the feed");
            break;
        }
        count += 1;
    }
    Ok(count)
}

type Input = BufReader<Box<dyn AsyncRead + Unpin + Send>>;
type Output = Box<dyn AsyncWrite + Unpin + Send>;

async fn open_input(path: Option<&Path>) -> anyhow::Result<Input> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = match path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    Ok(BufReader::new(reader))
}

async fn open_output(path: Option<&Path>) -> anyhow::Result<Output> {
    Ok(match path {
        Some(path) => Box::new(
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("Failed to open output {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_changes_skips_blank_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"{\"seq\":1}\n\n   \n{\"seq\":2}\n";

        let count = read_changes(input, tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(rx.recv().await.as_deref(), Some("{\"seq\":1}"));
        assert_eq!(rx.recv().await.as_deref(), Some("{\"seq\":2}"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_read_changes_stops_on_shutdown() {
        let (tx, _rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let input: &[u8] = b"{\"seq\":1}\n";

        let count = read_changes(input, tx, &shutdown).await.unwrap();

        assert_eq!(count, 0);
    }
}
