//! Command-line interface for feed-indexer
//!
//! # Usage Examples
//!
//! ```bash
//! # Replay a saved changes feed, bulk body to stdout
//! feed-indexer --database users --input changes.jsonl
//!
//! # Custom index and type, drop a field from every document
//! feed-indexer --database users --index people --type person \
//!   --exclude-field password_hash --output bulk.ndjson
//!
//! # Index settings from a file
//! feed-indexer --database users --config indexer.toml
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG`, e.g.
//! `RUST_LOG=changes_indexer=debug`.

use clap::Parser;
use feed_indexer::RunOpts;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "feed-indexer")]
#[command(about = "Replay a database change feed into a search index bulk body")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    run: RunOpts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing; stdout may carry the bulk body
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl-C, closing indexer");
                shutdown.cancel();
            }
        });
    }

    feed_indexer::run(cli.run, shutdown).await
}
