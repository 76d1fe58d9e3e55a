//! Sink writing bulk requests as newline-delimited JSON.
//!
//! The output is a valid bulk body for the index's `_bulk` endpoint, so it
//! can be replayed against a live cluster later.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::{BulkItem, BulkResponse, IndexSink, WriteOp};

pub struct NdjsonSink<W> {
    writer: Mutex<W>,
}

impl<W> NdjsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> IndexSink for NdjsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn bulk(&self, ops: &[WriteOp]) -> Result<BulkResponse> {
        let mut body = String::new();
        for op in ops {
            for line in op.to_bulk_lines() {
                body.push_str(&line);
                body.push('\n');
            }
        }

        let mut writer = self.writer.lock().await;
        writer
            .write_all(body.as_bytes())
            .await
            .context("Failed to write bulk body")?;
        writer.flush().await.context("Failed to flush bulk body")?;

        tracing::trace!("Wrote bulk body with {} operations", ops.len());

        Ok(BulkResponse {
            items: ops.iter().map(BulkItem::ok).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocTarget;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn test_writes_one_line_per_bulk_line() {
        let sink = NdjsonSink::new(Vec::<u8>::new());
        let mut doc = Map::new();
        doc.insert("n".to_string(), json!(1));
        let ops = vec![
            WriteOp::Index {
                target: DocTarget::new("db", "db", "a"),
                doc,
            },
            WriteOp::Delete {
                target: DocTarget::new("db", "db", "b"),
            },
        ];

        let response = sink.bulk(&ops).await.unwrap();

        assert_eq!(response.items.len(), 2);
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], r#"{"n":1}"#);
        assert!(output.ends_with('\n'));
    }
}
