//! In-memory index store.
//!
//! Applies each bulk request all-or-nothing: when any operation is rejected
//! nothing of the request is applied, so a checkpoint shipped in a failed
//! request is never persisted.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use checkpoint::CheckpointStore;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::factory::{RiverRequestFactory, SEQ_DOC_ID};
use crate::{BulkItem, BulkResponse, IndexSink, WriteOp};

type DocKey = (String, String, String);

#[derive(Debug, Default)]
struct State {
    docs: HashMap<DocKey, Map<String, Value>>,
    bulk_calls: usize,
    rejected_ids: HashSet<String>,
    transport_failures: usize,
}

/// Index store kept in process memory.
#[derive(Debug)]
pub struct MemorySink {
    river_index: String,
    state: Mutex<State>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("_river")
    }
}

impl MemorySink {
    /// `river_index` is where checkpoint documents are looked up.
    pub fn new(river_index: impl Into<String>) -> Self {
        Self {
            river_index: river_index.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Reject every operation addressing a document with this id.
    pub async fn reject_id(&self, id: impl Into<String>) {
        self.state.lock().await.rejected_ids.insert(id.into());
    }

    pub async fn accept_id(&self, id: &str) {
        self.state.lock().await.rejected_ids.remove(id);
    }

    /// Fail the next `count` bulk calls before they reach the store.
    pub async fn fail_next_bulk_calls(&self, count: usize) {
        self.state.lock().await.transport_failures = count;
    }

    pub async fn get(&self, index: &str, doc_type: &str, id: &str) -> Option<Map<String, Value>> {
        let key = (index.to_string(), doc_type.to_string(), id.to_string());
        self.state.lock().await.docs.get(&key).cloned()
    }

    /// Number of stored documents, checkpoint documents included.
    pub async fn len(&self) -> usize {
        self.state.lock().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of bulk calls received, failed ones included.
    pub async fn bulk_calls(&self) -> usize {
        self.state.lock().await.bulk_calls
    }
}

#[async_trait]
impl IndexSink for MemorySink {
    async fn bulk(&self, ops: &[WriteOp]) -> Result<BulkResponse> {
        let mut state = self.state.lock().await;
        state.bulk_calls += 1;

        if state.transport_failures > 0 {
            state.transport_failures -= 1;
            anyhow::bail!("connection refused");
        }

        let rejected: Vec<bool> = ops
            .iter()
            .map(|op| state.rejected_ids.contains(&op.target().id))
            .collect();

        if rejected.iter().any(|r| *r) {
            let items = ops
                .iter()
                .zip(&rejected)
                .map(|(op, rejected)| {
                    if *rejected {
                        BulkItem::failed(op, "rejected by index")
                    } else {
                        BulkItem::failed(op, "not applied: bulk rolled back")
                    }
                })
                .collect();
            return Ok(BulkResponse { items });
        }

        let mut items = Vec::with_capacity(ops.len());
        for op in ops {
            let target = op.target();
            let key = (
                target.index.clone(),
                target.doc_type.clone(),
                target.id.clone(),
            );
            match op {
                WriteOp::Index { doc, .. } => {
                    state.docs.insert(key, doc.clone());
                }
                WriteOp::Delete { .. } => {
                    state.docs.remove(&key);
                }
            }
            items.push(BulkItem::ok(op));
        }
        Ok(BulkResponse { items })
    }
}

#[async_trait]
impl CheckpointStore for MemorySink {
    async fn read_last_seq(&self, database: &str) -> Result<Option<String>> {
        Ok(self
            .get(&self.river_index, database, SEQ_DOC_ID)
            .await
            .and_then(|doc| RiverRequestFactory::last_seq_from_doc(&doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocTarget, RequestFactory};
    use serde_json::json;

    fn index_op(id: &str, body: Value) -> WriteOp {
        let doc = match body {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        };
        WriteOp::Index {
            target: DocTarget::new("db", "db", id),
            doc,
        }
    }

    #[tokio::test]
    async fn test_applies_ops_in_order() {
        let sink = MemorySink::default();
        let ops = vec![
            index_op("a", json!({"v": 1})),
            index_op("a", json!({"v": 2})),
            index_op("b", json!({"v": 3})),
            WriteOp::Delete {
                target: DocTarget::new("db", "db", "b"),
            },
        ];

        let response = sink.bulk(&ops).await.unwrap();

        assert!(!response.has_failures());
        assert_eq!(response.items.len(), 4);
        assert_eq!(sink.get("db", "db", "a").await.unwrap()["v"], json!(2));
        assert!(sink.get("db", "db", "b").await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_op_rolls_back_whole_bulk() {
        let sink = MemorySink::default();
        sink.reject_id("bad").await;
        let factory = RiverRequestFactory::new("_river", "db");
        let ops = vec![
            index_op("good", json!({})),
            index_op("bad", json!({})),
            factory.last_seq_request("9").unwrap(),
        ];

        let response = sink.bulk(&ops).await.unwrap();

        assert!(response.has_failures());
        assert!(response.failure_message().contains("rejected by index"));
        assert!(sink.is_empty().await);
        assert_eq!(sink.read_last_seq("db").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let sink = MemorySink::default();
        sink.fail_next_bulk_calls(1).await;

        assert!(sink.bulk(&[index_op("a", json!({}))]).await.is_err());
        assert!(sink.bulk(&[index_op("a", json!({}))]).await.is_ok());
        assert_eq!(sink.bulk_calls().await, 2);
    }

    #[tokio::test]
    async fn test_reads_persisted_checkpoint() {
        let sink = MemorySink::default();
        let factory = RiverRequestFactory::new("_river", "db");
        sink.bulk(&[factory.last_seq_request("[3,\"x\"]").unwrap()])
            .await
            .unwrap();

        assert_eq!(
            sink.read_last_seq("db").await.unwrap().as_deref(),
            Some("[3,\"x\"]")
        );
        assert_eq!(sink.read_last_seq("other").await.unwrap(), None);
    }
}
