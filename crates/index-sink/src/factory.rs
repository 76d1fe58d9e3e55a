//! Request builder turning classified changes into write operations.

use anyhow::Result;
use checkpoint::LAST_SEQ;
use serde_json::{json, Map, Value};

use crate::{DocTarget, WriteOp};

/// Id of the document holding the persisted checkpoint.
pub const SEQ_DOC_ID: &str = "_seq";

/// Builds the write operations appended to a bulk request.
///
/// Implementations decide how the checkpoint is addressed and encoded in the
/// index; the indexer only knows that it must ship inside the same bulk.
pub trait RequestFactory: Send + Sync {
    fn index_request(&self, target: DocTarget, doc: Map<String, Value>) -> Result<WriteOp>;

    fn delete_request(&self, target: DocTarget) -> Result<WriteOp>;

    /// Operation persisting `last_seq` (already formatted).
    fn last_seq_request(&self, last_seq: &str) -> Result<WriteOp>;
}

/// Stores the checkpoint as `{river_index}/{river_name}/_seq` with body
/// `{"couchdb": {"last_seq": "..."}}`.
#[derive(Debug, Clone)]
pub struct RiverRequestFactory {
    river_index: String,
    river_name: String,
}

impl RiverRequestFactory {
    pub fn new(river_index: impl Into<String>, river_name: impl Into<String>) -> Self {
        Self {
            river_index: river_index.into(),
            river_name: river_name.into(),
        }
    }

    /// Address of the checkpoint document.
    pub fn seq_target(&self) -> DocTarget {
        DocTarget::new(&self.river_index, &self.river_name, SEQ_DOC_ID)
    }

    /// Extract the persisted checkpoint from a checkpoint document body.
    pub fn last_seq_from_doc(doc: &Map<String, Value>) -> Option<String> {
        doc.get("couchdb")?
            .get(LAST_SEQ)?
            .as_str()
            .map(str::to_string)
    }
}

impl RequestFactory for RiverRequestFactory {
    fn index_request(&self, target: DocTarget, doc: Map<String, Value>) -> Result<WriteOp> {
        Ok(WriteOp::Index { target, doc })
    }

    fn delete_request(&self, target: DocTarget) -> Result<WriteOp> {
        Ok(WriteOp::Delete { target })
    }

    fn last_seq_request(&self, last_seq: &str) -> Result<WriteOp> {
        let mut doc = Map::new();
        doc.insert("couchdb".to_string(), json!({ LAST_SEQ: last_seq }));
        Ok(WriteOp::Index {
            target: self.seq_target(),
            doc,
        })
    }
}
