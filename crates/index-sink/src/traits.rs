//! IndexSink trait definition.
//!
//! The sink is the network client of the downstream index. It receives the
//! ordered operations of one bulk request and reports, per operation,
//! whether it was applied.

use anyhow::Result;

use crate::WriteOp;

/// Outcome of one operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    pub action: &'static str,
    pub index: String,
    pub doc_type: String,
    pub id: String,
    /// Failure reason; `None` when the operation was applied.
    pub failure: Option<String>,
}

impl BulkItem {
    pub fn ok(op: &WriteOp) -> Self {
        Self::from_op(op, None)
    }

    pub fn failed(op: &WriteOp, reason: impl Into<String>) -> Self {
        Self::from_op(op, Some(reason.into()))
    }

    fn from_op(op: &WriteOp, failure: Option<String>) -> Self {
        let target = op.target();
        Self {
            action: op.action(),
            index: target.index.clone(),
            doc_type: target.doc_type.clone(),
            id: target.id.clone(),
            failure,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Response to a bulk request, one item per submitted operation in
/// submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(BulkItem::is_failed)
    }

    /// Human readable summary of the failed items.
    pub fn failure_message(&self) -> String {
        let mut message = String::from("failure in bulk execution:");
        for (i, item) in self.items.iter().enumerate() {
            if let Some(reason) = &item.failure {
                message.push_str(&format!(
                    "\n[{i}]: {} index [{}], type [{}], id [{}], message [{reason}]",
                    item.action, item.index, item.doc_type, item.id
                ));
            }
        }
        message
    }
}

/// Trait for writing bulk requests to the downstream index.
///
/// An `Err` means the call itself failed (transport or protocol error);
/// rejected operations are reported through [`BulkResponse`].
///
/// Implementations must be safe to share between indexers; each indexer
/// issues its bulk requests sequentially.
#[async_trait::async_trait]
pub trait IndexSink: Send + Sync {
    async fn bulk(&self, ops: &[WriteOp]) -> Result<BulkResponse>;
}
