//! One bulk request being assembled.

use index_sink::WriteOp;

/// Ordered write operations of one indexing round.
///
/// Operations keep the order in which their changes arrived on the feed; the
/// checkpoint update, when there is one, is pushed last.
#[derive(Debug, Default, PartialEq)]
pub struct Batch {
    ops: Vec<WriteOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    /// Number of actions in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
