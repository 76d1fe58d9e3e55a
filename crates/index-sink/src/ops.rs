//! Write operations carried by a bulk request.

use serde_json::{json, Map, Value};

/// Address of a document in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocTarget {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub routing: Option<String>,
    pub parent: Option<String>,
}

impl DocTarget {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            routing: None,
            parent: None,
        }
    }

    pub fn with_routing(mut self, routing: Option<String>) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    /// Metadata object of the bulk action line.
    fn action_metadata(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), Value::String(self.index.clone()));
        meta.insert("_type".to_string(), Value::String(self.doc_type.clone()));
        meta.insert("_id".to_string(), Value::String(self.id.clone()));
        if let Some(routing) = &self.routing {
            meta.insert("routing".to_string(), Value::String(routing.clone()));
        }
        if let Some(parent) = &self.parent {
            meta.insert("parent".to_string(), Value::String(parent.clone()));
        }
        Value::Object(meta)
    }
}

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace the document at `target`.
    Index {
        target: DocTarget,
        doc: Map<String, Value>,
    },
    /// Remove the document at `target`.
    Delete { target: DocTarget },
}

impl WriteOp {
    pub fn target(&self) -> &DocTarget {
        match self {
            Self::Index { target, .. } | Self::Delete { target } => target,
        }
    }

    /// Bulk action name, as reported in per-item responses.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Index { .. } => "index",
            Self::Delete { .. } => "delete",
        }
    }

    /// Encode as newline-delimited bulk body lines (without trailing newline).
    ///
    /// Index operations take two lines (action and source), deletes one.
    pub fn to_bulk_lines(&self) -> Vec<String> {
        let action = json!({ self.action(): self.target().action_metadata() });
        match self {
            Self::Index { doc, .. } => {
                vec![action.to_string(), Value::Object(doc.clone()).to_string()]
            }
            Self::Delete { .. } => vec![action.to_string()],
        }
    }
}
