//! Parsed representation of one change of the feed.

use serde_json::{Map, Value};

use crate::error::ChangeError;

/// Prefix of design document ids. Design documents move the feed forward
/// but are never indexed.
pub const DESIGN_DOC_PREFIX: &str = "_design/";

/// Revision marker stripped from indexed documents.
pub const REV_FIELD: &str = "_rev";

/// Attachment metadata optionally stripped from indexed documents.
pub const ATTACHMENTS_FIELD: &str = "_attachments";

/// Fields of a change, as read from the feed and possibly rewritten by a
/// [`Transform`](crate::Transform).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeContext {
    fields: Map<String, Value>,
}

impl ChangeContext {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parse one raw line of the feed.
    pub fn parse(raw: &str) -> Result<Self, ChangeError> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ChangeError::NotAnObject),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `id` rendered as text: strings as-is, other values as JSON. Null
    /// counts as absent.
    pub fn id(&self) -> Option<String> {
        match self.fields.get("id") {
            None | Some(Value::Null) => None,
            Some(id) => Some(value_to_text(id)),
        }
    }

    /// `true` only for a JSON `true`, like the feed's `deleted` flag.
    pub fn flag(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(Value::Bool(true)))
    }

    /// Optional string field. Null counts as absent, any other non-string
    /// value is rejected.
    pub fn optional_str(&self, field: &'static str) -> Result<Option<String>, ChangeError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ChangeError::InvalidField {
                field,
                value: other.clone(),
            }),
        }
    }

    /// Remove and return the document body if it is an object.
    pub fn take_doc(&mut self) -> Option<Map<String, Value>> {
        match self.fields.remove("doc") {
            Some(Value::Object(doc)) => Some(doc),
            Some(other) => {
                self.fields.insert("doc".to_string(), other);
                None
            }
            None => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for ChangeContext {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(
            ChangeContext::parse("[1,2]"),
            Err(ChangeError::NotAnObject)
        ));
        assert!(matches!(
            ChangeContext::parse("{not json"),
            Err(ChangeError::Parse(_))
        ));
    }

    #[test]
    fn test_id_rendering() {
        let ctx = ChangeContext::parse(r#"{"id": "doc1"}"#).unwrap();
        assert_eq!(ctx.id().as_deref(), Some("doc1"));

        let ctx = ChangeContext::parse(r#"{"id": 42}"#).unwrap();
        assert_eq!(ctx.id().as_deref(), Some("42"));

        let ctx = ChangeContext::parse(r#"{"id": null}"#).unwrap();
        assert_eq!(ctx.id(), None);
    }

    #[test]
    fn test_flag_requires_boolean_true() {
        let ctx = ChangeContext::parse(r#"{"a": true, "b": "true", "c": false}"#).unwrap();
        assert!(ctx.flag("a"));
        assert!(!ctx.flag("b"));
        assert!(!ctx.flag("c"));
        assert!(!ctx.flag("d"));
    }

    #[test]
    fn test_optional_str() {
        let ctx = ChangeContext::parse(r#"{"_routing": "r", "_parent": null, "_index": 3}"#).unwrap();
        assert_eq!(ctx.optional_str("_routing").unwrap().as_deref(), Some("r"));
        assert_eq!(ctx.optional_str("_parent").unwrap(), None);
        assert_eq!(ctx.optional_str("_type").unwrap(), None);
        assert!(matches!(
            ctx.optional_str("_index"),
            Err(ChangeError::InvalidField { field: "_index", .. })
        ));
    }

    #[test]
    fn test_take_doc_only_takes_objects() {
        let mut ctx = ChangeContext::new(Map::new());
        ctx.insert("doc", json!("not a body"));
        assert_eq!(ctx.take_doc(), None);
        assert!(ctx.contains("doc"));

        ctx.insert("doc", json!({"a": 1}));
        assert_eq!(ctx.take_doc().unwrap()["a"], json!(1));
        assert!(!ctx.contains("doc"));
    }
}
