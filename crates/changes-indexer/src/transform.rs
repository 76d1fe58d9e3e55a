//! User supplied rewriting of changes before they are classified.

use crate::ChangeContext;

/// Rewrites a change before classification.
///
/// The context is taken by value and the returned context replaces it, so a
/// transform may mutate, replace or annotate it (for example by setting
/// `ignore`, `_index` or `_routing`). An error skips the write of that change
/// while its sequence still counts towards the checkpoint.
pub trait Transform: Send + Sync {
    fn transform(&self, ctx: ChangeContext) -> anyhow::Result<ChangeContext>;
}

impl<F> Transform for F
where
    F: Fn(ChangeContext) -> anyhow::Result<ChangeContext> + Send + Sync,
{
    fn transform(&self, ctx: ChangeContext) -> anyhow::Result<ChangeContext> {
        self(ctx)
    }
}

/// Removes the given fields from the document body of every change.
#[derive(Debug, Clone)]
pub struct ExcludeFields {
    fields: Vec<String>,
}

impl ExcludeFields {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Transform for ExcludeFields {
    fn transform(&self, mut ctx: ChangeContext) -> anyhow::Result<ChangeContext> {
        if let Some(mut doc) = ctx.take_doc() {
            for field in &self.fields {
                doc.remove(field);
            }
            ctx.insert("doc", serde_json::Value::Object(doc));
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_transform() {
        let transform = |mut ctx: ChangeContext| {
            ctx.insert("_index", json!("other"));
            Ok::<_, anyhow::Error>(ctx)
        };

        let out = transform
            .transform(ChangeContext::parse(r#"{"id": "a"}"#).unwrap())
            .unwrap();

        assert_eq!(out.get("_index"), Some(&json!("other")));
    }

    #[test]
    fn test_exclude_fields() {
        let transform = ExcludeFields::new(["secret", "missing"]);
        let ctx = ChangeContext::parse(r#"{"id": "a", "doc": {"secret": 1, "kept": 2}}"#).unwrap();

        let out = transform.transform(ctx).unwrap();

        assert_eq!(out.get("doc"), Some(&json!({"kept": 2})));
    }

    #[test]
    fn test_exclude_fields_without_doc() {
        let transform = ExcludeFields::new(["secret"]);
        let ctx = ChangeContext::parse(r#"{"id": "a", "deleted": true}"#).unwrap();

        let out = transform.transform(ctx.clone()).unwrap();

        assert_eq!(out, ctx);
    }
}
