//! Parsing and classification of single changes.

use std::sync::Arc;

use checkpoint::Sequence;
use index_sink::{DocTarget, RequestFactory, WriteOp};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::context::{value_to_text, ATTACHMENTS_FIELD, DESIGN_DOC_PREFIX, REV_FIELD};
use crate::error::{ChangeError, Result};
use crate::{ChangeContext, IndexConfig, Transform};

/// Result of processing one raw change.
///
/// `seq` is `None` only when the change could not be read at all; it must
/// then not count towards the checkpoint.
#[derive(Debug, Default, PartialEq)]
pub struct Processed {
    pub seq: Option<Sequence>,
    pub op: Option<WriteOp>,
}

impl Processed {
    fn dropped() -> Self {
        Self::default()
    }

    fn skipped(seq: Sequence) -> Self {
        Self {
            seq: Some(seq),
            op: None,
        }
    }
}

/// Turns raw feed lines into at most one write operation each.
pub struct ChangeProcessor {
    config: IndexConfig,
    transform: Option<Arc<dyn Transform>>,
    factory: Arc<dyn RequestFactory>,
}

impl ChangeProcessor {
    /// `config` must already carry the index and type defaults, see
    /// [`IndexConfig::for_database`].
    pub fn new(config: IndexConfig, factory: Arc<dyn RequestFactory>) -> Self {
        Self {
            config,
            transform: None,
            factory,
        }
    }

    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn factory(&self) -> &dyn RequestFactory {
        self.factory.as_ref()
    }

    /// Process one raw change.
    ///
    /// Unreadable, feed-reported and incomplete changes are logged and
    /// dropped. Errors are reserved for failures of the request factory.
    pub fn process(&self, raw: &str) -> Result<Processed> {
        let (ctx, id, seq) = match self.read(raw) {
            Ok(read) => read,
            Err(e) => {
                match &e {
                    ChangeError::FeedReported { error, reason } => warn!(
                        "Error=[{}] when processing change=[{}], reason=[{}].",
                        error, raw, reason
                    ),
                    ChangeError::MissingIdOrSeq => {
                        warn!("Missing id or seq in change=[{}].", raw)
                    }
                    other => warn!("Failed to parse change=[{}]: {}", raw, other),
                }
                return Ok(Processed::dropped());
            }
        };

        if id.starts_with(DESIGN_DOC_PREFIX) {
            trace!("Ignoring design document with id=[{}].", id);
            return Ok(Processed::skipped(seq));
        }

        let ctx = match &self.transform {
            None => ctx,
            Some(transform) => match transform.transform(ctx) {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!(
                        "Failed to run transform on change [id={}]; changes feed seq=[{}]: {:#}",
                        id, seq, e
                    );
                    return Ok(Processed::skipped(seq));
                }
            },
        };

        let op = self.classify(ctx, raw, &id, &seq)?;
        Ok(Processed { seq: Some(seq), op })
    }

    fn read(
        &self,
        raw: &str,
    ) -> std::result::Result<(ChangeContext, String, Sequence), ChangeError> {
        let ctx = ChangeContext::parse(raw)?;

        if let Some(error) = ctx.get("error") {
            return Err(ChangeError::FeedReported {
                error: value_to_text(error),
                reason: ctx.get("reason").map(value_to_text).unwrap_or_default(),
            });
        }

        let id = ctx.id().ok_or(ChangeError::MissingIdOrSeq)?;
        let seq = ctx
            .get("seq")
            .and_then(Sequence::from_value)
            .ok_or(ChangeError::MissingIdOrSeq)?;

        Ok((ctx, id, seq))
    }

    fn classify(
        &self,
        mut ctx: ChangeContext,
        raw: &str,
        id: &str,
        seq: &Sequence,
    ) -> Result<Option<WriteOp>> {
        if ctx.flag("ignore") {
            debug!("Ignoring update of document [id={}]; changes feed seq=[{}].", id, seq);
            return Ok(None);
        }

        if ctx.flag("deleted") {
            debug!(
                "Processing document [id={}] marked as \"deleted\"; changes feed seq=[{}].",
                id, seq
            );
            let Some(target) = self.target_or_skip(&ctx, raw, id, seq) else {
                return Ok(None);
            };
            return Ok(Some(self.factory.delete_request(target)?));
        }

        if let Some(doc) = ctx.take_doc() {
            let doc = self.strip_metadata(doc);
            trace!(?doc, "Processing document [id={}]; changes feed seq=[{}].", id, seq);
            let Some(target) = self.target_or_skip(&ctx, raw, id, seq) else {
                return Ok(None);
            };
            return Ok(Some(self.factory.index_request(target, doc)?));
        }

        warn!("Ignoring unknown change=[{}]; changes feed seq=[{}].", raw, seq);
        Ok(None)
    }

    fn strip_metadata(&self, mut doc: Map<String, Value>) -> Map<String, Value> {
        doc.remove(REV_FIELD);
        if self.config.ignore_attachments {
            doc.remove(ATTACHMENTS_FIELD);
        }
        doc
    }

    /// Resolve the target of a write, or log and skip the change when one
    /// of its overrides is not a string. The rest of the batch still ships.
    fn target_or_skip(
        &self,
        ctx: &ChangeContext,
        raw: &str,
        id: &str,
        seq: &Sequence,
    ) -> Option<DocTarget> {
        match self.resolve_target(ctx, id) {
            Ok(target) => Some(target),
            Err(e) => {
                warn!(
                    "Ignoring change=[{}] of document [id={}]; changes feed seq=[{}]: {}",
                    raw, id, seq, e
                );
                None
            }
        }
    }

    fn resolve_target(
        &self,
        ctx: &ChangeContext,
        id: &str,
    ) -> std::result::Result<DocTarget, ChangeError> {
        let index = ctx
            .optional_str("_index")?
            .unwrap_or_else(|| self.config.index_name().to_string());
        let doc_type = ctx
            .optional_str("_type")?
            .unwrap_or_else(|| self.config.type_name().to_string());

        Ok(DocTarget::new(index, doc_type, id)
            .with_routing(ctx.optional_str("_routing")?)
            .with_parent(ctx.optional_str("_parent")?))
    }
}
