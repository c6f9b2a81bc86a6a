//! Conversion engine
//!
//! Ties one chain and one conversion step to a store. For each document the
//! engine captures the original content on first contact, runs
//!
//!     run_pre → convert_to_blocks → run_post
//!
//! over that original, and on success writes the blocks to both the snapshot's
//! post-conversion column and the live field. Re-converting always starts from
//! the captured original, so the original is never overwritten and repeated
//! conversions do not compound.

use crate::chain::PatchChain;
use crate::converter::BlockConverter;
use crate::document::DocumentId;
use crate::error::{ConvertError, StorageError};
use crate::store::SnapshotStore;

pub struct ConversionEngine {
    chain: PatchChain,
    converter: Box<dyn BlockConverter>,
}

/// Per-document outcome of [`ConversionEngine::convert_batch`]
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<DocumentId>,
    pub failed: Vec<ConvertError>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ConversionEngine {
    pub fn new(chain: PatchChain, converter: impl BlockConverter + 'static) -> Self {
        Self {
            chain,
            converter: Box::new(converter),
        }
    }

    pub fn chain(&self) -> &PatchChain {
        &self.chain
    }

    /// Run the full pipeline on `html` without touching any store
    pub fn convert_content(&self, id: DocumentId, html: &str) -> Result<String, ConvertError> {
        let mut run = self.chain.begin(id);
        let prepared = run.run_pre(html)?;
        let blocks = self
            .converter
            .convert_to_blocks(&prepared)
            .map_err(|source| ConvertError::ConversionStep {
                document_id: id,
                source,
            })?;
        run.run_post(&blocks)
    }

    /// Convert one stored document and return the blocks written to it
    pub fn convert<S: SnapshotStore + ?Sized>(
        &self,
        store: &S,
        id: DocumentId,
    ) -> Result<String, ConvertError> {
        let storage = |source: StorageError| ConvertError::Storage {
            document_id: id,
            source,
        };

        let original = match store.snapshot(id).map_err(storage)? {
            Some(snapshot) => snapshot.pre_conversion_content,
            None => {
                let live = store.live_content(id).map_err(storage)?;
                if store.capture_original(id, &live).map_err(storage)? {
                    log::debug!("document {id}: captured original content");
                    live
                } else {
                    // Captured by someone else between the two reads.
                    store
                        .snapshot(id)
                        .map_err(storage)?
                        .map(|snapshot| snapshot.pre_conversion_content)
                        .ok_or_else(|| storage(StorageError::UnknownDocument(id)))?
                }
            }
        };

        let blocks = self.convert_content(id, &original)?;
        store.record_converted(id, &blocks).map_err(storage)?;
        store.set_live_content(id, &blocks).map_err(storage)?;

        log::info!("document {id}: converted ({} bytes of blocks)", blocks.len());
        Ok(blocks)
    }

    /// Convert documents one at a time; a failure only affects its own document
    pub fn convert_batch<S: SnapshotStore + ?Sized>(
        &self,
        store: &S,
        ids: &[DocumentId],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for &id in ids {
            match self.convert(store, id) {
                Ok(_) => report.converted.push(id),
                Err(err) => {
                    log::warn!("{err}");
                    report.failed.push(err);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::HtmlBlockConverter;
    use crate::error::{ConversionStepError, Phase};
    use crate::registry::PatcherRegistry;
    use crate::store::MemoryStore;

    struct Identity;
    impl BlockConverter for Identity {
        fn convert_to_blocks(&self, html: &str) -> Result<String, ConversionStepError> {
            Ok(html.to_string())
        }
    }

    struct Refuse;
    impl BlockConverter for Refuse {
        fn convert_to_blocks(&self, _html: &str) -> Result<String, ConversionStepError> {
            Err(ConversionStepError::new("parser gave up"))
        }
    }

    #[test]
    fn convert_writes_snapshot_and_live_field() {
        let store = MemoryStore::with_documents([(DocumentId(1), "<p>Hi</p>")]);
        let engine = ConversionEngine::new(PatchChain::new(), HtmlBlockConverter::default());

        let blocks = engine.convert(&store, DocumentId(1)).unwrap();
        assert_eq!(blocks, "<!-- wp:paragraph -->\n<p>Hi</p>\n<!-- /wp:paragraph -->");

        let doc = store.document(DocumentId(1)).unwrap();
        assert_eq!(doc.original_content.as_deref(), Some("<p>Hi</p>"));
        assert!(doc.is_converted());
    }

    #[test]
    fn reconversion_starts_from_the_original() {
        let store = MemoryStore::with_documents([(DocumentId(2), "<p>x</p>")]);
        let engine = ConversionEngine::new(PatchChain::new(), Identity);

        engine.convert(&store, DocumentId(2)).unwrap();
        store.set_live_content(DocumentId(2), "edited by hand").unwrap();
        engine.convert(&store, DocumentId(2)).unwrap();

        let doc = store.document(DocumentId(2)).unwrap();
        assert_eq!(doc.original_content.as_deref(), Some("<p>x</p>"));
        assert_eq!(doc.live_content, "<p>x</p>");
    }

    #[test]
    fn unknown_document_is_a_storage_error() {
        let engine = ConversionEngine::new(PatchChain::new(), Identity);
        let err = engine.convert(&MemoryStore::new(), DocumentId(9)).unwrap_err();
        assert_eq!(err.document_id(), DocumentId(9));
        assert_eq!(err.phase(), None);
    }

    #[test]
    fn conversion_step_failure_leaves_live_field_alone() {
        let store = MemoryStore::with_documents([(DocumentId(4), "<p>keep</p>")]);
        let engine = ConversionEngine::new(PatchChain::new(), Refuse);

        let err = engine.convert(&store, DocumentId(4)).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Conversion));
        assert_eq!(store.live_content(DocumentId(4)).unwrap(), "<p>keep</p>");
        let snapshot = store.snapshot(DocumentId(4)).unwrap().unwrap();
        assert_eq!(snapshot.pre_conversion_content, "<p>keep</p>");
        assert_eq!(snapshot.post_conversion_content, None);
    }

    #[test]
    fn batch_isolates_failures() {
        let store = MemoryStore::with_documents([
            (DocumentId(5), "<p>[gallery ids=1</p>"),
            (DocumentId(6), "<p>fine</p>"),
        ]);
        let chain = PatcherRegistry::with_defaults().default_chain().unwrap();
        let engine = ConversionEngine::new(chain, HtmlBlockConverter::default());

        let report = engine.convert_batch(&store, &[DocumentId(5), DocumentId(6)]);
        assert_eq!(report.converted, vec![DocumentId(6)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].document_id(), DocumentId(5));
        assert_eq!(report.failed[0].phase(), Some(Phase::Pre));
        assert!(!report.is_clean());
        assert_eq!(store.live_content(DocumentId(5)).unwrap(), "<p>[gallery ids=1</p>");
    }
}
