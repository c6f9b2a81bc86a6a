//! Patch chain executor
//!
//! A [`PatchChain`] is the immutable, ordered list of pre- and post-conversion
//! patchers, with the block codec fixed at both ends:
//!
//!     encode → pre patchers → (conversion step) → post patchers → decode
//!
//! The order is a correctness requirement. Pre patchers must only ever see
//! encoded content, and decode must run after every post patcher so no patcher
//! touches a protected fragment.

use crate::codec::{self, EncodedBlocks};
use crate::document::DocumentId;
use crate::error::{ChainError, ConvertError, PatchError, Phase};
use crate::patcher::{PatchContext, Patcher};
use std::sync::Arc;

/// Ordered pre- and post-conversion patchers
#[derive(Clone, Default)]
pub struct PatchChain {
    pre: Vec<Arc<dyn Patcher>>,
    post: Vec<Arc<dyn Patcher>>,
}

impl PatchChain {
    /// A chain with only the codec steps
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PatchChainBuilder {
        PatchChainBuilder::default()
    }

    /// Names of the pre patchers, in execution order
    pub fn pre_names(&self) -> Vec<&str> {
        self.pre.iter().map(|p| p.name()).collect()
    }

    /// Names of the post patchers, in execution order
    pub fn post_names(&self) -> Vec<&str> {
        self.post.iter().map(|p| p.name()).collect()
    }

    /// Start running the chain for one document
    pub fn begin(&self, document_id: DocumentId) -> ChainRun<'_> {
        ChainRun {
            chain: self,
            document_id,
            encoded: EncodedBlocks::default(),
            converted_from: String::new(),
        }
    }
}

/// Assembles a [`PatchChain`], checking every patcher against its phase
#[derive(Default)]
pub struct PatchChainBuilder {
    pre: Vec<Arc<dyn Patcher>>,
    post: Vec<Arc<dyn Patcher>>,
}

impl PatchChainBuilder {
    /// Append a pre-conversion patcher
    pub fn pre(mut self, patcher: Arc<dyn Patcher>) -> Result<Self, ChainError> {
        if !patcher.supports_pre() {
            return Err(ChainError::UnsupportedPhase {
                patcher: patcher.name().to_string(),
                phase: Phase::Pre,
            });
        }
        self.pre.push(patcher);
        Ok(self)
    }

    /// Append a post-conversion patcher
    pub fn post(mut self, patcher: Arc<dyn Patcher>) -> Result<Self, ChainError> {
        if !patcher.supports_post() {
            return Err(ChainError::UnsupportedPhase {
                patcher: patcher.name().to_string(),
                phase: Phase::Post,
            });
        }
        self.post.push(patcher);
        Ok(self)
    }

    pub fn build(self) -> PatchChain {
        PatchChain {
            pre: self.pre,
            post: self.post,
        }
    }
}

/// One document's pass through a chain.
///
/// Owns the codec's placeholder map, so nothing encoded for this document can
/// leak into another. [`ChainRun::run_post`] consumes the run.
pub struct ChainRun<'a> {
    chain: &'a PatchChain,
    document_id: DocumentId,
    encoded: EncodedBlocks,
    converted_from: String,
}

impl ChainRun<'_> {
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// Encode, then apply every pre patcher in order.
    ///
    /// On failure the remaining patchers are skipped and no partial output is
    /// returned.
    pub fn run_pre(&mut self, content: &str) -> Result<String, ConvertError> {
        let (mut html, encoded) = codec::encode(content, self.document_id)?;
        let ctx = PatchContext::new(self.document_id, content);

        for (position, patcher) in self.chain.pre.iter().enumerate() {
            log::debug!(
                "document {}: pre patcher #{position} '{}'",
                self.document_id,
                patcher.name()
            );
            html = patcher
                .patch_html_source(&html, &ctx)
                .map_err(|fault| PatchError {
                    patcher: patcher.name().to_string(),
                    position,
                    phase: Phase::Pre,
                    document_id: self.document_id,
                    reason: fault.0,
                })?;
        }

        self.encoded = encoded;
        self.converted_from = html.clone();
        Ok(html)
    }

    /// Apply every post patcher in order, then decode.
    pub fn run_post(self, blocks: &str) -> Result<String, ConvertError> {
        let ctx = PatchContext::new(self.document_id, &self.converted_from);
        let mut blocks = blocks.to_string();

        for (position, patcher) in self.chain.post.iter().enumerate() {
            log::debug!(
                "document {}: post patcher #{position} '{}'",
                self.document_id,
                patcher.name()
            );
            blocks = patcher
                .patch_blocks_contents(&blocks, &ctx)
                .map_err(|fault| PatchError {
                    patcher: patcher.name().to_string(),
                    position,
                    phase: Phase::Post,
                    document_id: self.document_id,
                    reason: fault.0,
                })?;
        }

        Ok(codec::decode(&blocks, self.encoded, self.document_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchFault;

    struct Upper;
    impl Patcher for Upper {
        fn name(&self) -> &str {
            "upper"
        }
        fn supports_pre(&self) -> bool {
            true
        }
        fn patch_html_source(&self, html: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
            Ok(html.to_uppercase())
        }
    }

    struct Suffix(&'static str);
    impl Patcher for Suffix {
        fn name(&self) -> &str {
            self.0
        }
        fn supports_post(&self) -> bool {
            true
        }
        fn patch_blocks_contents(
            &self,
            blocks: &str,
            _ctx: &PatchContext,
        ) -> Result<String, PatchFault> {
            Ok(format!("{blocks}{}", self.0))
        }
    }

    struct Failing;
    impl Patcher for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn supports_post(&self) -> bool {
            true
        }
        fn patch_blocks_contents(
            &self,
            _blocks: &str,
            _ctx: &PatchContext,
        ) -> Result<String, PatchFault> {
            Err(PatchFault::new("nope"))
        }
    }

    #[test]
    fn builder_rejects_patcher_in_unsupported_phase() {
        let err = PatchChain::builder().post(Arc::new(Upper)).err().unwrap();
        assert_eq!(
            err,
            ChainError::UnsupportedPhase {
                patcher: "upper".to_string(),
                phase: Phase::Post
            }
        );
    }

    #[test]
    fn codec_only_chain_is_identity() {
        let chain = PatchChain::new();
        let mut run = chain.begin(DocumentId(1));
        let html = run.run_pre("<p>a</p><!-- wp:separator /-->").unwrap();
        assert_eq!(html, "<p>a</p><!-- blockshift:encoded-block 0 -->");
        let out = run.run_post(&html).unwrap();
        assert_eq!(out, "<p>a</p><!-- wp:separator /-->");
    }

    #[test]
    fn pre_patchers_only_see_placeholders() {
        let chain = PatchChain::builder()
            .pre(Arc::new(Upper))
            .unwrap()
            .build();
        let mut run = chain.begin(DocumentId(1));
        let html = run.run_pre("<p>a</p><!-- wp:separator /-->").unwrap();
        assert_eq!(html, "<P>A</P><!-- BLOCKSHIFT:ENCODED-BLOCK 0 -->");

        // The mangled token no longer matches, so decode refuses to drop the fragment.
        let err = run.run_post(&html).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Decode));
    }

    #[test]
    fn post_patchers_run_in_declared_order() {
        let chain = PatchChain::builder()
            .post(Arc::new(Suffix("-a")))
            .unwrap()
            .post(Arc::new(Suffix("-b")))
            .unwrap()
            .build();
        assert_eq!(chain.post_names(), vec!["-a", "-b"]);
        let mut run = chain.begin(DocumentId(1));
        let html = run.run_pre("x").unwrap();
        assert_eq!(run.run_post(&html).unwrap(), "x-a-b");
    }

    #[test]
    fn failure_reports_patcher_identity() {
        let chain = PatchChain::builder()
            .post(Arc::new(Suffix("-a")))
            .unwrap()
            .post(Arc::new(Failing))
            .unwrap()
            .build();
        let mut run = chain.begin(DocumentId(9));
        let html = run.run_pre("x").unwrap();
        match run.run_post(&html).unwrap_err() {
            ConvertError::Patch(err) => {
                assert_eq!(err.patcher, "failing");
                assert_eq!(err.position, 1);
                assert_eq!(err.phase, Phase::Post);
                assert_eq!(err.document_id, DocumentId(9));
            }
            other => panic!("Expected patch error, got {other:?}"),
        }
    }
}
