//! Patcher trait definition
//!
//! A patcher is a single-responsibility transform over one document's content.
//! It can take part in the pre-conversion phase (raw HTML and shortcodes), the
//! post-conversion phase (block markup produced by the conversion step), or both.

use crate::document::DocumentId;
use crate::error::PatchFault;

/// Per-document inputs handed to every patcher invocation.
///
/// `source_html` is the raw original content during the pre phase, and the
/// HTML that was handed to the conversion step during the post phase. Post
/// patchers use it to recover what the conversion step dropped.
#[derive(Debug, Clone, Copy)]
pub struct PatchContext<'a> {
    pub document_id: DocumentId,
    pub source_html: &'a str,
}

impl<'a> PatchContext<'a> {
    pub fn new(document_id: DocumentId, source_html: &'a str) -> Self {
        Self {
            document_id,
            source_html,
        }
    }
}

/// Trait for content patchers
///
/// Implementors must be pure with respect to the document: no I/O, no state
/// carried from one document to the next.
///
/// # Examples
///
/// ```ignore
/// struct Trim;
///
/// impl Patcher for Trim {
///     fn name(&self) -> &str {
///         "trim"
///     }
///
///     fn supports_pre(&self) -> bool {
///         true
///     }
///
///     fn patch_html_source(&self, html: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
///         Ok(html.trim().to_string())
///     }
/// }
/// ```
pub trait Patcher: Send + Sync {
    /// The name of this patcher, used in configuration and error reports
    fn name(&self) -> &str;

    /// Optional description of this patcher
    fn description(&self) -> &str {
        ""
    }

    /// Whether this patcher runs on raw HTML before conversion
    fn supports_pre(&self) -> bool {
        false
    }

    /// Whether this patcher runs on block markup after conversion
    fn supports_post(&self) -> bool {
        false
    }

    /// Transform raw HTML before the conversion step
    ///
    /// Default implementation returns a fault.
    /// Patchers that support the pre phase should override this method.
    fn patch_html_source(&self, _html: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
        Err(PatchFault(format!(
            "Patcher '{}' does not patch HTML sources",
            self.name()
        )))
    }

    /// Transform block markup after the conversion step
    ///
    /// Default implementation returns a fault.
    /// Patchers that support the post phase should override this method.
    fn patch_blocks_contents(
        &self,
        _blocks: &str,
        _ctx: &PatchContext,
    ) -> Result<String, PatchFault> {
        Err(PatchFault(format!(
            "Patcher '{}' does not patch block contents",
            self.name()
        )))
    }
}
