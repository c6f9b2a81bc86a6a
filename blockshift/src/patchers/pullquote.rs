//! `[pullquote]` shortcode blocks to pullquote blocks

use crate::blocks::{block, escape_text, rewrite_shortcode_blocks};
use crate::error::PatchFault;
use crate::html::decode_entities;
use crate::patcher::{PatchContext, Patcher};
use crate::shortcode::ShortcodeSet;

#[derive(Debug, Clone)]
pub struct PullquotePatcher {
    shortcodes: ShortcodeSet,
}

impl Default for PullquotePatcher {
    fn default() -> Self {
        Self {
            shortcodes: ShortcodeSet::new(["pullquote"]),
        }
    }
}

impl Patcher for PullquotePatcher {
    fn name(&self) -> &str {
        "pullquote"
    }

    fn description(&self) -> &str {
        "Turns enclosing [pullquote] shortcode blocks into pullquote blocks"
    }

    fn supports_post(&self) -> bool {
        true
    }

    fn patch_blocks_contents(&self, blocks: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
        rewrite_shortcode_blocks(blocks, |inner| {
            let found = self
                .shortcodes
                .parse(inner)
                .map_err(|e| PatchFault::new(e.to_string()))?;
            let [quote] = found.as_slice() else {
                return Ok(None);
            };
            if quote.span != (0..inner.len()) {
                return Ok(None);
            }
            let Some(text) = quote.content.as_deref().map(str::trim).filter(|t| !t.is_empty())
            else {
                return Ok(None);
            };

            let cite = quote
                .attr("cite")
                .map(decode_entities)
                .filter(|c| !c.trim().is_empty())
                .map(|c| format!("<cite>{}</cite>", escape_text(c.trim())))
                .unwrap_or_default();
            let body = if text.starts_with("<p>") || text.starts_with("<p ") {
                text.to_string()
            } else {
                format!("<p>{text}</p>")
            };
            Ok(Some(block(
                "pullquote",
                None,
                &format!(
                    "<figure class=\"wp-block-pullquote\"><blockquote>{body}{cite}</blockquote></figure>"
                ),
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;

    fn patch(blocks: &str) -> Result<String, PatchFault> {
        PullquotePatcher::default().patch_blocks_contents(blocks, &PatchContext::new(DocumentId(3), ""))
    }

    #[test]
    fn enclosing_pullquote_becomes_block() {
        let blocks = block("shortcode", None, "[pullquote cite=\"Ann Lee\"]Big <em>idea</em>[/pullquote]");
        assert_eq!(
            patch(&blocks).unwrap(),
            "<!-- wp:pullquote -->\n<figure class=\"wp-block-pullquote\"><blockquote><p>Big <em>idea</em></p><cite>Ann Lee</cite></blockquote></figure>\n<!-- /wp:pullquote -->"
        );
    }

    #[test]
    fn cite_is_escaped_once() {
        let blocks = block("shortcode", None, "[pullquote cite=\"<b>\"]Q[/pullquote]");
        assert!(patch(&blocks).unwrap().contains("<p>Q</p><cite>&lt;b&gt;</cite>"));

        let blocks = block("shortcode", None, "[pullquote cite=\"A &amp; B\"]Q[/pullquote]");
        assert!(patch(&blocks).unwrap().contains("<cite>A &amp; B</cite>"));
    }

    #[test]
    fn paragraphs_inside_the_quote_are_not_wrapped_again() {
        let blocks = block("shortcode", None, "[pullquote]<p>One</p><p>Two</p>[/pullquote]");
        assert_eq!(
            patch(&blocks).unwrap(),
            "<!-- wp:pullquote -->\n<figure class=\"wp-block-pullquote\"><blockquote><p>One</p><p>Two</p></blockquote></figure>\n<!-- /wp:pullquote -->"
        );
    }

    #[test]
    fn pullquote_without_content_is_kept() {
        let blocks = block("shortcode", None, "[pullquote /]");
        assert_eq!(patch(&blocks).unwrap(), blocks);
    }

    #[test]
    fn unclosed_pullquote_is_kept() {
        let blocks = block("shortcode", None, "[pullquote]");
        assert_eq!(patch(&blocks).unwrap(), blocks);
    }
}
