//! Lift block-level shortcodes out of paragraphs
//!
//! `<p>Intro [gallery ids=1,2]</p>` would otherwise convert into a single
//! paragraph block with the shortcode buried in its text. Each registered
//! shortcode is moved onto a line of its own, closing and reopening the
//! surrounding paragraph, so the conversion step emits a separate shortcode
//! block for it. A malformed shortcode fails the document.

use crate::error::PatchFault;
use crate::patcher::{PatchContext, Patcher};
use crate::shortcode::ShortcodeSet;
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/)?p(?:\s[^>]*)?>").expect("paragraph tag pattern is valid"));

static EMPTY_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p>\s*</p>").expect("empty paragraph pattern is valid"));

#[derive(Debug, Clone)]
pub struct ShortcodePreconversionPatcher {
    shortcodes: ShortcodeSet,
}

impl ShortcodePreconversionPatcher {
    pub fn new(shortcodes: ShortcodeSet) -> Self {
        Self { shortcodes }
    }
}

impl Patcher for ShortcodePreconversionPatcher {
    fn name(&self) -> &str {
        "shortcode-preconversion"
    }

    fn description(&self) -> &str {
        "Moves block-level shortcodes onto their own line"
    }

    fn supports_pre(&self) -> bool {
        true
    }

    fn patch_html_source(&self, html: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
        let found = self
            .shortcodes
            .parse(html)
            .map_err(|e| PatchFault::new(e.to_string()))?;
        if found.is_empty() {
            return Ok(html.to_string());
        }

        let mut out = String::with_capacity(html.len() + found.len() * 16);
        let mut cursor = 0;
        for shortcode in &found {
            let text = &html[shortcode.span.clone()];
            out.push_str(&html[cursor..shortcode.span.start]);
            if inside_paragraph(&html[..shortcode.span.start]) {
                out.push_str(&format!("</p>\n{text}\n<p>"));
            } else {
                out.push_str(&format!("\n{text}\n"));
            }
            cursor = shortcode.span.end;
        }
        out.push_str(&html[cursor..]);

        Ok(EMPTY_PARAGRAPH.replace_all(&out, "").into_owned())
    }
}

/// Whether the last paragraph tag in `prefix` is an opening one
fn inside_paragraph(prefix: &str) -> bool {
    PARAGRAPH_TAG
        .captures_iter(prefix)
        .last()
        .is_some_and(|caps| caps.get(1).is_none())
}
