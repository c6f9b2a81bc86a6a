//! Automatic paragraphs for freeform content
//!
//! Legacy content relies on the renderer to turn blank-line separated text into
//! paragraphs. The conversion step only sees markup, so loose chunks are wrapped
//! in `<p>` here and single newlines inside them become `<br />`.
//!
//! Closed block elements are taken out before splitting and kept byte for
//! byte, so blank lines inside `<pre>`, `<blockquote>` or a table never split
//! their body.

use crate::error::PatchFault;
use crate::patcher::{PatchContext, Patcher};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("blank line pattern is valid"));

static BLOCK_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:<(?:p|h[1-6]|ul|ol|li|dl|blockquote|figure|div|table|pre|hr|section|article|aside|header|footer|nav|form|address|iframe|video|audio|script|style)\b|<!--|\[)",
    )
    .expect("block start pattern is valid")
});

static CONTAINER_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<(?P<closer>/)?(?P<name>p|h[1-6]|ul|ol|dl|blockquote|figure|div|table|pre|section|article|aside|header|footer|nav|form|address|iframe|video|audio|script|style|textarea)\b[^>]*>",
    )
    .expect("container tag pattern is valid")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct AutoParagraphPatcher;

impl Patcher for AutoParagraphPatcher {
    fn name(&self) -> &str {
        "autop"
    }

    fn description(&self) -> &str {
        "Wraps loose text chunks in paragraphs"
    }

    fn supports_pre(&self) -> bool {
        true
    }

    fn patch_html_source(&self, html: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
        let normalized = html.replace("\r\n", "\n");
        if !BLANK_LINES.is_match(&normalized) && BLOCK_START.is_match(normalized.trim_start()) {
            return Ok(html.to_string());
        }

        let mut chunks = Vec::new();
        let mut cursor = 0;
        for region in closed_containers(&normalized) {
            wrap_loose(&normalized[cursor..region.start], &mut chunks);
            chunks.push(normalized[region.clone()].to_string());
            cursor = region.end;
        }
        wrap_loose(&normalized[cursor..], &mut chunks);

        Ok(chunks.join("\n\n"))
    }
}

/// Split text outside any container on blank lines and wrap what is not
/// already block markup
fn wrap_loose(text: &str, chunks: &mut Vec<String>) {
    for chunk in BLANK_LINES.split(text).map(str::trim) {
        if chunk.is_empty() {
            continue;
        }
        if BLOCK_START.is_match(chunk) {
            chunks.push(chunk.to_string());
        } else {
            chunks.push(format!("<p>{}</p>", chunk.replace('\n', "<br />\n")));
        }
    }
}

/// Outermost elements with both an opening and a matching closing tag
fn closed_containers(html: &str) -> Vec<Range<usize>> {
    let mut closed: Vec<Range<usize>> = Vec::new();
    let mut open: Vec<(String, usize)> = Vec::new();

    for caps in CONTAINER_TAG.captures_iter(html) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        if caps.name("closer").is_none() {
            open.push((name, whole.start()));
            continue;
        }
        if let Some(pos) = open.iter().rposition(|(open_name, _)| *open_name == name) {
            closed.push(open[pos].1..whole.end());
            open.truncate(pos);
        }
    }

    closed.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut outermost: Vec<Range<usize>> = Vec::new();
    for region in closed {
        match outermost.last() {
            Some(last) if region.start < last.end => {}
            _ => outermost.push(region),
        }
    }
    outermost
}
