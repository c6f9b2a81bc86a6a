//! Restore tag attributes lost in conversion
//!
//! The conversion step rebuilds some elements from scratch and keeps only the
//! attributes its block type knows about. This patcher walks the n-th tag of
//! its kind in the converted HTML and in the blocks side by side and copies
//! back the listed attributes that went missing. When the two sides disagree
//! on how many such tags exist, the pairing would be a guess, so the blocks
//! are returned unchanged.

use crate::blocks::escape_attr;
use crate::error::PatchFault;
use crate::patcher::{PatchContext, Patcher};
use once_cell::sync::Lazy;
use regex::Regex;

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<key>[A-Za-z_:][\w:.-]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"'=<>`]+))"#)
        .expect("html attribute pattern is valid")
});

#[derive(Debug, Clone)]
pub struct AttributeRestorePatcher {
    name: String,
    tag: Regex,
    attributes: Vec<String>,
}

impl AttributeRestorePatcher {
    pub fn new(name: &str, tag: &str, attributes: &[&str]) -> Self {
        let tag = Regex::new(&format!(r"(?i)<{}\b[^>]*>", regex::escape(tag)))
            .expect("escaped tag pattern is valid");
        Self {
            name: name.to_string(),
            tag,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Restores image sizing, styling and captions-related attributes
    pub fn img() -> Self {
        Self::new("img", "img", &["alt", "class", "height", "style", "title", "width"])
    }

    /// Restores paragraph styling and anchors
    pub fn paragraph() -> Self {
        Self::new("paragraph", "p", &["class", "dir", "id", "style"])
    }

    /// Restores blockquote citation and styling attributes
    pub fn blockquote() -> Self {
        Self::new("blockquote", "blockquote", &["cite", "class", "style"])
    }

    fn restore(&self, target: &str, source: &str) -> String {
        let present = attributes(target);
        let missing: Vec<(String, String)> = attributes(source)
            .into_iter()
            .filter(|(key, _)| self.attributes.iter().any(|a| a == key))
            .filter(|(key, _)| !present.iter().any(|(k, _)| k == key))
            .collect();
        if missing.is_empty() {
            return target.to_string();
        }

        let extra: String = missing
            .iter()
            .map(|(key, value)| format!(" {key}=\"{}\"", escape_attr(value)))
            .collect();
        let (head, tail) = match target.strip_suffix("/>") {
            Some(head) => (head.trim_end(), "/>"),
            None => (target.strip_suffix('>').unwrap_or(target), ">"),
        };
        format!("{head}{extra}{tail}")
    }
}

impl Patcher for AttributeRestorePatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Restores attributes dropped by the conversion step"
    }

    fn supports_post(&self) -> bool {
        true
    }

    fn patch_blocks_contents(&self, blocks: &str, ctx: &PatchContext) -> Result<String, PatchFault> {
        let sources: Vec<&str> = self.tag.find_iter(ctx.source_html).map(|m| m.as_str()).collect();
        let targets: Vec<_> = self.tag.find_iter(blocks).collect();

        if sources.len() != targets.len() {
            log::debug!(
                "document {}: {} source and {} converted <{}> tags, leaving attributes as converted",
                ctx.document_id,
                sources.len(),
                targets.len(),
                self.name
            );
            return Ok(blocks.to_string());
        }

        let mut out = String::with_capacity(blocks.len());
        let mut cursor = 0;
        for (target, source) in targets.iter().zip(sources) {
            out.push_str(&blocks[cursor..target.start()]);
            out.push_str(&self.restore(target.as_str(), source));
            cursor = target.end();
        }
        out.push_str(&blocks[cursor..]);

        Ok(out)
    }
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let key = caps.name("key")?.as_str().to_ascii_lowercase();
            let value = ["dq", "sq", "bare"]
                .iter()
                .find_map(|group| caps.name(group))
                .map_or("", |m| m.as_str());
            Some((key, value.to_string()))
        })
        .collect()
}
