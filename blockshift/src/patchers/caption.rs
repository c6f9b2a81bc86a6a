//! `[caption]` shortcode blocks around an image to image blocks
//!
//! The legacy editor stored captioned images as
//! `[caption id="attachment_12" align="alignleft"]<img ...> A cat[/caption]`.
//! The image keeps its markup, the trailing text becomes the `<figcaption>`
//! and the alignment and attachment id move to the block attributes.

use crate::blocks::{block, escape_text, rewrite_shortcode_blocks};
use crate::error::PatchFault;
use crate::html::decode_entities;
use crate::patcher::{PatchContext, Patcher};
use crate::shortcode::{Shortcode, ShortcodeSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static CAPTIONED_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?P<media>(?:<a\b[^>]*>\s*)?<img\b[^>]*>(?:\s*</a>)?)(?P<caption>.*)$")
        .expect("captioned image pattern is valid")
});

const ALIGNMENTS: &[&str] = &["left", "right", "center"];

#[derive(Debug, Clone)]
pub struct CaptionPatcher {
    shortcodes: ShortcodeSet,
}

impl Default for CaptionPatcher {
    fn default() -> Self {
        Self {
            shortcodes: ShortcodeSet::new(["caption", "wp_caption"]),
        }
    }
}

impl Patcher for CaptionPatcher {
    fn name(&self) -> &str {
        "caption"
    }

    fn description(&self) -> &str {
        "Turns [caption] shortcode blocks around an image into image blocks"
    }

    fn supports_post(&self) -> bool {
        true
    }

    fn patch_blocks_contents(&self, blocks: &str, ctx: &PatchContext) -> Result<String, PatchFault> {
        rewrite_shortcode_blocks(blocks, |inner| {
            let found = self
                .shortcodes
                .parse(inner)
                .map_err(|e| PatchFault::new(e.to_string()))?;
            let [caption] = found.as_slice() else {
                return Ok(None);
            };
            if caption.span != (0..inner.len()) {
                return Ok(None);
            }
            let replacement = image_block(caption);
            if replacement.is_none() {
                log::debug!(
                    "document {}: [{}] holds no leading image, kept as a shortcode block",
                    ctx.document_id,
                    caption.name
                );
            }
            Ok(replacement)
        })
    }
}

fn image_block(caption: &Shortcode) -> Option<String> {
    let content = caption.content.as_deref()?;
    let caps = CAPTIONED_IMAGE.captures(content)?;
    let media = caps.name("media")?.as_str();

    let text = caps.name("caption").map_or("", |m| m.as_str()).trim();
    let text = if text.is_empty() {
        caption
            .attr("caption")
            .map(|attr| escape_text(decode_entities(attr).trim()))
            .unwrap_or_default()
    } else {
        text.to_string()
    };

    let mut attrs = Map::new();
    let align = caption
        .attr("align")
        .map(|value| value.trim().trim_start_matches("align").to_ascii_lowercase())
        .filter(|value| ALIGNMENTS.contains(&value.as_str()));
    if let Some(align) = &align {
        attrs.insert("align".to_string(), Value::from(align.as_str()));
    }
    if let Some(id) = caption
        .attr("id")
        .and_then(|id| id.trim().strip_prefix("attachment_"))
        .and_then(|id| id.parse::<u64>().ok())
    {
        attrs.insert("id".to_string(), Value::from(id));
    }

    let class = match &align {
        Some(align) => format!("wp-block-image align{align}"),
        None => "wp-block-image".to_string(),
    };
    let figcaption = if text.is_empty() {
        String::new()
    } else {
        format!("<figcaption>{text}</figcaption>")
    };
    let attrs = (!attrs.is_empty()).then(|| Value::Object(attrs));

    Some(block(
        "image",
        attrs.as_ref(),
        &format!("<figure class=\"{class}\">{media}{figcaption}</figure>"),
    ))
}
