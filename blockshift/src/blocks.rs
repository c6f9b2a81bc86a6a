//! Block markup helpers shared by the converter and the post patchers

use crate::error::PatchFault;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SHORTCODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!-- wp:shortcode -->\n(?P<inner>.*?)\n<!-- /wp:shortcode -->")
        .expect("shortcode block pattern is valid")
});

/// Serialize one block: delimiters on their own lines around `inner`.
pub fn block(name: &str, attrs: Option<&Value>, inner: &str) -> String {
    match attrs {
        Some(attrs) => {
            let attrs = serialize_attrs(attrs);
            format!("<!-- wp:{name} {attrs} -->\n{inner}\n<!-- /wp:{name} -->")
        }
        None => format!("<!-- wp:{name} -->\n{inner}\n<!-- /wp:{name} -->"),
    }
}

/// Serialize a block with no inner content: `<!-- wp:name {attrs} /-->`
pub fn void_block(name: &str, attrs: Option<&Value>) -> String {
    match attrs {
        Some(attrs) => format!("<!-- wp:{name} {} /-->", serialize_attrs(attrs)),
        None => format!("<!-- wp:{name} /-->"),
    }
}

/// Block attributes as JSON that cannot end the delimiter comment early.
///
/// These characters only occur inside JSON strings, where the `\u` escapes
/// decode to the same text.
pub fn serialize_attrs(attrs: &Value) -> String {
    attrs
        .to_string()
        .replace("--", "\\u002d\\u002d")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Rewrite `shortcode` blocks.
///
/// `rewrite` gets the inner shortcode text and returns the replacement block,
/// or `None` to keep the block as it is.
pub fn rewrite_shortcode_blocks<F>(blocks: &str, mut rewrite: F) -> Result<String, PatchFault>
where
    F: FnMut(&str) -> Result<Option<String>, PatchFault>,
{
    let mut out = String::with_capacity(blocks.len());
    let mut cursor = 0;

    for caps in SHORTCODE_BLOCK.captures_iter(blocks) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.name("inner")) else {
            continue;
        };
        if let Some(replacement) = rewrite(inner.as_str())? {
            out.push_str(&blocks[cursor..whole.start()]);
            out.push_str(&replacement);
            cursor = whole.end();
        }
    }
    out.push_str(&blocks[cursor..]);

    Ok(out)
}

/// Escape a value for a double-quoted HTML attribute
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text placed between tags
pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
