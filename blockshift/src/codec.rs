//! Block codec
//!
//! Content may already contain block markup, either from an earlier conversion
//! or from an editor that mixed blocks into freeform HTML. String-based patchers
//! and the conversion step would mangle it, so [`encode`] swaps every outermost
//! block region for an opaque placeholder comment and [`decode`] puts the exact
//! bytes back once every other stage has run.
//!
//! A region is either a balanced `<!-- wp:name -->` ... `<!-- /wp:name -->` pair
//! or a void `<!-- wp:name /-->` delimiter. Unbalanced delimiters stay in place
//! as raw text.

use crate::document::DocumentId;
use crate::error::CodecError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

const PLACEHOLDER_PREFIX: &str = "blockshift:encoded-block";

static BLOCK_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<!--\s+(?P<closer>/)?wp:(?P<name>[a-z][a-z0-9_-]*(?:/[a-z][a-z0-9_-]*)?)\s+(?:\{[^>]*?\}\s+)?(?P<void>/)?-->",
    )
    .expect("block delimiter pattern is valid")
});

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--\s*blockshift:encoded-block\b(?P<rest>.*?)-->")
        .expect("placeholder pattern is valid")
});

/// Fragments hidden by [`encode`], indexed by placeholder number.
///
/// Owned by a single chain run; dropped once [`decode`] consumes it.
#[derive(Debug, Default)]
pub struct EncodedBlocks {
    fragments: Vec<String>,
}

impl EncodedBlocks {
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragment(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(String::as_str)
    }
}

/// Placeholder token standing in for the `index`-th encoded region
pub fn placeholder(index: usize) -> String {
    format!("<!-- {PLACEHOLDER_PREFIX} {index} -->")
}

/// Replace every outermost block region with a placeholder
pub fn encode(
    content: &str,
    document_id: DocumentId,
) -> Result<(String, EncodedBlocks), CodecError> {
    if let Some(existing) = PLACEHOLDER.find(content) {
        return Err(CodecError::Collision {
            document_id,
            token: existing.as_str().to_string(),
        });
    }

    let mut encoded = String::with_capacity(content.len());
    let mut fragments = Vec::new();
    let mut cursor = 0;

    for region in block_regions(content) {
        encoded.push_str(&content[cursor..region.start]);
        encoded.push_str(&placeholder(fragments.len()));
        fragments.push(content[region.clone()].to_string());
        cursor = region.end;
    }
    encoded.push_str(&content[cursor..]);

    Ok((encoded, EncodedBlocks { fragments }))
}

/// Put every encoded fragment back in place of its placeholder
///
/// Every recorded placeholder must appear exactly once. Anything else means a
/// stage in between corrupted the content and the document must not be saved.
pub fn decode(
    content: &str,
    blocks: EncodedBlocks,
    document_id: DocumentId,
) -> Result<String, CodecError> {
    let mut seen = vec![false; blocks.len()];
    let mut decoded = String::with_capacity(content.len());
    let mut cursor = 0;

    for caps in PLACEHOLDER.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let token = whole.as_str();
        let index = caps
            .name("rest")
            .and_then(|rest| rest.as_str().trim().parse::<usize>().ok())
            .filter(|index| *index < blocks.len());
        let Some(index) = index else {
            return Err(CodecError::UnknownPlaceholder {
                document_id,
                token: token.to_string(),
            });
        };
        if seen[index] {
            return Err(CodecError::DuplicatePlaceholder {
                document_id,
                token: token.to_string(),
            });
        }
        seen[index] = true;

        decoded.push_str(&content[cursor..whole.start()]);
        decoded.push_str(&blocks.fragments[index]);
        cursor = whole.end();
    }
    decoded.push_str(&content[cursor..]);

    if let Some(missing) = seen.iter().position(|found| !found) {
        return Err(CodecError::DroppedPlaceholder {
            document_id,
            token: placeholder(missing),
        });
    }

    Ok(decoded)
}

/// Byte ranges of the outermost balanced block regions, in document order
fn block_regions(content: &str) -> Vec<Range<usize>> {
    let mut closed: Vec<Range<usize>> = Vec::new();
    let mut open: Vec<(&str, usize)> = Vec::new();

    for caps in BLOCK_DELIMITER.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = caps.name("name").map_or("", |m| m.as_str());
        let is_closer = caps.name("closer").is_some();
        let is_void = caps.name("void").is_some();

        if is_closer {
            // A closer pairs with the nearest opener of the same name; openers
            // in between were never closed and lose their claim.
            if let Some(pos) = open.iter().rposition(|(open_name, _)| *open_name == name) {
                let start = open[pos].1;
                open.truncate(pos);
                closed.push(start..whole.end());
            }
        } else if is_void {
            closed.push(whole.start()..whole.end());
        } else {
            open.push((name, whole.start()));
        }
    }

    // Balanced regions nest or are disjoint; keep the outermost ones only.
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
