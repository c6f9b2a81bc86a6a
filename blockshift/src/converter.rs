//! HTML-to-block conversion step
//!
//! The conversion step sits between the pre and post phases of the chain and
//! is deliberately outside the chain itself: the engine only needs something
//! implementing [`BlockConverter`]. [`HtmlBlockConverter`] is the built-in
//! implementation.
//!
//! # Library Choice
//!
//! Parsing goes through `html5ever` into a `markup5ever_rcdom` tree, and
//! fragments are written back with html5ever's serializer, so malformed legacy
//! markup is repaired the same way a browser would repair it.
//!
//! # Element Mapping
//!
//! | Top-level node              | Block           | Notes                                   |
//! |-----------------------------|-----------------|-----------------------------------------|
//! | `<p>`                       | `paragraph`     | Attributes dropped                      |
//! | `<p>` holding only an image | `image`         | As `<img>`                              |
//! | `<h1>`-`<h6>`               | `heading`       | `{"level":N}` unless N is 2             |
//! | `<ul>` / `<ol>`             | `list`          | `{"ordered":true}` for `<ol>`           |
//! | `<blockquote>`              | `quote`         | Attributes dropped                      |
//! | `<img>` alone in a run      | `image`         | Only `src` and `alt` are kept           |
//! | `<figure>` with an image    | `image`         | Kept as is                              |
//! | `<pre>`                     | `preformatted`  |                                         |
//! | `<hr>`                      | `separator`     |                                         |
//! | `<table>`                   | `table`         | Wrapped in a figure                     |
//! | comment                     | -               | Passed through, carries codec tokens    |
//! | text and inline elements    | `paragraph`     |                                         |
//! | recognised shortcode        | `shortcode`     | Every node up to its closing tag        |
//! | anything else               | `html`          | Kept as is                              |
//!
//! A shortcode counts when both its tags sit in top-level text, so
//! `[caption]<img src=a.png> A cat[/caption]` stays one block for the post
//! patchers. The attributes dropped here are what the `img`, `paragraph` and
//! `blockquote` post patchers put back.

use crate::blocks::{block, escape_attr};
use crate::error::ConversionStepError;
use crate::html::{
    attribute, find_element, serialize_children, serialize_whole, tag_name, HtmlFragment,
};
use crate::shortcode::ShortcodeSet;
use markup5ever_rcdom::{Handle, NodeData};
use serde_json::json;
use std::ops::Range;

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "font", "i",
    "img", "ins", "kbd", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub",
    "sup", "time", "u", "var", "wbr",
];

/// The HTML-to-block step the engine delegates to.
///
/// Implementations must be pure and deterministic for the same input.
pub trait BlockConverter: Send + Sync {
    fn convert_to_blocks(&self, html: &str) -> Result<String, ConversionStepError>;
}

/// Built-in converter mapping top-level HTML nodes to blocks
#[derive(Debug, Clone, Default)]
pub struct HtmlBlockConverter {
    shortcodes: ShortcodeSet,
}

impl HtmlBlockConverter {
    /// Create a converter that gathers each of `shortcodes`, body included,
    /// into a shortcode block
    pub fn new(shortcodes: ShortcodeSet) -> Self {
        Self { shortcodes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKind {
    Text,
    Inline,
    Block,
    Comment,
}

/// A top-level node and where its serialized form sits in the joined body
struct Piece {
    kind: PieceKind,
    node: Handle,
    range: Range<usize>,
}

/// Text and inline elements waiting to become one paragraph
#[derive(Default)]
struct InlineRun {
    html: String,
    image: Option<Handle>,
    other_content: bool,
}

impl InlineRun {
    fn push_text(&mut self, html: &str) {
        if !html.trim().is_empty() {
            self.other_content = true;
        }
        self.html.push_str(html);
    }

    fn push_element(&mut self, node: &Handle, html: &str) {
        if tag_name(node).as_deref() == Some("img") && self.image.is_none() {
            self.image = Some(node.clone());
        } else {
            self.other_content = true;
        }
        self.html.push_str(html);
    }
}

impl BlockConverter for HtmlBlockConverter {
    fn convert_to_blocks(&self, html: &str) -> Result<String, ConversionStepError> {
        let fragment = HtmlFragment::parse(html)
            .ok_or_else(|| ConversionStepError::new("parsed document has no body"))?;

        let mut joined = String::with_capacity(html.len());
        let mut pieces = Vec::new();
        for child in fragment.body().children.borrow().iter() {
            let kind = match &child.data {
                NodeData::Text { .. } => PieceKind::Text,
                NodeData::Comment { .. } => PieceKind::Comment,
                NodeData::Element { name, .. } if INLINE_ELEMENTS.contains(&&*name.local) => {
                    PieceKind::Inline
                }
                NodeData::Element { .. } => PieceKind::Block,
                _ => continue,
            };
            let start = joined.len();
            joined.push_str(&serialize_whole(child)?);
            pieces.push(Piece {
                kind,
                node: child.clone(),
                range: start..joined.len(),
            });
        }

        let spans = self.shortcode_spans(&joined, &pieces);
        let mut spans = spans.into_iter().peekable();
        let mut gathering: Option<Range<usize>> = None;
        let mut blocks = Vec::new();
        let mut run = InlineRun::default();

        for piece in &pieces {
            let mut cursor = piece.range.start;
            loop {
                if let Some(span) = &gathering {
                    if span.end > piece.range.end {
                        break;
                    }
                    blocks.push(block("shortcode", None, &joined[span.clone()]));
                    cursor = span.end;
                    gathering = None;
                    continue;
                }
                match spans.peek() {
                    Some(span) if span.start < piece.range.end => {
                        run.push_text(&joined[cursor..span.start]);
                        flush_inline(&mut run, &mut blocks)?;
                        gathering = spans.next();
                    }
                    _ => {
                        if cursor == piece.range.start {
                            place(piece, &joined, &mut run, &mut blocks)?;
                        } else {
                            run.push_text(&joined[cursor..piece.range.end]);
                        }
                        break;
                    }
                }
            }
        }
        flush_inline(&mut run, &mut blocks)?;

        Ok(blocks.join("\n\n"))
    }
}

impl HtmlBlockConverter {
    /// Byte ranges of the recognised shortcodes in `joined` that open and
    /// close in top-level text. Markup between the two tags belongs to the
    /// shortcode.
    fn shortcode_spans(&self, joined: &str, pieces: &[Piece]) -> Vec<Range<usize>> {
        let found = match self.shortcodes.parse(joined) {
            Ok(found) => found,
            Err(err) => {
                log::debug!("converter: shortcodes left inline ({err})");
                return Vec::new();
            }
        };
        let in_text = |offset: usize| {
            pieces
                .iter()
                .any(|piece| piece.kind == PieceKind::Text && piece.range.contains(&offset))
        };
        found
            .into_iter()
            .map(|shortcode| shortcode.span)
            .filter(|span| in_text(span.start) && in_text(span.end - 1))
            .collect()
    }

}

fn place(
    piece: &Piece,
    joined: &str,
    run: &mut InlineRun,
    blocks: &mut Vec<String>,
) -> Result<(), ConversionStepError> {
    let html = &joined[piece.range.clone()];
    match piece.kind {
        PieceKind::Text => run.push_text(html),
        PieceKind::Inline => run.push_element(&piece.node, html),
        PieceKind::Comment => {
            flush_inline(run, blocks)?;
            blocks.push(html.to_string());
        }
        PieceKind::Block => {
            flush_inline(run, blocks)?;
            let tag = tag_name(&piece.node).unwrap_or_default();
            blocks.push(element_block(&tag, &piece.node)?);
        }
    }
    Ok(())
}

fn flush_inline(run: &mut InlineRun, blocks: &mut Vec<String>) -> Result<(), ConversionStepError> {
    let run = std::mem::take(run);
    let text = run.html.trim();
    if text.is_empty() {
        return Ok(());
    }
    match (&run.image, run.other_content) {
        (Some(img), false) => blocks.push(image_block(img)),
        _ => blocks.push(block("paragraph", None, &format!("<p>{text}</p>"))),
    }
    Ok(())
}

fn element_block(tag: &str, node: &Handle) -> Result<String, ConversionStepError> {
    let converted = match tag {
        "p" => match sole_image(node) {
            Some(img) => image_block(&img),
            None => block(
                "paragraph",
                None,
                &format!("<p>{}</p>", serialize_children(node)?),
            ),
        },
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: u8 = tag[1..].parse().unwrap_or(2);
            let inner = format!("<{tag}>{}</{tag}>", serialize_children(node)?);
            if level == 2 {
                block("heading", None, &inner)
            } else {
                block("heading", Some(&json!({ "level": level })), &inner)
            }
        }
        "ul" => block("list", None, &serialize_whole(node)?),
        "ol" => block(
            "list",
            Some(&json!({ "ordered": true })),
            &serialize_whole(node)?,
        ),
        "blockquote" => block(
            "quote",
            None,
            &format!(
                "<blockquote class=\"wp-block-quote\">{}</blockquote>",
                serialize_children(node)?
            ),
        ),
        "figure" => {
            let html = serialize_whole(node)?;
            if find_element(node, "img").is_some() {
                block("image", None, &html)
            } else {
                block("html", None, &html)
            }
        }
        "pre" => block("preformatted", None, &serialize_whole(node)?),
        "hr" => block("separator", None, "<hr class=\"wp-block-separator\"/>"),
        "table" => block(
            "table",
            None,
            &format!(
                "<figure class=\"wp-block-table\">{}</figure>",
                serialize_whole(node)?
            ),
        ),
        _ => block("html", None, &serialize_whole(node)?),
    };
    Ok(converted)
}

fn image_block(node: &Handle) -> String {
    let mut img = String::from("<img");
    for key in ["src", "alt"] {
        if let Some(value) = attribute(node, key) {
            img.push_str(&format!(" {key}=\"{}\"", escape_attr(&value)));
        }
    }
    img.push_str("/>");
    block(
        "image",
        None,
        &format!("<figure class=\"wp-block-image\">{img}</figure>"),
    )
}

/// The `<img>` of a paragraph holding nothing else but whitespace
fn sole_image(node: &Handle) -> Option<Handle> {
    let mut image = None;
    for child in node.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } if contents.borrow().trim().is_empty() => {}
            NodeData::Element { name, .. } if &*name.local == "img" && image.is_none() => {
                image = Some(child.clone());
            }
            _ => return None,
        }
    }
    image
}
