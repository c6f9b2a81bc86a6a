//! html5ever helpers shared by the converter and the patchers

use crate::error::ConversionStepError;
use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, serialize, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

/// A parsed fragment and the `<body>` holding it.
///
/// The dom is kept alongside the body: dropping an `RcDom` empties every node
/// of the tree, including handles still held elsewhere.
pub struct HtmlFragment {
    _dom: RcDom,
    body: Handle,
}

impl HtmlFragment {
    /// Parse `html` the way a browser parses the contents of `<body>`
    pub fn parse(html: &str) -> Option<Self> {
        let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(wrapped);
        let body = find_element(&dom.document, "body")?;
        Some(Self { _dom: dom, body })
    }

    pub fn body(&self) -> &Handle {
        &self.body
    }
}

/// Resolve character references (`&amp;`, `&#39;`, `&eacute;`, ...) in text
/// taken from serialized HTML.
///
/// The text is parsed as the contents of a `<textarea>`, where references are
/// decoded but markup is not, so the result matches what a browser displays.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // The parser drops one newline right after <textarea>.
    let source = format!("<textarea>\n{}</textarea>", text.replace("</", "&lt;/"));
    let Some(fragment) = HtmlFragment::parse(&source) else {
        return text.to_string();
    };
    let Some(area) = find_element(fragment.body(), "textarea") else {
        return text.to_string();
    };

    let mut decoded = String::with_capacity(text.len());
    for child in area.children.borrow().iter() {
        if let NodeData::Text { contents } = &child.data {
            decoded.push_str(&contents.borrow());
        }
    }
    decoded
}

/// Depth-first search for the first element named `tag`
pub fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if &*name.local == tag {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Local name of an element node
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn attribute(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == key)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

pub fn serialize_whole(node: &Handle) -> Result<String, ConversionStepError> {
    serialize_node(node, TraversalScope::IncludeNode)
}

pub fn serialize_children(node: &Handle) -> Result<String, ConversionStepError> {
    serialize_node(node, TraversalScope::ChildrenOnly(None))
}

fn serialize_node(node: &Handle, scope: TraversalScope) -> Result<String, ConversionStepError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    serialize(&mut output, &serializable, opts)
        .map_err(|e| ConversionStepError::new(format!("HTML serialization failed: {e}")))?;
    String::from_utf8(output)
        .map_err(|e| ConversionStepError::new(format!("UTF-8 conversion failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(
            decode_entities("https://x.test/?v=abc&amp;t=10"),
            "https://x.test/?v=abc&t=10"
        );
        assert_eq!(decode_entities("caf&eacute; &#39;n&#x27; tea"), "café 'n' tea");
    }

    #[test]
    fn markup_and_bare_ampersands_survive_decoding() {
        assert_eq!(decode_entities("<b>a & b</b> &lt;/i&gt;"), "<b>a & b</b> </i>");
        assert_eq!(decode_entities("\nleading"), "\nleading");
        assert_eq!(decode_entities("no references"), "no references");
    }

    #[test]
    fn fragment_keeps_its_tree_alive() {
        let fragment = HtmlFragment::parse("<p>one</p><p>two</p>").unwrap();
        assert_eq!(fragment.body().children.borrow().len(), 2);
        let second = fragment.body().children.borrow()[1].clone();
        assert_eq!(tag_name(&second).as_deref(), Some("p"));
        assert_eq!(serialize_children(&second).unwrap(), "two");
    }
}
