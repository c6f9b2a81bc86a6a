//! Shortcode scanning
//!
//! Shortcodes are bracketed macros left behind by the legacy editor:
//! `[gallery ids="1,2"]`, `[video src=clip.mp4 /]` or enclosing ones like
//! `[pullquote]Quote[/pullquote]`. Only names registered in a [`ShortcodeSet`]
//! are recognised; other bracketed text is ordinary prose.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?P<closer>/)?(?P<name>[A-Za-z][\w-]*)(?P<attrs>[^\[\]]*)(?P<end>\])?")
        .expect("shortcode tag pattern is valid")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?P<k1>[\w-]+)\s*=\s*"(?P<v1>[^"]*)"|(?P<k2>[\w-]+)\s*=\s*'(?P<v2>[^']*)'|(?P<k3>[\w-]+)\s*=\s*(?P<v3>[^\s'"]+)|"(?P<p1>[^"]*)"|'(?P<p2>[^']*)'|(?P<p3>\S+)"#,
    )
    .expect("shortcode attribute pattern is valid")
});

/// One recognised shortcode occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub positional: Vec<String>,
    /// Text between the opening and closing tag, `None` when self-closing
    pub content: Option<String>,
    /// Byte range of the whole shortcode, closing tag included
    pub span: Range<usize>,
}

impl Shortcode {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcodeError {
    /// `[name ...` with no closing bracket
    Unterminated { name: String, offset: usize },
    /// `[/name]` with no opening tag before it
    UnbalancedClose { name: String, offset: usize },
}

impl fmt::Display for ShortcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcodeError::Unterminated { name, offset } => {
                write!(f, "unterminated [{name}] shortcode at byte {offset}")
            }
            ShortcodeError::UnbalancedClose { name, offset } => {
                write!(f, "closing [/{name}] without opening tag at byte {offset}")
            }
        }
    }
}

impl std::error::Error for ShortcodeError {}

/// Names of the shortcodes a scanner should recognise
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcodeSet {
    names: BTreeSet<String>,
}

impl ShortcodeSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Find every outermost recognised shortcode in `text`, in order.
    pub fn parse(&self, text: &str) -> Result<Vec<Shortcode>, ShortcodeError> {
        let mut found: Vec<Shortcode> = Vec::new();
        let mut pending: Vec<Shortcode> = Vec::new();
        let mut pending_ends: Vec<usize> = Vec::new();

        for caps in TAG.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            let name = name.as_str().to_ascii_lowercase();
            if !self.contains(&name) {
                continue;
            }
            // `[[name]]` is the escaped, literal form.
            if text[..whole.start()].ends_with('[') && text[whole.end()..].starts_with(']') {
                continue;
            }
            if caps.name("end").is_none() {
                return Err(ShortcodeError::Unterminated {
                    name,
                    offset: whole.start(),
                });
            }

            if caps.name("closer").is_some() {
                let Some(pos) = pending.iter().rposition(|open| open.name == name) else {
                    return Err(ShortcodeError::UnbalancedClose {
                        name,
                        offset: whole.start(),
                    });
                };
                // Openers after the matched one are part of its content.
                pending.truncate(pos + 1);
                pending_ends.truncate(pos + 1);
                let (Some(mut open), Some(open_end)) = (pending.pop(), pending_ends.pop()) else {
                    continue;
                };
                open.content = Some(text[open_end..whole.start()].to_string());
                open.span = open.span.start..whole.end();
                found.push(open);
                continue;
            }

            let raw_attrs = caps.name("attrs").map_or("", |m| m.as_str()).trim();
            let (raw_attrs, self_closing) = match raw_attrs.strip_suffix('/') {
                Some(stripped) => (stripped.trim_end(), true),
                None => (raw_attrs, false),
            };
            let (attrs, positional) = parse_attributes(raw_attrs);
            let shortcode = Shortcode {
                name,
                attrs,
                positional,
                content: None,
                span: whole.start()..whole.end(),
            };
            if self_closing {
                found.push(shortcode);
            } else {
                pending.push(shortcode);
                pending_ends.push(whole.end());
            }
        }

        found.extend(pending);
        found.sort_by(|a, b| a.span.start.cmp(&b.span.start).then(b.span.end.cmp(&a.span.end)));

        let mut outermost: Vec<Shortcode> = Vec::with_capacity(found.len());
        for shortcode in found {
            match outermost.last() {
                Some(last) if shortcode.span.start < last.span.end => {}
                _ => outermost.push(shortcode),
            }
        }
        Ok(outermost)
    }

    /// The single shortcode spanning all of `text`, if that is what it is.
    pub fn whole(&self, text: &str) -> Option<Shortcode> {
        let mut parsed = self.parse(text).ok()?;
        if parsed.len() != 1 || parsed[0].span != (0..text.len()) {
            return None;
        }
        parsed.pop()
    }
}

fn parse_attributes(raw: &str) -> (Vec<(String, String)>, Vec<String>) {
    let mut attrs = Vec::new();
    let mut positional = Vec::new();

    for caps in ATTRIBUTE.captures_iter(raw) {
        let named = [("k1", "v1"), ("k2", "v2"), ("k3", "v3")]
            .iter()
            .find_map(|(k, v)| Some((caps.name(k)?, caps.name(v)?)));
        if let Some((key, value)) = named {
            attrs.push((key.as_str().to_ascii_lowercase(), value.as_str().to_string()));
        } else if let Some(value) = ["p1", "p2", "p3"].iter().find_map(|p| caps.name(p)) {
            positional.push(value.as_str().to_string());
        }
    }

    (attrs, positional)
}
