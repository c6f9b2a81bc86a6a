//! Media shortcodes to media blocks
//!
//! `[video]`, `[audio]` and `[embed]` shortcodes come out of the conversion
//! step as opaque shortcode blocks. One patcher per shortcode replaces them
//! with native video, audio and embed blocks. Embeds whose host is not a known
//! provider stay shortcodes.
//!
//! Shortcode text is taken from serialized HTML, so sources and links are
//! decoded first and escaped once for wherever they land.

use crate::blocks::{block, escape_attr, escape_text, rewrite_shortcode_blocks};
use crate::error::PatchFault;
use crate::html::decode_entities;
use crate::patcher::{PatchContext, Patcher};
use crate::shortcode::{Shortcode, ShortcodeSet};
use serde_json::json;
use std::collections::BTreeMap;
use url::Url;

/// Attributes the legacy `[video]` and `[audio]` shortcodes accept for the file
const SOURCE_KEYS: &[&str] = &["src", "mp4", "webm", "ogv", "mp3", "m4a", "ogg", "wav"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Video,
    Audio,
    Embed,
}

impl MediaKind {
    fn name(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Embed => "embed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaShortcodePatcher {
    kind: MediaKind,
    shortcodes: ShortcodeSet,
    providers: BTreeMap<String, String>,
}

impl MediaShortcodePatcher {
    fn with_kind(kind: MediaKind, providers: BTreeMap<String, String>) -> Self {
        let providers = providers
            .into_iter()
            .map(|(host, slug)| (normalize_host(&host).to_string(), slug))
            .collect();
        Self {
            kind,
            shortcodes: ShortcodeSet::new([kind.name()]),
            providers,
        }
    }

    /// `[video]` to a video block
    pub fn video() -> Self {
        Self::with_kind(MediaKind::Video, BTreeMap::new())
    }

    /// `[audio]` to an audio block
    pub fn audio() -> Self {
        Self::with_kind(MediaKind::Audio, BTreeMap::new())
    }

    /// `[embed]` to an embed block; `providers` maps host names to provider
    /// slugs
    pub fn embed(providers: BTreeMap<String, String>) -> Self {
        Self::with_kind(MediaKind::Embed, providers)
    }

    /// Provider slug for `link`, matching subdomains of known hosts
    pub fn provider_for(&self, link: &str) -> Option<&str> {
        let parsed = Url::parse(link).ok()?;
        let host = normalize_host(parsed.host_str()?).to_ascii_lowercase();
        self.providers
            .iter()
            .find(|(known, _)| host == **known || host.ends_with(&format!(".{known}")))
            .map(|(_, slug)| slug.as_str())
    }

    fn media_block(&self, shortcode: &Shortcode) -> Option<String> {
        match self.kind {
            MediaKind::Video | MediaKind::Audio => {
                let tag = self.kind.name();
                let src = escape_attr(&decode_entities(media_source(shortcode)?));
                Some(block(
                    tag,
                    None,
                    &format!(
                        "<figure class=\"wp-block-{tag}\"><{tag} controls src=\"{src}\"></{tag}></figure>"
                    ),
                ))
            }
            MediaKind::Embed => {
                let link = decode_entities(embed_url(shortcode)?);
                let slug = self.provider_for(&link)?;
                Some(block(
                    "embed",
                    Some(&json!({ "providerNameSlug": slug, "url": &link })),
                    &format!(
                        "<figure class=\"wp-block-embed is-provider-{slug}\"><div class=\"wp-block-embed__wrapper\">\n{}\n</div></figure>",
                        escape_text(&link)
                    ),
                ))
            }
        }
    }
}

impl Patcher for MediaShortcodePatcher {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn description(&self) -> &str {
        match self.kind {
            MediaKind::Video => "Turns [video] shortcode blocks into video blocks",
            MediaKind::Audio => "Turns [audio] shortcode blocks into audio blocks",
            MediaKind::Embed => "Turns [embed] shortcode blocks from known providers into embed blocks",
        }
    }

    fn supports_post(&self) -> bool {
        true
    }

    fn patch_blocks_contents(&self, blocks: &str, ctx: &PatchContext) -> Result<String, PatchFault> {
        rewrite_shortcode_blocks(blocks, |inner| {
            let mut found = self
                .shortcodes
                .parse(inner)
                .map_err(|e| PatchFault::new(e.to_string()))?;
            if found.len() != 1 || found[0].span != (0..inner.len()) {
                return Ok(None);
            }
            let shortcode = found.remove(0);
            let replacement = self.media_block(&shortcode);
            if replacement.is_none() {
                log::debug!(
                    "document {}: leaving [{}] as a shortcode block",
                    ctx.document_id,
                    shortcode.name
                );
            }
            Ok(replacement)
        })
    }
}

fn normalize_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn media_source(shortcode: &Shortcode) -> Option<&str> {
    SOURCE_KEYS
        .iter()
        .find_map(|key| shortcode.attr(key))
        .filter(|src| !src.trim().is_empty())
}

fn embed_url(shortcode: &Shortcode) -> Option<&str> {
    shortcode
        .content
        .as_deref()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .or_else(|| shortcode.attr("url"))
        .or_else(|| shortcode.positional.first().map(String::as_str))
}
