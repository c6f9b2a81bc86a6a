//! Built-in patchers
//!
//! Pre-conversion:
//! - `autop`: wraps loose text chunks in paragraphs
//! - `shortcode-preconversion`: lifts block-level shortcodes out of paragraphs
//!
//! Post-conversion:
//! - `img`, `paragraph`, `blockquote`: restore attributes the conversion step
//!   dropped
//! - `caption`: `[caption]` around an image to image blocks
//! - `video`, `audio`, `embed`: media shortcodes to media blocks
//! - `module`: `[module]` blocks
//! - `pullquote`: `[pullquote]` blocks

pub mod attributes;
pub mod autop;
pub mod caption;
pub mod media;
pub mod module;
pub mod pullquote;
pub mod shortcode_preconversion;

pub use attributes::AttributeRestorePatcher;
pub use autop::AutoParagraphPatcher;
pub use caption::CaptionPatcher;
pub use media::MediaShortcodePatcher;
pub use module::{ModuleShortcodePatcher, DEFAULT_MODULE_BLOCK};
pub use pullquote::PullquotePatcher;
pub use shortcode_preconversion::ShortcodePreconversionPatcher;

use std::collections::BTreeMap;

/// Pre-conversion patchers run by default, in order
pub const DEFAULT_PRE_CHAIN: &[&str] = &["autop", "shortcode-preconversion"];

/// Post-conversion patchers run by default, in order
pub const DEFAULT_POST_CHAIN: &[&str] = &[
    "img",
    "caption",
    "paragraph",
    "blockquote",
    "video",
    "audio",
    "embed",
    "module",
    "pullquote",
];

/// Immutable settings the built-in patchers consult
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatcherSettings {
    /// Shortcodes that must end up as blocks of their own
    pub block_shortcodes: Vec<String>,
    /// Embed provider slug by host name, e.g. `youtube.com` → `youtube`
    pub embed_providers: BTreeMap<String, String>,
}

impl Default for PatcherSettings {
    fn default() -> Self {
        let block_shortcodes = [
            "audio",
            "caption",
            "embed",
            "gallery",
            "module",
            "pullquote",
            "video",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let embed_providers = [
            ("youtube.com", "youtube"),
            ("youtu.be", "youtube"),
            ("vimeo.com", "vimeo"),
            ("twitter.com", "twitter"),
            ("soundcloud.com", "soundcloud"),
            ("spotify.com", "spotify"),
        ]
        .iter()
        .map(|(host, slug)| (host.to_string(), slug.to_string()))
        .collect();

        Self {
            block_shortcodes,
            embed_providers,
        }
    }
}
