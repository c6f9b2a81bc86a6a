//! Reversible conversion of legacy HTML content into block markup
//!
//!     Legacy posts are freeform HTML with shortcodes sprinkled in. The block editor wants
//!     delimited blocks (`<!-- wp:name {attrs} --> ... <!-- /wp:name -->`). This crate runs each
//!     document through a fixed pipeline and keeps enough history to undo it:
//!
//!         encode → pre patchers → conversion step → post patchers → decode
//!
//!     The original content is captured once, before anything runs, and converting again always
//!     starts from that capture. Restoring copies either the original or the last converted output
//!     back into the live field.
//!
//!     This is a pure lib: it powers blockshift-cli but assumes nothing about a shell. No printing,
//!     no env vars, no global hooks. Everything the pipeline needs is passed in.
//!
//! Architecture
//!
//!     .
//!     ├── document.rs             # DocumentId, Snapshot, Document
//!     ├── error.rs                # Error taxonomy
//!     ├── codec.rs                # Placeholder encode/decode of existing blocks
//!     ├── patcher.rs              # Patcher trait
//!     ├── patchers                # Built-in patchers
//!     ├── chain.rs                # PatchChain and per-document ChainRun
//!     ├── registry.rs             # PatcherRegistry, chains by name
//!     ├── converter.rs            # BlockConverter trait, HtmlBlockConverter
//!     ├── html.rs                 # html5ever parsing, serializing, entity decoding
//!     ├── engine.rs               # ConversionEngine
//!     ├── store.rs                # SnapshotStore, MemoryStore, SqliteStore
//!     ├── restore.rs              # Restore operator
//!     ├── shortcode.rs            # Shortcode scanner
//!     └── blocks.rs               # Block markup helpers
//!
//! The Codec
//!
//!     Content that is already block markup must not be touched by any patcher or by the
//!     conversion step. Before the pre patchers run, every outermost block region is swapped for a
//!     numbered HTML comment; after the last post patcher the comments are swapped back. Because
//!     the placeholders are comments, the conversion step passes them through like any other
//!     comment. A patcher that drops, duplicates or invents a placeholder fails the document.
//!
//! Patchers
//!
//!     A patcher declares which phases it supports. Pre patchers rewrite HTML, post patchers
//!     rewrite blocks and also get the HTML that was handed to the conversion step, so they can
//!     put back what the conversion step lost. Chains are declared by name and resolved once at
//!     startup; an unknown name or a patcher in the wrong phase fails there, never per document.
//!
//! Concurrency
//!
//!     Chains, patchers and converters are `Send + Sync`. Per-document state lives in a
//!     `ChainRun`, so one engine can convert several documents on several threads. Callers must
//!     not convert the same document twice at once.
//!
//! Testing
//!     tests
//!     ├── lib.rs
//!     ├── common/mod.rs
//!     ├── pipeline.rs
//!     ├── restore.rs
//!     └── codec_props.rs
//!
//!     Rust does not discover tests in subdirectories, so tests/lib.rs includes these as modules.

pub mod blocks;
pub mod chain;
pub mod codec;
pub mod converter;
pub mod document;
pub mod engine;
pub mod error;
pub mod html;
pub mod patcher;
pub mod patchers;
pub mod registry;
pub mod restore;
pub mod shortcode;
pub mod store;

pub use chain::{ChainRun, PatchChain};
pub use converter::{BlockConverter, HtmlBlockConverter};
pub use document::{Document, DocumentId, Snapshot};
pub use engine::{BatchReport, ConversionEngine};
pub use error::{
    ChainError, CodecError, ConversionStepError, ConvertError, PatchError, PatchFault, Phase,
    RestoreError, ScopeError, StorageError,
};
pub use patcher::{PatchContext, Patcher};
pub use patchers::PatcherSettings;
pub use registry::PatcherRegistry;
pub use restore::{restore, ContentCache, NoopCache, RestoreScope, RestoreTarget};
pub use store::{MemoryStore, SnapshotStore, SqliteStore};

/// Engine with the default chain and converter for `settings`
pub fn engine_with_settings(
    settings: &PatcherSettings,
    pre: &[String],
    post: &[String],
) -> Result<ConversionEngine, ChainError> {
    let chain = PatcherRegistry::with_settings(settings).resolve_chain(pre, post)?;
    let converter = HtmlBlockConverter::new(shortcode::ShortcodeSet::new(&settings.block_shortcodes));
    Ok(ConversionEngine::new(chain, converter))
}
