//! Patcher registry for patcher discovery and chain assembly
//!
//! Patchers are registered under their name. A [`PatchChain`] is resolved from
//! two ordered lists of names, one per phase, so the chain can be declared in
//! configuration instead of code.

use crate::chain::PatchChain;
use crate::error::ChainError;
use crate::patcher::Patcher;
use crate::patchers::{
    AttributeRestorePatcher, AutoParagraphPatcher, CaptionPatcher, MediaShortcodePatcher,
    ModuleShortcodePatcher, PatcherSettings, PullquotePatcher, ShortcodePreconversionPatcher,
    DEFAULT_POST_CHAIN, DEFAULT_PRE_CHAIN,
};
use crate::shortcode::ShortcodeSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of patchers
///
/// # Examples
///
/// ```ignore
/// let registry = PatcherRegistry::with_defaults();
/// let chain = registry.resolve_chain(&["autop"], &["img", "pullquote"])?;
/// ```
pub struct PatcherRegistry {
    patchers: HashMap<String, Arc<dyn Patcher>>,
}

impl PatcherRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        PatcherRegistry {
            patchers: HashMap::new(),
        }
    }

    /// Register a patcher
    ///
    /// If a patcher with the same name already exists, it will be replaced.
    pub fn register<P: Patcher + 'static>(&mut self, patcher: P) {
        self.patchers
            .insert(patcher.name().to_string(), Arc::new(patcher));
    }

    /// Get a patcher by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Patcher>, ChainError> {
        self.patchers
            .get(name)
            .cloned()
            .ok_or_else(|| ChainError::PatcherNotFound(name.to_string()))
    }

    /// Check if a patcher exists
    pub fn has(&self, name: &str) -> bool {
        self.patchers.contains_key(name)
    }

    /// List all available patcher names (sorted)
    pub fn list_patchers(&self) -> Vec<String> {
        let mut names: Vec<_> = self.patchers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a chain from patcher names, in the order given
    pub fn resolve_chain<S: AsRef<str>>(
        &self,
        pre: &[S],
        post: &[S],
    ) -> Result<PatchChain, ChainError> {
        let mut builder = PatchChain::builder();
        for name in pre {
            builder = builder.pre(self.get(name.as_ref())?)?;
        }
        for name in post {
            builder = builder.post(self.get(name.as_ref())?)?;
        }
        Ok(builder.build())
    }

    /// The default chain over this registry's patchers
    pub fn default_chain(&self) -> Result<PatchChain, ChainError> {
        self.resolve_chain(DEFAULT_PRE_CHAIN, DEFAULT_POST_CHAIN)
    }

    /// Create a registry with the built-in patchers configured from `settings`
    pub fn with_settings(settings: &PatcherSettings) -> Self {
        let mut registry = Self::new();

        registry.register(AutoParagraphPatcher);
        registry.register(ShortcodePreconversionPatcher::new(ShortcodeSet::new(
            &settings.block_shortcodes,
        )));
        registry.register(AttributeRestorePatcher::img());
        registry.register(CaptionPatcher::default());
        registry.register(AttributeRestorePatcher::paragraph());
        registry.register(AttributeRestorePatcher::blockquote());
        registry.register(MediaShortcodePatcher::video());
        registry.register(MediaShortcodePatcher::audio());
        registry.register(MediaShortcodePatcher::embed(settings.embed_providers.clone()));
        registry.register(ModuleShortcodePatcher::default());
        registry.register(PullquotePatcher::default());

        registry
    }

    /// Create a registry with the built-in patchers and default settings
    pub fn with_defaults() -> Self {
        Self::with_settings(&PatcherSettings::default())
    }
}

impl Default for PatcherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
