//! `[module]` shortcode blocks to module blocks
//!
//! Modules are reusable fragments the legacy theme rendered from shortcode
//! attributes. Every attribute is carried over into the block attributes, with
//! positional arguments under `args`. An enclosing module keeps its content in
//! a wrapper `<div>`; a self-closing one becomes a void block.

use crate::blocks::{block, rewrite_shortcode_blocks, void_block};
use crate::error::PatchFault;
use crate::html::decode_entities;
use crate::patcher::{PatchContext, Patcher};
use crate::shortcode::{Shortcode, ShortcodeSet};
use serde_json::{Map, Value};

/// Block type module shortcodes turn into unless configured otherwise
pub const DEFAULT_MODULE_BLOCK: &str = "blockshift/module";

#[derive(Debug, Clone)]
pub struct ModuleShortcodePatcher {
    shortcodes: ShortcodeSet,
    block_name: String,
}

impl ModuleShortcodePatcher {
    pub fn new(block_name: &str) -> Self {
        Self {
            shortcodes: ShortcodeSet::new(["module"]),
            block_name: block_name.to_string(),
        }
    }

    fn module_block(&self, module: &Shortcode) -> String {
        let mut attrs = Map::new();
        for (key, value) in &module.attrs {
            attrs.insert(key.clone(), Value::from(decode_entities(value)));
        }
        if !module.positional.is_empty() {
            let args = module.positional.iter().map(|arg| Value::from(decode_entities(arg)));
            attrs.insert("args".to_string(), Value::Array(args.collect()));
        }
        let attrs = (!attrs.is_empty()).then(|| Value::Object(attrs));

        match module.content.as_deref() {
            Some(content) => {
                let class = format!("wp-block-{}", self.block_name.replace('/', "-"));
                block(
                    &self.block_name,
                    attrs.as_ref(),
                    &format!("<div class=\"{class}\">{}</div>", content.trim()),
                )
            }
            None => void_block(&self.block_name, attrs.as_ref()),
        }
    }
}

impl Default for ModuleShortcodePatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_BLOCK)
    }
}

impl Patcher for ModuleShortcodePatcher {
    fn name(&self) -> &str {
        "module"
    }

    fn description(&self) -> &str {
        "Turns [module] shortcode blocks into module blocks"
    }

    fn supports_post(&self) -> bool {
        true
    }

    fn patch_blocks_contents(&self, blocks: &str, _ctx: &PatchContext) -> Result<String, PatchFault> {
        rewrite_shortcode_blocks(blocks, |inner| {
            let found = self
                .shortcodes
                .parse(inner)
                .map_err(|e| PatchFault::new(e.to_string()))?;
            match found.as_slice() {
                [module] if module.span == (0..inner.len()) => Ok(Some(self.module_block(module))),
                _ => Ok(None),
            }
        })
    }
}
