//! Shared configuration loader for blockshift.
//!
//! `defaults/blockshift.default.toml` is embedded into every binary so that the
//! documented defaults and runtime behavior stay in sync. Applications layer
//! project files and overrides on top of those defaults via [`Loader`] before
//! deserializing into [`BlockshiftConfig`].

use blockshift::{PatcherSettings, RestoreTarget};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/blockshift.default.toml");

/// Project-level file picked up from the working directory when present
pub const PROJECT_FILE: &str = "blockshift.toml";

/// Top-level configuration consumed by blockshift applications.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockshiftConfig {
    pub chain: ChainConfig,
    pub shortcodes: ShortcodesConfig,
    pub embed: EmbedConfig,
    pub storage: StorageConfig,
    pub restore: RestoreConfig,
    pub logging: LoggingConfig,
}

/// Patcher names per phase, in execution order.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub pre: Vec<String>,
    pub post: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShortcodesConfig {
    pub block_level: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedConfig {
    pub providers: Vec<EmbedProvider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedProvider {
    pub host: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestoreConfig {
    pub target: RestoreTarget,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl From<&BlockshiftConfig> for PatcherSettings {
    fn from(config: &BlockshiftConfig) -> Self {
        PatcherSettings {
            block_shortcodes: config.shortcodes.block_level.clone(),
            embed_providers: config
                .embed
                .providers
                .iter()
                .map(|p| (p.host.clone(), p.slug.clone()))
                .collect(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<BlockshiftConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<BlockshiftConfig, ConfigError> {
    Loader::new().build()
}
