//! Configuration loading for tunetrain.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/tunetrain/config.toml` (system)
//! 2. `~/.config/tunetrain/config.toml` (user)
//! 3. `./tunetrain.toml` or the `--config` path (local override)
//! 4. Environment variables (`TUNETRAIN_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! corpus = "data/notes"
//! vocabulary = "data/vocabulary.json"
//! handoff_dir = "data/handoff"
//!
//! [extract]
//! pattern = "midi_songs/*.mid"
//!
//! [sequence]
//! length = 100
//!
//! [model]
//! lstm_units = 512
//! recurrent_dropout = 0.3
//! dropout = 0.3
//! dense_units = 256
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ExtractConfig, ModelSection, PathsConfig, SequenceConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete tunetrain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TuneConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub sequence: SequenceConfig,

    #[serde(default)]
    pub model: ModelSection,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TuneConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./tunetrain.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let origin = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let mut config = loader::config_from_table(merged, &origin)?;

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self)?;
        Ok(format!("# tunetrain configuration\n\n{}", body))
    }
}
