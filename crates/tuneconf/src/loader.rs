//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, TuneConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/tunetrain/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("tunetrain/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("tunetrain.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file as a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `overlay` into `base`, key by key. Nested tables merge
/// recursively; any other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Build a config from a merged table, filling gaps with defaults.
pub fn config_from_table(table: toml::Table, origin: &Path) -> Result<TuneConfig, ConfigError> {
    let mut config: TuneConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

    config.paths.corpus = expand_path(&config.paths.corpus.to_string_lossy());
    config.paths.vocabulary = expand_path(&config.paths.vocabulary.to_string_lossy());
    config.paths.handoff_dir = expand_path(&config.paths.handoff_dir.to_string_lossy());

    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut TuneConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides read through `lookup`, so tests need not touch the
/// process environment.
pub fn apply_overrides_from(
    config: &mut TuneConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("TUNETRAIN_CORPUS_PATH") {
        config.paths.corpus = expand_path(&v);
        sources.env_overrides.push("TUNETRAIN_CORPUS_PATH".to_string());
    }
    if let Some(v) = lookup("TUNETRAIN_VOCABULARY_PATH") {
        config.paths.vocabulary = expand_path(&v);
        sources.env_overrides.push("TUNETRAIN_VOCABULARY_PATH".to_string());
    }
    if let Some(v) = lookup("TUNETRAIN_HANDOFF_DIR") {
        config.paths.handoff_dir = expand_path(&v);
        sources.env_overrides.push("TUNETRAIN_HANDOFF_DIR".to_string());
    }
    if let Some(v) = lookup("TUNETRAIN_PATTERN") {
        config.extract.pattern = v;
        sources.env_overrides.push("TUNETRAIN_PATTERN".to_string());
    }
    if let Some(v) = lookup("TUNETRAIN_SEQUENCE_LENGTH") {
        if let Ok(length) = v.parse() {
            config.sequence.length = length;
            sources.env_overrides.push("TUNETRAIN_SEQUENCE_LENGTH".to_string());
        }
    }
    if let Some(v) = lookup("TUNETRAIN_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("TUNETRAIN_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        let (var_name, rest) = match stripped.find('/') {
            Some(slash_pos) => (&stripped[..slash_pos], Some(&stripped[slash_pos + 1..])),
            None => (stripped, None),
        };
        if let Ok(var_value) = env::var(var_name) {
            let base = PathBuf::from(var_value);
            return match rest {
                Some(rest) => base.join(rest),
                None => base,
            };
        }
    }

    PathBuf::from(path)
}
