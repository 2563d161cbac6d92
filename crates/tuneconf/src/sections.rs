//! Config file sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where pipeline artifacts live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Persisted token corpus.
    /// Default: data/notes
    #[serde(default = "PathsConfig::default_corpus")]
    pub corpus: PathBuf,

    /// Persisted vocabulary, written next to the corpus.
    /// Default: data/vocabulary.json
    #[serde(default = "PathsConfig::default_vocabulary")]
    pub vocabulary: PathBuf,

    /// Directory the handoff exporter writes model + tensors into.
    /// Default: data/handoff
    #[serde(default = "PathsConfig::default_handoff_dir")]
    pub handoff_dir: PathBuf,
}

impl PathsConfig {
    fn default_corpus() -> PathBuf {
        PathBuf::from("data/notes")
    }

    fn default_vocabulary() -> PathBuf {
        PathBuf::from("data/vocabulary.json")
    }

    fn default_handoff_dir() -> PathBuf {
        PathBuf::from("data/handoff")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus: Self::default_corpus(),
            vocabulary: Self::default_vocabulary(),
            handoff_dir: Self::default_handoff_dir(),
        }
    }
}

/// Score ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Glob pattern selecting the MIDI files to read.
    /// Default: midi_songs/*.mid
    #[serde(default = "ExtractConfig::default_pattern")]
    pub pattern: String,
}

impl ExtractConfig {
    fn default_pattern() -> String {
        "midi_songs/*.mid".to_string()
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            pattern: Self::default_pattern(),
        }
    }
}

/// Training window shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Tokens per input window.
    /// Default: 100
    #[serde(default = "SequenceConfig::default_length")]
    pub length: usize,
}

impl SequenceConfig {
    fn default_length() -> usize {
        100
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            length: Self::default_length(),
        }
    }
}

/// Layer sizes and dropout rates for the network.
///
/// Loss and optimizer are not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default = "ModelSection::default_lstm_units")]
    pub lstm_units: usize,

    #[serde(default = "ModelSection::default_dropout")]
    pub recurrent_dropout: f32,

    #[serde(default = "ModelSection::default_dropout")]
    pub dropout: f32,

    #[serde(default = "ModelSection::default_dense_units")]
    pub dense_units: usize,
}

impl ModelSection {
    fn default_lstm_units() -> usize {
        512
    }

    fn default_dropout() -> f32 {
        0.3
    }

    fn default_dense_units() -> usize {
        256
    }
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            lstm_units: Self::default_lstm_units(),
            recurrent_dropout: Self::default_dropout(),
            dropout: Self::default_dropout(),
            dense_units: Self::default_dense_units(),
        }
    }
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` expression).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
