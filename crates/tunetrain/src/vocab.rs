//! Token ↔ integer code mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::corpus::{Corpus, CorpusError};

/// Where the vocabulary is written by default, next to the corpus.
pub const DEFAULT_VOCABULARY_PATH: &str = "data/vocabulary.json";

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to access vocabulary file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("vocabulary file {} is malformed: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("vocabulary file {} tokens are not sorted and distinct", path.display())]
    Unordered { path: PathBuf },

    #[error(
        "vocabulary file {} was built from a different corpus (expected {expected}, found {found})",
        path.display()
    )]
    Stale {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("token {0:?} is not in the vocabulary")]
    UnknownToken(String),

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// Sorted distinct tokens; a token's code is its index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    tokens: Vec<String>,
}

/// On-disk form: the vocabulary plus the fingerprint of the corpus it was
/// derived from.
#[derive(Debug, Serialize, Deserialize)]
struct VocabularyFile {
    corpus_fingerprint: String,
    corpus_len: usize,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Build from the distinct tokens of `corpus`, in lexicographic order.
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self::from_tokens(corpus.iter())
    }

    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = tokens.into_iter().collect();
        Self {
            tokens: distinct.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Dense code for `token`, if present.
    pub fn code(&self, token: &str) -> Option<usize> {
        self.tokens
            .binary_search_by(|probe| probe.as_str().cmp(token))
            .ok()
    }

    pub fn token(&self, code: usize) -> Option<&str> {
        self.tokens.get(code).map(String::as_str)
    }

    /// Map every token of `corpus` to its code.
    pub fn encode(&self, corpus: &Corpus) -> Result<Vec<usize>, VocabularyError> {
        corpus
            .iter()
            .map(|t| {
                self.code(t)
                    .ok_or_else(|| VocabularyError::UnknownToken(t.to_string()))
            })
            .collect()
    }

    /// Write the vocabulary as JSON, stamped with `corpus`'s fingerprint.
    pub fn save(&self, path: &Path, corpus: &Corpus) -> Result<(), VocabularyError> {
        let io_err = |source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = VocabularyFile {
            corpus_fingerprint: corpus.fingerprint()?,
            corpus_len: corpus.len(),
            tokens: self.tokens.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| VocabularyError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, json).map_err(io_err)?;

        info!(path = %path.display(), size = self.len(), "saved vocabulary");
        Ok(())
    }

    /// Read a saved vocabulary and the corpus fingerprint it carries.
    pub fn load(path: &Path) -> Result<(Self, String), VocabularyError> {
        let text = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: VocabularyFile =
            serde_json::from_str(&text).map_err(|source| VocabularyError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if !file.tokens.windows(2).all(|w| w[0] < w[1]) {
            return Err(VocabularyError::Unordered {
                path: path.to_path_buf(),
            });
        }

        Ok((
            Self {
                tokens: file.tokens,
            },
            file.corpus_fingerprint,
        ))
    }

    /// Read a saved vocabulary, refusing it unless it was built from `corpus`.
    pub fn load_for(path: &Path, corpus: &Corpus) -> Result<Self, VocabularyError> {
        let (vocabulary, found) = Self::load(path)?;
        let expected = corpus.fingerprint()?;
        if found != expected {
            return Err(VocabularyError::Stale {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }
        Ok(vocabulary)
    }
}
