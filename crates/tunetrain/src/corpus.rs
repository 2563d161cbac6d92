use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// One musical event as a string: a pitch name (`"E-4"`) or a dot-joined
/// chord (`"0.4.7"`).
pub type Token = String;

/// Where the extracted corpus is written by default.
pub const DEFAULT_CORPUS_PATH: &str = "data/notes";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to access corpus file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode corpus: {0}")]
    Encode(#[source] bincode::Error),

    #[error("corpus file {} is not a token list: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: bincode::Error,
    },
}

/// The ordered token stream a model trains on.
///
/// Tokens keep the order they were extracted in, across file boundaries,
/// with no separators and no deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus(Vec<Token>);

impl Corpus {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.0
    }

    fn to_bytes(&self) -> Result<Vec<u8>, CorpusError> {
        bincode::serialize(&self.0).map_err(CorpusError::Encode)
    }

    /// Content hash of the serialized corpus, hex encoded.
    ///
    /// Two corpora share a fingerprint only if they hold the same tokens in
    /// the same order.
    pub fn fingerprint(&self) -> Result<String, CorpusError> {
        Ok(blake3::hash(&self.to_bytes()?).to_hex().to_string())
    }

    /// Write the corpus to `path`, replacing any previous content.
    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let io_err = |source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_bytes()?).map_err(io_err)?;

        info!(path = %path.display(), tokens = self.len(), "saved corpus");
        Ok(())
    }

    /// Read a corpus previously written by [`Corpus::save`].
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let bytes = std::fs::read(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tokens: Vec<Token> =
            bincode::deserialize(&bytes).map_err(|source| CorpusError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), tokens = tokens.len(), "loaded corpus");
        Ok(Self(tokens))
    }
}

impl From<Vec<Token>> for Corpus {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

impl FromIterator<Token> for Corpus {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
