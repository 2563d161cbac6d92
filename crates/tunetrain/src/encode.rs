//! Sliding-window training examples from a token corpus.

use ndarray::{Array2, Array3};
use thiserror::Error;
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::vocab::{Vocabulary, VocabularyError};

/// Tokens per input window.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 100;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("sequence length must be at least 1")]
    ZeroSequenceLength,

    #[error("class count {given} does not match vocabulary size {vocabulary}")]
    ClassCountMismatch { given: usize, vocabulary: usize },

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

/// Model-ready tensors plus the vocabulary that produced them.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub vocabulary: Vocabulary,
    pub sequence_length: usize,
    /// `(examples, sequence_length, 1)`, each value `code / classes`
    pub inputs: Array3<f32>,
    /// `(examples, classes)`, one-hot
    pub targets: Array2<f32>,
}

impl TrainingSet {
    pub fn num_examples(&self) -> usize {
        self.inputs.shape()[0]
    }

    pub fn num_classes(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_examples() == 0
    }
}

/// Every `(window, target)` pair in `codes`: the window starting at each
/// offset `0..len - length` and the code right after it.
pub fn windows(codes: &[usize], length: usize) -> impl Iterator<Item = (&[usize], usize)> {
    (0..codes.len().saturating_sub(length)).map(move |i| (&codes[i..i + length], codes[i + length]))
}

/// Turns a corpus into training tensors.
#[derive(Debug, Clone, Copy)]
pub struct SequenceEncoder {
    sequence_length: usize,
}

impl Default for SequenceEncoder {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
        }
    }
}

impl SequenceEncoder {
    pub fn new(sequence_length: usize) -> Result<Self, EncodeError> {
        if sequence_length == 0 {
            return Err(EncodeError::ZeroSequenceLength);
        }
        Ok(Self { sequence_length })
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Encode `corpus` with a vocabulary derived from it.
    pub fn encode(&self, corpus: &Corpus) -> Result<TrainingSet, EncodeError> {
        self.encode_with(corpus, Vocabulary::from_corpus(corpus))
    }

    /// Encode `corpus`, checking that the caller's class count matches the
    /// vocabulary the corpus actually has.
    pub fn prepare_sequences(
        &self,
        corpus: &Corpus,
        num_classes: usize,
    ) -> Result<TrainingSet, EncodeError> {
        let vocabulary = Vocabulary::from_corpus(corpus);
        if num_classes != vocabulary.len() {
            return Err(EncodeError::ClassCountMismatch {
                given: num_classes,
                vocabulary: vocabulary.len(),
            });
        }
        self.encode_with(corpus, vocabulary)
    }

    /// Encode `corpus` against an existing vocabulary, e.g. one loaded from
    /// disk. Every corpus token must be in it.
    pub fn encode_with(
        &self,
        corpus: &Corpus,
        vocabulary: Vocabulary,
    ) -> Result<TrainingSet, EncodeError> {
        let codes = vocabulary.encode(corpus)?;
        let width = self.sequence_length;
        let classes = vocabulary.len();
        let examples = codes.len().saturating_sub(width);

        if examples == 0 {
            debug!(
                tokens = codes.len(),
                sequence_length = width,
                "corpus too short for a single window"
            );
        }

        let mut inputs = Array3::<f32>::zeros((examples, width, 1));
        let mut targets = Array2::<f32>::zeros((examples, classes));

        for (i, (window, target)) in windows(&codes, width).enumerate() {
            for (j, &code) in window.iter().enumerate() {
                inputs[[i, j, 0]] = code as f32 / classes as f32;
            }
            targets[[i, target]] = 1.0;
        }

        info!(
            examples,
            classes,
            sequence_length = width,
            "encoded training sequences"
        );

        Ok(TrainingSet {
            vocabulary,
            sequence_length: width,
            inputs,
            targets,
        })
    }
}
