//! tunetrain - note/chord corpus extraction and training-set preparation
//!
//! Reads MIDI scores into a flat stream of note and chord tokens, persists
//! that corpus, encodes it into sliding-window training tensors, and lays
//! out the recurrent classifier that predicts the next token.
//!
//! ```text
//! *.mid ──extract──▶ Corpus ──vocab──▶ codes ──encode──▶ (inputs, targets)
//!                      │                                        │
//!                  data/notes                         build_model ─▶ TrainingRuntime
//! ```

pub mod corpus;
pub mod encode;
pub mod extract;
pub mod model;
pub mod pattern;
pub mod pipeline;
pub mod train;
pub mod vocab;

pub use corpus::{Corpus, CorpusError, Token, DEFAULT_CORPUS_PATH};
pub use encode::{windows, EncodeError, SequenceEncoder, TrainingSet, DEFAULT_SEQUENCE_LENGTH};
pub use extract::{
    chord_token, extract_corpus, extract_tokens, score_tokens, tokenize_event, ExtractError,
    MidiScoreParser, ScoreParser,
};
pub use model::{
    build_model, Activation, CompiledModel, LayerSpec, Loss, ModelConfig, ModelError, Optimizer,
};
pub use pattern::{expand_pattern, PatternError};
pub use pipeline::{Pipeline, PipelineOptions, PipelineReport, Prepared};
pub use train::{HandoffExporter, HandoffTensors, TrainingRuntime};
pub use vocab::{Vocabulary, VocabularyError, DEFAULT_VOCABULARY_PATH};
