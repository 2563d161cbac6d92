//! Extract → vocabulary → encode → model → fit, in sequence.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use tuneconf::TuneConfig;

use crate::corpus::Corpus;
use crate::encode::{SequenceEncoder, TrainingSet};
use crate::extract::{extract_corpus, ScoreParser};
use crate::model::{build_model, CompiledModel, ModelConfig};
use crate::train::TrainingRuntime;
use crate::vocab::{Vocabulary, VocabularyError};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub pattern: String,
    pub corpus_path: PathBuf,
    pub vocabulary_path: PathBuf,
    pub sequence_length: usize,
    pub model: ModelConfig,
    /// Load the persisted corpus instead of re-reading score files
    pub reuse_corpus: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &TuneConfig) -> Self {
        Self {
            pattern: config.extract.pattern.clone(),
            corpus_path: config.paths.corpus.clone(),
            vocabulary_path: config.paths.vocabulary.clone(),
            sequence_length: config.sequence.length,
            model: ModelConfig::from(&config.model),
            reuse_corpus: false,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub tokens: usize,
    pub vocabulary_size: usize,
    pub examples: usize,
    pub parameters: usize,
}

/// Everything up to, but not including, the fit.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub corpus: Corpus,
    pub training: TrainingSet,
    pub model: CompiledModel,
}

impl Prepared {
    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            tokens: self.corpus.len(),
            vocabulary_size: self.training.num_classes(),
            examples: self.training.num_examples(),
            parameters: self.model.parameter_count(),
        }
    }

    pub fn fit(&self, runtime: &mut dyn TrainingRuntime) -> Result<PipelineReport> {
        runtime
            .fit(
                &self.model,
                self.training.inputs.view(),
                self.training.targets.view(),
            )
            .context("Training runtime failed")?;
        Ok(self.report())
    }
}

pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The corpus: freshly extracted, or the persisted snapshot when reusing.
    pub fn corpus(&self, parser: &dyn ScoreParser) -> Result<Corpus> {
        if self.options.reuse_corpus {
            return Corpus::load(&self.options.corpus_path).with_context(|| {
                format!(
                    "Failed to reuse corpus at {}",
                    self.options.corpus_path.display()
                )
            });
        }
        extract_corpus(&self.options.pattern, parser, &self.options.corpus_path)
            .context("Extraction failed")
    }

    /// Vocabulary for `corpus`, persisted next to it.
    ///
    /// When reusing a corpus, a vocabulary saved from that same corpus is
    /// kept so codes stay stable; anything else is rebuilt and overwritten.
    pub fn vocabulary(&self, corpus: &Corpus) -> Result<Vocabulary> {
        let path = &self.options.vocabulary_path;

        if self.options.reuse_corpus {
            match Vocabulary::load_for(path, corpus) {
                Ok(vocabulary) => {
                    info!(path = %path.display(), size = vocabulary.len(), "reusing vocabulary");
                    return Ok(vocabulary);
                }
                Err(e @ (VocabularyError::Stale { .. } | VocabularyError::Io { .. })) => {
                    warn!("{}; rebuilding vocabulary", e);
                }
                Err(e) => return Err(e).context("Failed to load vocabulary"),
            }
        }

        let vocabulary = Vocabulary::from_corpus(corpus);
        vocabulary
            .save(path, corpus)
            .context("Failed to persist vocabulary")?;
        Ok(vocabulary)
    }

    pub fn encode(&self, corpus: &Corpus, vocabulary: Vocabulary) -> Result<TrainingSet> {
        let encoder = SequenceEncoder::new(self.options.sequence_length)?;
        Ok(encoder.encode_with(corpus, vocabulary)?)
    }

    /// Run every step except the fit.
    pub fn prepare(&self, parser: &dyn ScoreParser) -> Result<Prepared> {
        let corpus = self.corpus(parser)?;
        let vocabulary = self.vocabulary(&corpus)?;
        let training = self.encode(&corpus, vocabulary)?;

        if training.is_empty() {
            bail!(
                "Corpus of {} tokens is too short for sequence length {}; nothing to train on",
                corpus.len(),
                self.options.sequence_length
            );
        }

        let model = build_model(
            training.inputs.shape(),
            training.num_classes(),
            &self.options.model,
        )
        .context("Failed to build model")?;

        Ok(Prepared {
            corpus,
            training,
            model,
        })
    }

    pub fn run(
        &self,
        parser: &dyn ScoreParser,
        runtime: &mut dyn TrainingRuntime,
    ) -> Result<PipelineReport> {
        let prepared = self.prepare(parser)?;
        let report = prepared.fit(runtime)?;
        info!(
            tokens = report.tokens,
            vocabulary = report.vocabulary_size,
            examples = report.examples,
            parameters = report.parameters,
            "pipeline complete"
        );
        Ok(report)
    }
}
