//! CLI command implementations

use anyhow::{Context, Result};
use std::path::PathBuf;
use tuneconf::{ConfigSources, TuneConfig};

use tunetrain::{
    build_model, extract_corpus, Corpus, HandoffExporter, MidiScoreParser, ModelConfig, Pipeline,
    PipelineOptions, SequenceEncoder, Vocabulary,
};

fn load_corpus(config: &TuneConfig) -> Result<Corpus> {
    Corpus::load(&config.paths.corpus).with_context(|| {
        format!(
            "No corpus at {} (run `tunetrain extract` first)",
            config.paths.corpus.display()
        )
    })
}

pub fn extract(config: &TuneConfig, pattern: Option<&str>) -> Result<()> {
    let pattern = pattern.unwrap_or(&config.extract.pattern);
    let corpus = extract_corpus(pattern, &MidiScoreParser, &config.paths.corpus)?;

    let vocabulary = Vocabulary::from_corpus(&corpus);
    vocabulary.save(&config.paths.vocabulary, &corpus)?;

    println!(
        "{} tokens ({} distinct) → {}",
        corpus.len(),
        vocabulary.len(),
        config.paths.corpus.display()
    );
    Ok(())
}

pub fn encode(config: &TuneConfig, sequence_length: Option<usize>) -> Result<()> {
    let corpus = load_corpus(config)?;
    let encoder = SequenceEncoder::new(sequence_length.unwrap_or(config.sequence.length))?;
    let set = encoder.prepare_sequences(&corpus, Vocabulary::from_corpus(&corpus).len())?;

    println!("Tokens:      {}", corpus.len());
    println!("Classes:     {}", set.num_classes());
    println!("Examples:    {}", set.num_examples());
    println!("Inputs:      {:?}", set.inputs.shape());
    println!("Targets:     {:?}", set.targets.shape());
    Ok(())
}

pub fn model(config: &TuneConfig) -> Result<()> {
    let corpus = load_corpus(config)?;
    let classes = Vocabulary::from_corpus(&corpus).len();
    let window = config.sequence.length;
    let examples = corpus.len().saturating_sub(window);

    let model = build_model(
        &[examples, window, 1],
        classes,
        &ModelConfig::from(&config.model),
    )?;
    println!("{}", model.summary());
    Ok(())
}

pub fn prepare(
    config: &TuneConfig,
    reuse_corpus: bool,
    pattern: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut options = PipelineOptions::from_config(config);
    options.reuse_corpus = reuse_corpus;
    if let Some(pattern) = pattern {
        options.pattern = pattern;
    }
    let output = output.unwrap_or_else(|| config.paths.handoff_dir.clone());

    let prepared = Pipeline::new(options).prepare(&MidiScoreParser)?;
    let mut exporter =
        HandoffExporter::new(&output).with_vocabulary(prepared.training.vocabulary.clone());
    let report = prepared.fit(&mut exporter)?;

    println!("Tokens:      {}", report.tokens);
    println!("Classes:     {}", report.vocabulary_size);
    println!("Examples:    {}", report.examples);
    println!("Parameters:  {}", report.parameters);
    println!("Handoff:     {}", output.display());
    Ok(())
}

pub fn show_config(config: &TuneConfig, sources: &ConfigSources) -> Result<()> {
    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    }
    for file in &sources.files {
        println!("# loaded: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env override: {}", var);
    }
    println!("{}", config.to_toml()?);
    Ok(())
}
