//! tunetrain - prepare MIDI corpora for next-event sequence models
//!
//! Subcommands:
//! - `tunetrain extract [PATTERN]` - Parse score files into the token corpus
//! - `tunetrain encode` - Encode the saved corpus into training tensors
//! - `tunetrain model` - Print the network laid out for the saved corpus
//! - `tunetrain prepare` - Run the whole pipeline and write a training handoff
//! - `tunetrain config` - Show the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tuneconf::TuneConfig;

mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "tunetrain")]
#[command(about = "Note/chord corpus extraction and training-set preparation")]
#[command(version)]
struct Cli {
    /// Config file (overrides ./tunetrain.toml)
    #[arg(short, long, global = true, env = "TUNETRAIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse score files into the token corpus
    Extract {
        /// Glob selecting the MIDI files (default from config)
        pattern: Option<String>,
    },

    /// Encode the saved corpus into training tensors
    Encode {
        /// Tokens per input window (default from config)
        #[arg(short, long)]
        sequence_length: Option<usize>,
    },

    /// Print the network for the saved corpus
    Model,

    /// Extract, encode, build the model and write a training handoff
    Prepare {
        /// Load the saved corpus instead of re-reading score files
        #[arg(long)]
        reuse_corpus: bool,

        /// Glob selecting the MIDI files (default from config)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Handoff directory (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration and where it came from
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = TuneConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    telemetry::init(&config.telemetry.log_level);

    match cli.command {
        Commands::Extract { pattern } => {
            commands::extract(&config, pattern.as_deref())?;
        }
        Commands::Encode { sequence_length } => {
            commands::encode(&config, sequence_length)?;
        }
        Commands::Model => {
            commands::model(&config)?;
        }
        Commands::Prepare {
            reuse_corpus,
            pattern,
            output,
        } => {
            commands::prepare(&config, reuse_corpus, pattern, output)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources)?;
        }
    }

    Ok(())
}
