//! Symbolic score model for Standard MIDI Files.
//!
//! Turns MIDI bytes into a [`Score`]: tracks of timed notes that can be
//! partitioned by instrument into [`Part`]s or flattened into a single
//! stream of notes and chords.

pub mod chord;
pub mod event;
pub mod parse;
pub mod pitch;
pub mod score;

pub use chord::{normal_order, Chord};
pub use event::{Event, Instrument, Meta, Note, Rest};
pub use parse::{TimedMeta, TimedNote, Track};
pub use pitch::Pitch;
pub use score::{Part, Score};

use std::path::PathBuf;

/// Errors from reading or parsing a score.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("MIDI parse error: {0}")]
    MidiParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
