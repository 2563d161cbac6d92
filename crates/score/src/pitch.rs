use serde::{Deserialize, Serialize};

/// Step + accidental for each pitch class. Black keys follow the default
/// spelling used when a score carries no key context: sharps for C#, F#, G#
/// and flats (written `-`) for E- and B-.
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "E-", "E", "F", "F#", "G", "G#", "A", "B-", "B",
];

/// A sounding pitch identified by its MIDI key number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub midi: u8,
}

impl Pitch {
    pub fn new(midi: u8) -> Self {
        Self { midi }
    }

    /// Pitch class 0–11 (C=0, C#=1, ...)
    pub fn pitch_class(&self) -> u8 {
        self.midi % 12
    }

    /// Octave number where MIDI 60 is in octave 4.
    pub fn octave(&self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Full pitch name, e.g. `"C#4"`, `"B-3"`, `"C-1"` for MIDI 0.
    pub fn name(&self) -> String {
        format!(
            "{}{}",
            PITCH_CLASS_NAMES[self.pitch_class() as usize],
            self.octave()
        )
    }
}

impl std::fmt::Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<u8> for Pitch {
    fn from(midi: u8) -> Self {
        Self::new(midi)
    }
}
