use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::pitch::Pitch;

/// A single sounding pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: Pitch,
    /// Onset in quarter notes from the start of the score
    pub offset: f64,
    /// Length in quarter notes
    pub duration: f64,
}

/// Silence between sounding events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    pub offset: f64,
    pub duration: f64,
}

/// An instrument declared by a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Instrument-name or track-name meta text, when present
    pub name: Option<String>,
    /// First program change seen on the track
    pub program: Option<u8>,
    /// Lowest channel the track played notes on
    pub channel: u8,
    /// Notes were played on the General MIDI percussion channel
    pub percussion: bool,
}

impl Instrument {
    /// Display label: the declared name, else the program number.
    pub fn label(&self) -> String {
        match (&self.name, self.program) {
            (Some(name), _) => name.clone(),
            (None, Some(program)) => format!("Program {}", program),
            (None, None) if self.percussion => "Percussion".to_string(),
            (None, None) => "Unknown".to_string(),
        }
    }
}

/// Non-sounding score metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Meta {
    Instrument { instrument: Instrument },
    Tempo { offset: f64, bpm: f64 },
    TimeSignature { offset: f64, numerator: u8, denominator: u8 },
}

/// One element of a score's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Note(Note),
    Chord(Chord),
    Rest(Rest),
    Meta(Meta),
}

impl Event {
    /// Notes and chords are note-like; rests and metadata are not.
    pub fn is_note_like(&self) -> bool {
        matches!(self, Event::Note(_) | Event::Chord(_))
    }

    pub fn offset(&self) -> f64 {
        match self {
            Event::Note(n) => n.offset,
            Event::Chord(c) => c.offset,
            Event::Rest(r) => r.offset,
            Event::Meta(Meta::Instrument { .. }) => 0.0,
            Event::Meta(Meta::Tempo { offset, .. }) => *offset,
            Event::Meta(Meta::TimeSignature { offset, .. }) => *offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_notes_and_chords_are_note_like() {
        let note = Event::Note(Note {
            pitch: Pitch::new(60),
            offset: 0.0,
            duration: 1.0,
        });
        let chord = Event::Chord(Chord::new(vec![Pitch::new(60), Pitch::new(64)], 0.0, 1.0));
        let rest = Event::Rest(Rest {
            offset: 1.0,
            duration: 1.0,
        });
        let tempo = Event::Meta(Meta::Tempo {
            offset: 0.0,
            bpm: 120.0,
        });

        assert!(note.is_note_like());
        assert!(chord.is_note_like());
        assert!(!rest.is_note_like());
        assert!(!tempo.is_note_like());
    }

    #[test]
    fn instrument_label_prefers_name() {
        let named = Instrument {
            name: Some("Violin".into()),
            program: Some(40),
            channel: 0,
            percussion: false,
        };
        assert_eq!(named.label(), "Violin");

        let unnamed = Instrument {
            name: None,
            program: Some(40),
            channel: 0,
            percussion: false,
        };
        assert_eq!(unnamed.label(), "Program 40");
    }
}
