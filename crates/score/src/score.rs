use midly::Smf;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::chord::Chord;
use crate::event::{Event, Instrument, Meta, Note, Rest};
use crate::parse::{self, TimedMeta, TimedNote, Track};
use crate::pitch::Pitch;
use crate::{Error, Result};

/// One instrument's share of a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub instrument: Option<Instrument>,
    pub events: Vec<Event>,
}

impl Part {
    /// Every event in the part, in temporal order.
    pub fn recurse(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Only the notes and chords.
    pub fn notes(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_note_like())
    }
}

/// Grouping key for instrument partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InstrumentKey {
    Percussion,
    Program(u8),
    Named(String),
    Undeclared,
}

impl InstrumentKey {
    fn of(instrument: Option<&Instrument>) -> Self {
        match instrument {
            None => InstrumentKey::Undeclared,
            Some(i) if i.percussion => InstrumentKey::Percussion,
            Some(Instrument {
                program: Some(p), ..
            }) => InstrumentKey::Program(*p),
            Some(Instrument { name: Some(n), .. }) => InstrumentKey::Named(n.clone()),
            Some(_) => InstrumentKey::Undeclared,
        }
    }
}

/// A parsed score: the tracks of one MIDI file plus its timing resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub ticks_per_quarter: u16,
    pub tracks: Vec<Track>,
}

impl Score {
    /// Parse Standard MIDI File bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;
        Ok(Self::from_smf(&smf))
    }

    /// Read and parse a Standard MIDI File.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_smf(smf: &Smf) -> Self {
        Self {
            ticks_per_quarter: parse::ticks_per_quarter(smf).max(1),
            tracks: parse::scan_tracks(smf),
        }
    }

    /// Total number of sounding notes across all tracks.
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Split the score into one part per declared instrument.
    ///
    /// Parts appear in order of the instrument's first track. Tracks that
    /// share a program (or name, when no program is given) are merged.
    /// Returns `None` when no note-bearing track declares an instrument;
    /// such a score has no separable parts.
    pub fn partition_by_instrument(&self) -> Option<Vec<Part>> {
        let sounding: Vec<&Track> = self.tracks.iter().filter(|t| !t.notes.is_empty()).collect();

        if !sounding.iter().any(|t| t.instrument().is_some()) {
            return None;
        }

        let mut groups: Vec<(InstrumentKey, Option<Instrument>, Vec<&Track>)> = Vec::new();
        for track in sounding {
            let instrument = track.instrument();
            let key = InstrumentKey::of(instrument.as_ref());
            match groups.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, _, tracks)) => tracks.push(track),
                None => groups.push((key, instrument, vec![track])),
            }
        }

        let timing = self.timing_map();
        let parts: Vec<Part> = groups
            .into_iter()
            .map(|(_, instrument, tracks)| {
                let notes = merged_notes(tracks.iter().copied());
                let events =
                    build_events(&notes, &timing, instrument.as_ref(), self.ticks_per_quarter);
                Part { instrument, events }
            })
            .collect();

        debug!(parts = parts.len(), "partitioned score by instrument");
        Some(parts)
    }

    /// All notes and chords of the whole score in temporal order.
    ///
    /// Notes from different tracks that start together are grouped into a
    /// single chord.
    pub fn flat_notes(&self) -> Vec<Event> {
        let notes = merged_notes(self.tracks.iter());
        build_events(&notes, &[], None, self.ticks_per_quarter)
            .into_iter()
            .filter(Event::is_note_like)
            .collect()
    }

    /// Tempo and meter changes from every track, deduplicated.
    fn timing_map(&self) -> Vec<TimedMeta> {
        let mut timing: Vec<TimedMeta> = self
            .tracks
            .iter()
            .flat_map(|t| t.meta.iter().cloned())
            .collect();
        timing.sort_by_key(TimedMeta::tick);
        timing.dedup();
        timing
    }
}

fn merged_notes<'a>(tracks: impl Iterator<Item = &'a Track>) -> Vec<TimedNote> {
    let mut notes: Vec<TimedNote> = tracks.flat_map(|t| t.notes.iter().cloned()).collect();
    notes.sort_by(|a, b| a.onset_tick.cmp(&b.onset_tick).then(a.pitch.cmp(&b.pitch)));
    notes
}

/// Turn timed notes into an ordered event stream.
///
/// Notes sharing an onset become one chord (or a note when they share a
/// single pitch). Gaps where nothing sounds become rests.
fn build_events(
    notes: &[TimedNote],
    timing: &[TimedMeta],
    instrument: Option<&Instrument>,
    ticks_per_quarter: u16,
) -> Vec<Event> {
    let ppq = ticks_per_quarter.max(1) as f64;
    let quarters = |tick: u64| tick as f64 / ppq;

    // (tick, rank, event): metadata sorts ahead of sounding events at a tick
    let mut timeline: Vec<(u64, u8, Event)> = Vec::new();

    if let Some(instrument) = instrument {
        timeline.push((
            0,
            0,
            Event::Meta(Meta::Instrument {
                instrument: instrument.clone(),
            }),
        ));
    }

    for meta in timing {
        let event = match *meta {
            TimedMeta::Tempo {
                tick,
                microseconds_per_beat,
            } => Meta::Tempo {
                offset: quarters(tick),
                bpm: 60_000_000.0 / microseconds_per_beat.max(1) as f64,
            },
            TimedMeta::TimeSignature {
                tick,
                numerator,
                denominator,
            } => Meta::TimeSignature {
                offset: quarters(tick),
                numerator,
                denominator,
            },
        };
        timeline.push((meta.tick(), 1, Event::Meta(event)));
    }

    let mut sounding_until: u64 = 0;
    let mut start = 0;
    while start < notes.len() {
        let onset = notes[start].onset_tick;
        let end = notes[start..]
            .iter()
            .position(|n| n.onset_tick != onset)
            .map_or(notes.len(), |len| start + len);
        let group = &notes[start..end];
        start = end;

        if onset > sounding_until {
            timeline.push((
                sounding_until,
                2,
                Event::Rest(Rest {
                    offset: quarters(sounding_until),
                    duration: quarters(onset - sounding_until),
                }),
            ));
        }

        let release = group.iter().map(|n| n.offset_tick).max().unwrap_or(onset);
        let offset = quarters(onset);
        let duration = quarters(release.saturating_sub(onset));

        let mut pitches: Vec<Pitch> = group.iter().map(|n| Pitch::new(n.pitch)).collect();
        pitches.dedup();

        let event = if pitches.len() == 1 {
            Event::Note(Note {
                pitch: pitches[0],
                offset,
                duration,
            })
        } else {
            Event::Chord(Chord::new(pitches, offset, duration))
        };
        timeline.push((onset, 2, event));

        sounding_until = sounding_until.max(release);
    }

    timeline.sort_by_key(|(tick, rank, _)| (*tick, *rank));
    timeline.into_iter().map(|(_, _, event)| event).collect()
}
