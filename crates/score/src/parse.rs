use midly::{MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::event::Instrument;

/// General MIDI percussion channel (channel 10, zero-based 9).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Ticks per quarter assumed for SMPTE-timed files.
const TIMECODE_FALLBACK_PPQ: u16 = 480;

/// A single MIDI note with absolute tick timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedNote {
    pub onset_tick: u64,
    pub offset_tick: u64,
    pub pitch: u8,
    pub channel: u8,
}

/// Tempo or meter change at an absolute tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimedMeta {
    Tempo {
        tick: u64,
        microseconds_per_beat: u32,
    },
    TimeSignature {
        tick: u64,
        numerator: u8,
        denominator: u8,
    },
}

impl TimedMeta {
    pub fn tick(&self) -> u64 {
        match self {
            TimedMeta::Tempo { tick, .. } | TimedMeta::TimeSignature { tick, .. } => *tick,
        }
    }
}

/// Everything the score model needs from one MIDI track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub index: usize,
    pub name: Option<String>,
    pub instrument_name: Option<String>,
    pub program: Option<u8>,
    /// Sorted by onset, then pitch
    pub notes: Vec<TimedNote>,
    pub meta: Vec<TimedMeta>,
    pub end_tick: u64,
}

impl Track {
    /// The instrument this track declares, if it plays notes and names one.
    ///
    /// A track declares an instrument through a program change, an
    /// instrument-name or track-name meta event, or by playing on the
    /// percussion channel.
    pub fn instrument(&self) -> Option<Instrument> {
        if self.notes.is_empty() {
            return None;
        }

        let percussion = self.notes.iter().any(|n| n.channel == PERCUSSION_CHANNEL);
        let name = self.instrument_name.clone().or_else(|| self.name.clone());

        if name.is_none() && self.program.is_none() && !percussion {
            return None;
        }

        Some(Instrument {
            name,
            program: self.program,
            channel: self.notes.iter().map(|n| n.channel).min().unwrap_or(0),
            percussion,
        })
    }
}

/// Ticks per quarter note from the file header.
pub fn ticks_per_quarter(smf: &Smf) -> u16 {
    match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => TIMECODE_FALLBACK_PPQ,
    }
}

fn meta_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Walk one track, pairing note-on/note-off events into timed notes.
pub fn scan_track(index: usize, events: &[TrackEvent]) -> Track {
    let mut track = Track {
        index,
        ..Default::default()
    };
    let mut current_tick: u64 = 0;
    // Map (channel, pitch) → onset ticks, stacked for overlapping repeats
    let mut pending: HashMap<(u8, u8), Vec<u64>> = HashMap::new();

    for event in events {
        current_tick += event.delta.as_int() as u64;

        match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                track.meta.push(TimedMeta::Tempo {
                    tick: current_tick,
                    microseconds_per_beat: tempo.as_int(),
                });
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                track.meta.push(TimedMeta::TimeSignature {
                    tick: current_tick,
                    numerator: num,
                    denominator: 1u8.checked_shl(denom_pow as u32).unwrap_or(0),
                });
            }
            TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                if track.name.is_none() {
                    track.name = meta_text(bytes);
                }
            }
            TrackEventKind::Meta(MetaMessage::InstrumentName(bytes)) => {
                if track.instrument_name.is_none() {
                    track.instrument_name = meta_text(bytes);
                }
            }
            TrackEventKind::Midi { channel, message } => {
                let ch = channel.as_int();
                match message {
                    MidiMessage::ProgramChange { program } => {
                        if track.program.is_none() {
                            track.program = Some(program.as_int());
                        }
                    }
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        pending
                            .entry((ch, key.as_int()))
                            .or_default()
                            .push(current_tick);
                    }
                    MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                        // vel=0 NoteOn is NoteOff
                        let key = (ch, key.as_int());
                        if let Some(onset) = pending.get_mut(&key).and_then(|stack| stack.pop()) {
                            track.notes.push(TimedNote {
                                onset_tick: onset,
                                offset_tick: current_tick,
                                pitch: key.1,
                                channel: ch,
                            });
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    // Close any unterminated notes at the track's final tick
    for ((channel, pitch), stack) in pending {
        for onset in stack {
            track.notes.push(TimedNote {
                onset_tick: onset,
                offset_tick: current_tick,
                pitch,
                channel,
            });
        }
    }

    track.end_tick = current_tick;
    track
        .notes
        .sort_by(|a, b| a.onset_tick.cmp(&b.onset_tick).then(a.pitch.cmp(&b.pitch)));
    track
}

/// Scan every track of a parsed file.
pub fn scan_tracks(smf: &Smf) -> Vec<Track> {
    smf.tracks
        .iter()
        .enumerate()
        .map(|(index, events)| scan_track(index, events))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::{Format, Header, Timing};

    fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: vel.into(),
                },
            },
        }
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0.into(),
                },
            },
        }
    }

    #[test]
    fn pairs_note_on_and_off() {
        let events = vec![note_on(0, 60, 90), note_off(480, 60), note_on(0, 62, 90), note_off(240, 62)];
        let track = scan_track(0, &events);

        assert_eq!(track.notes.len(), 2);
        assert_eq!(track.notes[0].onset_tick, 0);
        assert_eq!(track.notes[0].offset_tick, 480);
        assert_eq!(track.notes[1].pitch, 62);
        assert_eq!(track.notes[1].offset_tick, 720);
        assert_eq!(track.end_tick, 720);
    }

    #[test]
    fn zero_velocity_note_on_ends_note() {
        let events = vec![note_on(0, 64, 80), note_on(480, 64, 0)];
        let track = scan_track(0, &events);

        assert_eq!(track.notes.len(), 1);
        assert_eq!(track.notes[0].offset_tick, 480);
    }

    #[test]
    fn unterminated_note_closes_at_track_end() {
        let events = vec![note_on(0, 67, 80), note_on(960, 69, 80), note_off(480, 69)];
        let track = scan_track(0, &events);

        let held = track.notes.iter().find(|n| n.pitch == 67).unwrap();
        assert_eq!(held.offset_tick, 1440);
    }

    #[test]
    fn undeclared_track_has_no_instrument() {
        let events = vec![note_on(0, 60, 90), note_off(480, 60)];
        assert!(scan_track(0, &events).instrument().is_none());
    }

    #[test]
    fn program_change_declares_instrument() {
        let events = vec![
            TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::ProgramChange { program: 73.into() },
                },
            },
            note_on(0, 60, 90),
            note_off(480, 60),
        ];
        let instrument = scan_track(0, &events).instrument().unwrap();
        assert_eq!(instrument.program, Some(73));
        assert!(!instrument.percussion);
    }

    #[test]
    fn silent_track_declares_nothing() {
        let events = vec![TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Conductor")),
        }];
        let track = scan_track(0, &events);
        assert_eq!(track.name.as_deref(), Some("Conductor"));
        assert!(track.instrument().is_none());
    }

    #[test]
    fn timecode_files_fall_back_to_default_ppq() {
        let smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Timecode(midly::Fps::Fps25, 40),
        ));
        assert_eq!(ticks_per_quarter(&smf), 480);
    }
}
