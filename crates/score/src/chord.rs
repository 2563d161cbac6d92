use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;

/// Two or more distinct pitches sounding from the same onset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    /// Distinct pitches, ascending by MIDI key
    pub pitches: Vec<Pitch>,
    /// Onset in quarter notes from the start of the score
    pub offset: f64,
    /// Length in quarter notes (longest member)
    pub duration: f64,
}

impl Chord {
    pub fn new(mut pitches: Vec<Pitch>, offset: f64, duration: f64) -> Self {
        pitches.sort_unstable();
        pitches.dedup();
        Self {
            pitches,
            offset,
            duration,
        }
    }

    /// Pitch classes present in the chord, ascending, without duplicates.
    pub fn pitch_classes(&self) -> Vec<u8> {
        let mut pcs: Vec<u8> = self.pitches.iter().map(Pitch::pitch_class).collect();
        pcs.sort_unstable();
        pcs.dedup();
        pcs
    }

    /// Pitch classes in normal order (see [`normal_order`]).
    pub fn normal_order(&self) -> Vec<u8> {
        normal_order(&self.pitch_classes())
    }

    /// Normal order transposed so its first member is 0.
    ///
    /// Any major triad yields `[0, 4, 7]` regardless of root, octave or
    /// inversion.
    pub fn normal_order_offsets(&self) -> Vec<u8> {
        let order = self.normal_order();
        match order.first() {
            Some(&first) => order.iter().map(|&pc| interval(first, pc)).collect(),
            None => Vec::new(),
        }
    }
}

/// Ascending interval in semitones from `from` to `to`, modulo the octave.
fn interval(from: u8, to: u8) -> u8 {
    (to + 12 - from) % 12
}

/// Normal order of a pitch-class set.
///
/// Picks the rotation of the sorted set with the smallest outer interval.
/// Ties go to the rotation whose intervals from the first member are
/// smallest when read from the right (last member inward), then to the
/// lowest starting pitch class.
pub fn normal_order(pitch_classes: &[u8]) -> Vec<u8> {
    let mut pcs: Vec<u8> = pitch_classes.iter().map(|pc| pc % 12).collect();
    pcs.sort_unstable();
    pcs.dedup();

    let n = pcs.len();
    if n <= 1 {
        return pcs;
    }

    let rotation = |start: usize| -> Vec<u8> { (0..n).map(|i| pcs[(start + i) % n]).collect() };

    let packing = |rot: &[u8]| -> (Vec<u8>, u8) {
        let first = rot[0];
        let from_right: Vec<u8> = rot[1..].iter().rev().map(|&pc| interval(first, pc)).collect();
        (from_right, first)
    };

    let best = (0..n)
        .min_by_key(|&start| packing(&rotation(start)))
        .unwrap_or(0);

    rotation(best)
}
