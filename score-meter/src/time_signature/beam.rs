//! Beam states of contiguous durations, grouped by a beam sequence.
//!
//! Level 1 is the eighth beam, level 2 the sixteenth, and so on. A
//! duration takes part in as many levels as its note type has beams.

use std::fmt::Display;

use fraction::Fraction;
use serde::{Deserialize, Serialize};

use crate::{
    meter::{MeterError, MeterResult, MeterSequence},
    primitives::{fraction_to_f64, Duration, TOLERANCE},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamType {
    Start,
    Continue,
    Stop,
    /// Hook of a beam that has no neighbour at its level.
    Partial(BeamDirection),
}
impl Display for BeamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Continue => write!(f, "continue"),
            Self::Stop => write!(f, "stop"),
            Self::Partial(BeamDirection::Left) => write!(f, "partial-left"),
            Self::Partial(BeamDirection::Right) => write!(f, "partial-right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Beam {
    /// 1 for the eighth beam.
    pub number: usize,
    pub kind: BeamType,
}
impl Beam {
    pub fn new(number: usize, kind: BeamType) -> Self {
        Self { number, kind }
    }
}

/// Beams of one duration, ordered by level.
pub type Beams = Vec<Beam>;

/// Duration placed in the bar.
struct Slot {
    beam_count: usize,
    address: Vec<usize>,
}
impl Slot {
    /// Group of the slot at the beam level, if it is beamed there.
    fn key(&self, level: usize) -> Option<&[usize]> {
        match self.beam_count >= level {
            true => Some(&self.address[..level.min(self.address.len())]),
            false => None,
        }
    }
}

/// Beam every duration, laid one after another from the bar start.
///
/// Durations beamed at a level are grouped, while they share the first
/// `level` indices of the beam sequence address of their start.
pub fn assign_beams(
    beam: &MeterSequence,
    durations: &[Duration],
) -> MeterResult<Vec<Beams>> {
    let bar_duration = beam.quarter_length();
    let mut offset = Fraction::new(0_u64, 1_u64);
    let mut slots = Vec::with_capacity(durations.len());
    for duration in durations {
        let start = fraction_to_f64(offset);
        offset = offset + duration.quarter_length_exact();
        let end = fraction_to_f64(offset);
        if end > bar_duration + TOLERANCE {
            return Err(MeterError::BarOverrun {
                found: end,
                bar_duration,
            });
        }
        let beam_count = duration.beam_count();
        let address = match beam_count {
            0 => Vec::new(),
            _ => beam.position_to_address(start)?,
        };
        slots.push(Slot {
            beam_count,
            address,
        });
    }

    let mut beamed = Vec::with_capacity(slots.len());
    for (index, slot) in slots.iter().enumerate() {
        let mut beams = Beams::new();
        for level in 1..=slot.beam_count {
            let key = slot.key(level);
            let prev_same =
                index > 0 && slots[index - 1].key(level) == key;
            let next_same = slots
                .get(index + 1)
                .map_or(false, |next| next.key(level) == key);
            let kind = match (prev_same, next_same) {
                (false, true) => BeamType::Start,
                (true, true) => BeamType::Continue,
                (true, false) => BeamType::Stop,
                (false, false) => match beams.last() {
                    None => break,
                    Some(Beam {
                        kind: BeamType::Stop,
                        ..
                    }) => BeamType::Partial(BeamDirection::Left),
                    Some(Beam {
                        kind: BeamType::Partial(direction),
                        ..
                    }) => BeamType::Partial(*direction),
                    Some(_) => BeamType::Partial(BeamDirection::Right),
                },
            };
            beams.push(Beam::new(level, kind));
        }
        log::trace!(
            "beams at {:?} ({}): {:?}",
            slot.address,
            durations[index].quarter_length(),
            beams
        );
        beamed.push(beams);
    }
    Ok(beamed)
}
