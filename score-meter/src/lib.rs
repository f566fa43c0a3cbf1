//! Hierarchical meter: time signatures as trees of rational spans.
//!
//! A [TimeSignature](time_signature::TimeSignature) keeps four
//! independently partitioned [MeterSequence](meter::MeterSequence)s of
//! equal length: beats, beams, accents and display. Queries resolve a
//! quarter-length offset to a beat number, an accent or a beam group.

pub mod meter;
pub mod primitives;
pub mod time_signature;

pub use meter::{
    MeterError, MeterNode, MeterResult, MeterSequence, MeterTerminal,
    Partition, PartitionItem,
};
pub use primitives::{Duration, DurationType};
pub use time_signature::{
    beam::{Beam, BeamDirection, BeamType, Beams},
    settings::MeterSettings,
    SequenceKind, TimeSignature,
};
