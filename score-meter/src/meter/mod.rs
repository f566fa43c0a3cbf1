//! Meter tree: [MeterTerminal] leaves grouped by (nested)
//! [MeterSequence]s.
//!
//! Every node spans `numerator/denominator` whole notes. A sequence is
//! one way of partitioning its span: its children always sum exactly to
//! it, and any re-partition replaces the whole child list.

use std::fmt::Display;

use fraction::Fraction;

use crate::primitives::{ratio_to_quarters, Duration, Ratio};

pub mod partition;
pub mod sequence;
pub mod terminal;

pub use partition::{Partition, PartitionItem};
pub use sequence::MeterSequence;
pub use terminal::MeterTerminal;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeterError {
    #[error("Malformed meter string `{text}`: {reason}")]
    Format { text: String, reason: String },
    #[error("Cannot set partition by {0}")]
    Partition(String),
    #[error("Position {position} is out of range [0, {total})")]
    Position { position: f64, total: f64 },
    #[error("Spans do not match: expected {expected}, got {found}")]
    SpanMismatch { expected: String, found: String },
    #[error("Durations overrun the bar: {found} > {bar_duration}")]
    BarOverrun { found: f64, bar_duration: f64 },
    #[error("Irregular meter: {0}")]
    Irregular(String),
    #[error("No part at index {index}, sequence has {len}")]
    Index { index: usize, len: usize },
    #[error("Expected {expected} weights, got {found}")]
    WeightCount { expected: usize, found: usize },
}
pub type MeterResult<T> = Result<T, MeterError>;

/// Either a leaf or a nested sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum MeterNode {
    Terminal(MeterTerminal),
    Sequence(MeterSequence),
}
impl MeterNode {
    pub fn numerator(&self) -> u64 {
        match self {
            Self::Terminal(t) => t.numerator(),
            Self::Sequence(s) => s.numerator(),
        }
    }
    pub fn denominator(&self) -> u64 {
        match self {
            Self::Terminal(t) => t.denominator(),
            Self::Sequence(s) => s.denominator(),
        }
    }
    pub fn ratio(&self) -> Ratio {
        (self.numerator(), self.denominator())
    }
    pub fn quarter_length(&self) -> f64 {
        self.duration().quarter_length()
    }
    pub fn quarter_length_exact(&self) -> Fraction {
        ratio_to_quarters(self.ratio())
    }
    pub fn duration(&self) -> Duration {
        match self {
            Self::Terminal(t) => t.duration().clone(),
            Self::Sequence(s) => s.duration(),
        }
    }
    pub fn weight(&self) -> f64 {
        match self {
            Self::Terminal(t) => t.weight(),
            Self::Sequence(s) => s.weight(),
        }
    }
    pub fn set_weight(&mut self, weight: f64) {
        match self {
            Self::Terminal(t) => t.set_weight(weight),
            Self::Sequence(s) => s.set_weight(weight),
        }
    }
    /// Levels of nesting below this node. Zero for a terminal.
    pub fn depth(&self) -> usize {
        match self {
            Self::Terminal(_) => 0,
            Self::Sequence(s) => s.depth(),
        }
    }
    /// Split the node's span into a new sequence.
    pub fn subdivide(
        &self,
        partition: impl Into<Partition>,
    ) -> MeterResult<MeterSequence> {
        match self {
            Self::Terminal(t) => t.subdivide(partition),
            Self::Sequence(s) => s.subdivide(partition),
        }
    }
    pub fn as_terminal(&self) -> Option<&MeterTerminal> {
        match self {
            Self::Terminal(t) => Some(t),
            Self::Sequence(_) => None,
        }
    }
    pub fn as_sequence(&self) -> Option<&MeterSequence> {
        match self {
            Self::Terminal(_) => None,
            Self::Sequence(s) => Some(s),
        }
    }
    /// Collapse the node into one terminal of the same span and weight.
    pub(crate) fn merged(&self) -> MeterTerminal {
        match self {
            Self::Terminal(t) => t.clone(),
            Self::Sequence(s) => {
                MeterTerminal::from_parts(s.ratio(), s.weight())
            }
        }
    }
    pub(crate) fn flatten_into(&self, terminals: &mut Vec<MeterTerminal>) {
        match self {
            Self::Terminal(t) => terminals.push(t.clone()),
            Self::Sequence(s) => s
                .iter()
                .for_each(|child| child.flatten_into(terminals)),
        }
    }
}
impl From<MeterTerminal> for MeterNode {
    fn from(value: MeterTerminal) -> Self {
        Self::Terminal(value)
    }
}
impl From<MeterSequence> for MeterNode {
    fn from(value: MeterSequence) -> Self {
        Self::Sequence(value)
    }
}
impl Display for MeterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal(t) => Display::fmt(t, f),
            Self::Sequence(s) => Display::fmt(s, f),
        }
    }
}
