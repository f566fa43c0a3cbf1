//! Arguments accepted by [MeterSequence::partition].

use super::{MeterNode, MeterSequence, MeterTerminal};

/// Shape of a requested partition.
#[derive(Debug, Clone, PartialEq)]
pub enum Partition {
    /// Amount of (nearly) equal parts.
    Count(usize),
    /// Explicit parts, which have to sum up to the partitioned span.
    List(Vec<PartitionItem>),
    /// Copy the shape of another sequence with equal span.
    Other(MeterSequence),
}

/// Single part of [Partition::List].
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionItem {
    /// Numerator over the denominator of the partitioned sequence.
    Numerator(u64),
    /// `"N/D"` string.
    Slash(String),
    /// Ready node, kept with its own nesting.
    Node(MeterNode),
}

impl From<usize> for Partition {
    fn from(value: usize) -> Self {
        Self::Count(value)
    }
}
impl<T: Into<PartitionItem>> From<Vec<T>> for Partition {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(|item| item.into()).collect())
    }
}
impl From<MeterSequence> for Partition {
    fn from(value: MeterSequence) -> Self {
        Self::Other(value)
    }
}
impl From<&MeterSequence> for Partition {
    fn from(value: &MeterSequence) -> Self {
        Self::Other(value.clone())
    }
}

impl From<u64> for PartitionItem {
    fn from(value: u64) -> Self {
        Self::Numerator(value)
    }
}
impl From<&str> for PartitionItem {
    fn from(value: &str) -> Self {
        Self::Slash(value.to_string())
    }
}
impl From<String> for PartitionItem {
    fn from(value: String) -> Self {
        Self::Slash(value)
    }
}
impl From<MeterNode> for PartitionItem {
    fn from(value: MeterNode) -> Self {
        Self::Node(value)
    }
}
impl From<MeterTerminal> for PartitionItem {
    fn from(value: MeterTerminal) -> Self {
        Self::Node(MeterNode::Terminal(value))
    }
}
impl From<MeterSequence> for PartitionItem {
    fn from(value: MeterSequence) -> Self {
        Self::Node(MeterNode::Sequence(value))
    }
}
