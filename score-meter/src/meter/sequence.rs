//! Ordered, possibly nested, partition of a span.
//!
//! # Example
//!
//! ```
//! use score_meter::{MeterSequence, MeterTerminal};
//!
//! let mut sequence = MeterSequence::new("3/4", Some(3)).unwrap();
//! let sixteenths = MeterTerminal::new(1, 4)
//!     .unwrap()
//!     .subdivide_by_count(4)
//!     .unwrap();
//! sequence.set(1, sixteenths).unwrap();
//! assert_eq!(
//!     sequence.to_string(),
//!     "{1/4+{1/16+1/16+1/16+1/16}+1/4}"
//! );
//! assert_eq!(sequence.position_to_index(1.5).unwrap(), 1);
//! assert_eq!(sequence.position_to_span(1.5).unwrap(), (1.0, 2.0));
//! assert_eq!(sequence.position_to_address(1.5).unwrap(), vec![1, 2]);
//! assert_eq!(sequence.flat().len(), 6);
//! ```

use std::{fmt::Display, str::FromStr};

use derivative::Derivative;
use fraction::Fraction;
use itertools::Itertools;

use crate::primitives::{
    check_span, common_denominator_sum, fraction_sum, fraction_to_f64,
    fraction_to_slash_mixed, ratio_to_fraction, ratio_to_quarters,
    slash_mixed_to_fraction, Duration, Ratio, TOLERANCE,
};

use super::{
    terminal::divide_by_count, MeterError, MeterNode, MeterResult,
    MeterTerminal, Partition, PartitionItem,
};

/// Children always sum exactly to `numerator/denominator`.
///
/// `summed_numerator` only remembers the `3+2/8` form for display, and
/// is not compared by equality.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct MeterSequence {
    children: Vec<MeterNode>,
    numerator: u64,
    denominator: u64,
    #[derivative(PartialEq = "ignore")]
    summed_numerator: bool,
}
impl MeterSequence {
    /// Parse slash notation, and optionally partition it by count.
    ///
    /// See [MeterSequence::load].
    pub fn new(text: &str, partition_hint: Option<usize>) -> MeterResult<Self> {
        let mut sequence = Self {
            children: Vec::new(),
            numerator: 0,
            denominator: 1,
            summed_numerator: false,
        };
        sequence.load(text, partition_hint)?;
        Ok(sequence)
    }

    /// Sequence of single terminal.
    pub fn from_ratio(numerator: u64, denominator: u64) -> MeterResult<Self> {
        Ok(Self::from(MeterTerminal::new(numerator, denominator)?))
    }

    /// Reset the sequence from slash notation.
    ///
    /// Compound and summed forms (`5/8+4/4`, `3+2/8`) give one terminal
    /// per part and ignore the hint. A single ratio is partitioned by
    /// the hint, if any. Nothing changes on error.
    pub fn load(
        &mut self,
        text: &str,
        partition_hint: Option<usize>,
    ) -> MeterResult<()> {
        let (ratios, summed_numerator) = slash_mixed_to_fraction(text)?;
        let (numerator, denominator) =
            check_span(common_denominator_sum(&ratios)?)?;
        let children = ratios
            .iter()
            .map(|(n, d)| MeterTerminal::new(*n, *d).map(MeterNode::from))
            .collect::<MeterResult<Vec<_>>>()?;
        let mut loaded = Self {
            children,
            numerator,
            denominator,
            summed_numerator,
        };
        loaded.set_weight(1.0);
        match (ratios.len(), partition_hint) {
            (1, Some(count)) => loaded.partition_by_count(count)?,
            (_, Some(count)) => log::debug!(
                "partition hint {count} is ignored for compound `{text}`"
            ),
            _ => (),
        }
        log::debug!("loaded `{text}` as {loaded}");
        *self = loaded;
        Ok(())
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }
    pub fn denominator(&self) -> u64 {
        self.denominator
    }
    pub fn ratio(&self) -> Ratio {
        (self.numerator, self.denominator)
    }
    pub fn summed_numerator(&self) -> bool {
        self.summed_numerator
    }
    pub fn duration(&self) -> Duration {
        Duration::from_ratio(self.ratio())
    }
    pub fn quarter_length(&self) -> f64 {
        fraction_to_f64(self.quarter_length_exact())
    }
    pub fn quarter_length_exact(&self) -> Fraction {
        ratio_to_quarters(self.ratio())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&MeterNode> {
        self.children.get(index)
    }
    pub fn iter(&self) -> std::slice::Iter<'_, MeterNode> {
        self.children.iter()
    }

    /// Replace one child by a node of exactly the same span.
    pub fn set(
        &mut self,
        index: usize,
        node: impl Into<MeterNode>,
    ) -> MeterResult<()> {
        let node = node.into();
        let len = self.len();
        let current = self
            .children
            .get_mut(index)
            .ok_or(MeterError::Index { index, len })?;
        if ratio_to_fraction(current.ratio()) != ratio_to_fraction(node.ratio())
        {
            return Err(MeterError::SpanMismatch {
                expected: current.to_string(),
                found: node.to_string(),
            });
        }
        *current = node;
        Ok(())
    }

    /// Levels of nesting: 1 for a flat sequence.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Sum of the children weights.
    pub fn weight(&self) -> f64 {
        self.children.iter().map(|c| c.weight()).sum()
    }
    /// Spread the weight evenly across children, recursively.
    pub fn set_weight(&mut self, weight: f64) {
        if self.is_empty() {
            return;
        }
        let part = weight / self.len() as f64;
        self.children
            .iter_mut()
            .for_each(|child| child.set_weight(part));
    }

    /// Dispatch to the matching `partition_by_*` method.
    pub fn partition(
        &mut self,
        partition: impl Into<Partition>,
    ) -> MeterResult<()> {
        match partition.into() {
            Partition::Count(count) => self.partition_by_count(count),
            Partition::List(items) => self.partition_by_list(items),
            Partition::Other(other) => self.partition_by_other(&other),
        }
    }

    /// Replace children by `count` (nearly) equal terminals.
    ///
    /// Irregular numerators give the longer parts last: `5/8` by 2 is
    /// `{2/8+3/8}`.
    pub fn partition_by_count(&mut self, count: usize) -> MeterResult<()> {
        self.replace_with_ratios(divide_by_count(self.ratio(), count)?)?;
        log::debug!("partitioned by count {count}: {self}");
        Ok(())
    }

    /// Replace children by the given parts.
    ///
    /// Bare numerators are taken over the sequence denominator. Parts
    /// have to sum exactly to the sequence span.
    pub fn partition_by_list(
        &mut self,
        items: Vec<PartitionItem>,
    ) -> MeterResult<()> {
        if items.is_empty() {
            return Err(MeterError::Partition("an empty list".to_string()));
        }
        let children = items
            .into_iter()
            .map(|item| self.normalize_item(item))
            .collect::<MeterResult<Vec<_>>>()?;
        let ratios = children.iter().map(|c| c.ratio()).collect::<Vec<_>>();
        let (sum_n, sum_d) = fraction_sum(&ratios).map_err(|_| {
            MeterError::Partition(format!(
                "[{}]: sum does not fit into 64 bits",
                children.iter().join(", ")
            ))
        })?;
        if (sum_n, sum_d) != fraction_sum(&[self.ratio()])? {
            return Err(MeterError::Partition(format!(
                "[{}]: sums to {sum_n}/{sum_d}, not to {}/{}",
                children.iter().join(", "),
                self.numerator,
                self.denominator
            )));
        }
        self.replace_partition(children)?;
        log::debug!("partitioned by list: {self}");
        Ok(())
    }

    /// Copy the whole shape of another sequence with the same span.
    pub fn partition_by_other(&mut self, other: &Self) -> MeterResult<()> {
        let span = fraction_sum(&[self.ratio()])?;
        if span != fraction_sum(&[other.ratio()])? {
            return Err(MeterError::SpanMismatch {
                expected: format!("{}/{}", self.numerator, self.denominator),
                found: format!("{}/{}", other.numerator, other.denominator),
            });
        }
        self.replace_children(other.children.clone())?;
        log::debug!("partitioned by other: {self}");
        Ok(())
    }

    /// Partitioned copy of the sequence.
    pub fn subdivide(
        &self,
        partition: impl Into<Partition>,
    ) -> MeterResult<Self> {
        let mut sequence = self.clone();
        sequence.partition(partition)?;
        Ok(sequence)
    }

    /// Subdivide every top-level terminal.
    ///
    /// Without explicit divisions, power-of-two numerators are split in
    /// 2, multiples of three in 3, and others in single units.
    /// Nested sequences are kept as is.
    pub fn subdivide_partitions_equal(
        &mut self,
        divisions: Option<usize>,
    ) -> MeterResult<()> {
        let children = self
            .children
            .iter()
            .map(|child| match child {
                MeterNode::Terminal(terminal) => {
                    match divisions
                        .unwrap_or_else(|| default_division(terminal.numerator()))
                    {
                        1 => Ok(child.clone()),
                        count => terminal
                            .subdivide_by_count(count)
                            .map(MeterNode::from),
                    }
                }
                MeterNode::Sequence(_) => Ok(child.clone()),
            })
            .collect::<MeterResult<Vec<_>>>()?;
        self.replace_children(children)
    }

    /// True if all top-level children have the same ratio.
    pub fn is_uniform_partition(&self) -> bool {
        self.children.iter().map(|c| c.ratio()).all_equal()
    }

    /// Index of the top-level child at quarter-length offset.
    pub fn position_to_index(&self, position: f64) -> MeterResult<usize> {
        Ok(self.locate(position)?.0)
    }

    /// `(start, end)` of the top-level child at quarter-length offset.
    pub fn position_to_span(&self, position: f64) -> MeterResult<(f64, f64)> {
        Ok(self.locate(position)?.1)
    }

    /// Indices leading to the deepest terminal at quarter-length offset.
    ///
    /// The length of the address is the nesting depth at the position.
    pub fn position_to_address(
        &self,
        position: f64,
    ) -> MeterResult<Vec<usize>> {
        let (index, (start, _)) = self.locate(position)?;
        let mut address = vec![index];
        if let MeterNode::Sequence(child) = &self.children[index] {
            address.extend(
                child.position_to_address((position - start).max(0.0))?,
            );
        }
        Ok(address)
    }

    /// Deepest terminal at quarter-length offset.
    pub fn position_to_terminal(
        &self,
        position: f64,
    ) -> MeterResult<&MeterTerminal> {
        let (index, (start, _)) = self.locate(position)?;
        match &self.children[index] {
            MeterNode::Terminal(terminal) => Ok(terminal),
            MeterNode::Sequence(child) => {
                child.position_to_terminal((position - start).max(0.0))
            }
        }
    }

    pub fn position_to_weight(&self, position: f64) -> MeterResult<f64> {
        Ok(self.position_to_terminal(position)?.weight())
    }

    /// Flat sequence of the partition found `depth` levels down.
    ///
    /// At depth 0 every top-level child is merged into one terminal.
    /// Deeper, nested sequences are replaced by their own level of
    /// `depth - 1`. Terminals stay where they are.
    pub fn get_level(&self, depth: usize) -> Self {
        Self {
            children: self
                .level_terminals(depth)
                .into_iter()
                .map(MeterNode::from)
                .collect(),
            numerator: self.numerator,
            denominator: self.denominator,
            summed_numerator: false,
        }
    }

    /// `(start, end)` of every part of [MeterSequence::get_level].
    pub fn get_level_span(&self, depth: usize) -> Vec<(f64, f64)> {
        self.get_level(depth).child_spans()
    }

    /// All terminals, in order, without nesting.
    pub fn flat(&self) -> Self {
        let mut terminals = Vec::new();
        self.children
            .iter()
            .for_each(|child| child.flatten_into(&mut terminals));
        Self {
            children: terminals.into_iter().map(MeterNode::from).collect(),
            numerator: self.numerator,
            denominator: self.denominator,
            summed_numerator: false,
        }
    }

    pub fn flat_weight(&self) -> Vec<f64> {
        self.flat().iter().map(|t| t.weight()).collect()
    }

    /// Assign weights to terminals in the [MeterSequence::flat] order.
    pub fn set_flat_weight(&mut self, weights: &[f64]) -> MeterResult<()> {
        let expected = self.flat().len();
        if weights.len() != expected {
            return Err(MeterError::WeightCount {
                expected,
                found: weights.len(),
            });
        }
        self.apply_flat_weights(&mut weights.iter());
        Ok(())
    }

    /// Display form: `3/4`, `5/8+4/4` or `3+2+5/8`.
    pub fn ratio_string(&self) -> String {
        let ratios = self.children.iter().map(|c| c.ratio()).collect_vec();
        match self.summed_numerator {
            true => fraction_to_slash_mixed(&ratios)
                .into_iter()
                .map(|(numerators, d)| format!("{numerators}/{d}"))
                .join("+"),
            false => ratios.iter().map(|(n, d)| format!("{n}/{d}")).join("+"),
        }
    }

    pub(crate) fn replace_with_ratios(
        &mut self,
        ratios: Vec<Ratio>,
    ) -> MeterResult<()> {
        let children = ratios
            .into_iter()
            .map(|(n, d)| MeterTerminal::new(n, d).map(MeterNode::from))
            .collect::<MeterResult<Vec<_>>>()?;
        self.replace_partition(children)
    }

    /// Replace children, spreading the previous weight over them.
    fn replace_partition(
        &mut self,
        children: Vec<MeterNode>,
    ) -> MeterResult<()> {
        let weight = match self.is_empty() {
            true => 1.0,
            false => self.weight(),
        };
        self.replace_children(children)?;
        self.set_weight(weight);
        Ok(())
    }

    /// The only place, where children are replaced.
    fn replace_children(&mut self, children: Vec<MeterNode>) -> MeterResult<()> {
        let ratios = children.iter().map(|c| c.ratio()).collect_vec();
        let sum = fraction_sum(&ratios);
        if children.is_empty()
            || sum.is_err()
            || sum.ok() != fraction_sum(&[self.ratio()]).ok()
        {
            return Err(MeterError::SpanMismatch {
                expected: format!("{}/{}", self.numerator, self.denominator),
                found: format!("{{{}}}", children.iter().join("+")),
            });
        }
        self.children = children;
        Ok(())
    }

    fn normalize_item(&self, item: PartitionItem) -> MeterResult<MeterNode> {
        match item {
            PartitionItem::Numerator(numerator) => {
                MeterTerminal::new(numerator, self.denominator)
                    .map(MeterNode::from)
            }
            PartitionItem::Slash(text) => {
                text.parse::<MeterTerminal>().map(MeterNode::from)
            }
            PartitionItem::Node(node) => Ok(node),
        }
    }

    /// Start and end of every child, in quarter lengths.
    fn child_spans(&self) -> Vec<(f64, f64)> {
        let mut start = Fraction::new(0_u64, 1_u64);
        self.children
            .iter()
            .map(|child| {
                let end = start + child.quarter_length_exact();
                let span = (fraction_to_f64(start), fraction_to_f64(end));
                start = end;
                span
            })
            .collect()
    }

    /// Child index and span at the position.
    ///
    /// A position within tolerance of a child end belongs to the next
    /// child.
    fn locate(&self, position: f64) -> MeterResult<(usize, (f64, f64))> {
        let total = self.quarter_length();
        let error = MeterError::Position { position, total };
        if !position.is_finite()
            || position < -TOLERANCE
            || position >= total - TOLERANCE
        {
            return Err(error);
        }
        let position = position.max(0.0);
        self.child_spans()
            .into_iter()
            .find_position(|(_, end)| position < end - TOLERANCE)
            .ok_or(error)
    }

    fn level_terminals(&self, depth: usize) -> Vec<MeterTerminal> {
        self.children
            .iter()
            .flat_map(|child| match child {
                MeterNode::Sequence(sequence) if depth > 0 => {
                    sequence.level_terminals(depth - 1)
                }
                node => vec![node.merged()],
            })
            .collect()
    }

    fn apply_flat_weights<'a, I: Iterator<Item = &'a f64>>(
        &mut self,
        weights: &mut I,
    ) {
        for child in self.children.iter_mut() {
            match child {
                MeterNode::Terminal(terminal) => {
                    if let Some(weight) = weights.next() {
                        terminal.set_weight(*weight);
                    }
                }
                MeterNode::Sequence(sequence) => {
                    sequence.apply_flat_weights(weights)
                }
            }
        }
    }
}

fn default_division(numerator: u64) -> usize {
    match numerator {
        n if n.is_power_of_two() => 2,
        n if n % 3 == 0 => 3,
        n => n as usize,
    }
}

impl From<MeterTerminal> for MeterSequence {
    fn from(terminal: MeterTerminal) -> Self {
        Self {
            numerator: terminal.numerator(),
            denominator: terminal.denominator(),
            children: vec![MeterNode::from(terminal)],
            summed_numerator: false,
        }
    }
}
impl FromStr for MeterSequence {
    type Err = MeterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s, None)
    }
}
impl Display for MeterSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.children.iter().join("+"))
    }
}
