use std::{fmt::Display, ops::Add};

use fraction::Fraction;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::fraction_tools::{fraction_to_f64, ratio_to_quarters, Ratio};

/// Maximum amount of dots a single duration can carry.
pub static MAX_DOTS: u8 = 3;

/// Type of a notated value. `Complex` marks lengths that can not be
/// written as a single (possibly dotted) note.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub enum DurationType {
    Longa,
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    OneHundredTwentyEighth,
    TwoHundredFiftySixth,
    Complex,
}

static UNDOTTED_QUARTERS: Lazy<Vec<(DurationType, Fraction)>> =
    Lazy::new(|| {
        use DurationType::*;
        vec![
            (Longa, Fraction::new(16_u64, 1_u64)),
            (Breve, Fraction::new(8_u64, 1_u64)),
            (Whole, Fraction::new(4_u64, 1_u64)),
            (Half, Fraction::new(2_u64, 1_u64)),
            (Quarter, Fraction::new(1_u64, 1_u64)),
            (Eighth, Fraction::new(1_u64, 2_u64)),
            (Sixteenth, Fraction::new(1_u64, 4_u64)),
            (ThirtySecond, Fraction::new(1_u64, 8_u64)),
            (SixtyFourth, Fraction::new(1_u64, 16_u64)),
            (OneHundredTwentyEighth, Fraction::new(1_u64, 32_u64)),
            (TwoHundredFiftySixth, Fraction::new(1_u64, 64_u64)),
        ]
    });

impl DurationType {
    /// Amount of beams (or flags) a note of this type carries.
    pub fn beam_count(&self) -> usize {
        match self {
            Self::Eighth => 1,
            Self::Sixteenth => 2,
            Self::ThirtySecond => 3,
            Self::SixtyFourth => 4,
            Self::OneHundredTwentyEighth => 5,
            Self::TwoHundredFiftySixth => 6,
            _ => 0,
        }
    }

    /// Undotted length in quarter notes, None for `Complex`.
    pub fn quarter_length(&self) -> Option<Fraction> {
        UNDOTTED_QUARTERS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, quarters)| *quarters)
    }
}

/// Find type and dots of the quarter length.
fn decompose(quarters: Fraction) -> (DurationType, u8) {
    for (kind, base) in UNDOTTED_QUARTERS.iter() {
        for dots in 0..=MAX_DOTS {
            // every dot adds half of the previous addition:
            // base * (2 - 1/2^dots)
            let denominator = 2_u64.pow(dots as u32);
            let scale = Fraction::new(denominator * 2 - 1, denominator);
            if *base * scale == quarters {
                return (*kind, dots);
            }
        }
    }
    (DurationType::Complex, 0)
}

/// Undotted type a tuplet note of this length is written with: the
/// shortest type not shorter than it. A triplet eighth (1/3 quarter) is
/// an eighth, a quintuplet sixteenth (1/5) is a sixteenth.
///
/// None for dyadic lengths, which are not tuplets.
fn tuplet_kind(quarters: Fraction) -> Option<DurationType> {
    if quarters.denom().map_or(true, |d| d.is_power_of_two()) {
        return None;
    }
    UNDOTTED_QUARTERS
        .iter()
        .rev()
        .find(|(_, base)| *base >= quarters)
        .map(|(kind, _)| *kind)
}

/// Length of a meter node or of a note.
///
/// Quarter length is kept exact, type and dots are derived from it.
/// Tuplet lengths are `Complex`, but keep the type they are written
/// with.
#[derive(Debug, Clone, PartialEq)]
pub struct Duration {
    quarters: Fraction,
    kind: DurationType,
    dots: u8,
    tuplet: Option<DurationType>,
}
impl Duration {
    /// Duration of `numerator/denominator` whole notes.
    pub(crate) fn from_ratio(ratio: Ratio) -> Self {
        Self::from(ratio_to_quarters(ratio))
    }
    pub fn quarter_length(&self) -> f64 {
        fraction_to_f64(self.quarters)
    }
    pub fn quarter_length_exact(&self) -> Fraction {
        self.quarters
    }
    pub fn kind(&self) -> DurationType {
        self.kind
    }
    pub fn dots(&self) -> u8 {
        self.dots
    }
    /// False if the length needs ties or tuplets to be notated.
    pub fn is_representable(&self) -> bool {
        self.kind != DurationType::Complex
    }
    /// True for lengths of tuplet notes, like `1/3` quarter.
    pub fn is_tuplet(&self) -> bool {
        self.tuplet.is_some()
    }
    /// Type the note is written with, the tuplet type included.
    pub fn notated_kind(&self) -> DurationType {
        self.tuplet.unwrap_or(self.kind)
    }
    pub fn beam_count(&self) -> usize {
        self.notated_kind().beam_count()
    }
}
impl From<Fraction> for Duration {
    fn from(quarters: Fraction) -> Self {
        let (kind, dots) = decompose(quarters);
        Self {
            quarters,
            kind,
            dots,
            tuplet: match kind {
                DurationType::Complex => tuplet_kind(quarters),
                _ => None,
            },
        }
    }
}
impl From<f64> for Duration {
    fn from(quarters: f64) -> Self {
        Self::from(Fraction::from(quarters))
    }
}
impl Add for Duration {
    fn add(self, rhs: Self) -> Self::Output {
        Self::from(self.quarters + rhs.quarters)
    }
    type Output = Self;
}
impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dots {
            0 => write!(f, "{:?} ({} ql)", self.kind, self.quarters),
            dots => write!(
                f,
                "{:?} {dots} dot(s) ({} ql)",
                self.kind, self.quarters
            ),
        }
    }
}
