//! Building blocks of the meter tree.
//!
//! Spans are written in slash notation and summed with integer
//! arithmetic, while positions are measured in quarter lengths.

pub mod duration;
pub mod fraction_tools;

pub use duration::{Duration, DurationType};
pub use fraction_tools::{
    common_denominator_sum, fraction_sum, fraction_to_f64,
    fraction_to_slash_mixed, ratio_to_fraction, slash_compound_to_fraction,
    slash_mixed_to_fraction, slash_to_fraction, Ratio,
};
pub(crate) use fraction_tools::{check_span, ratio_to_quarters};

/// Upper bound of denominator growth, when splitting spans.
pub static LIMIT_DENOMINATOR: u64 = 128;

/// Tolerance of quarter-length comparisons.
pub static TOLERANCE: f64 = 1e-7;
