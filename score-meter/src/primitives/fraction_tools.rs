//! Tools for parsing and summing fractions written in slash notation.
//!
//! Three textual forms are understood:
//! - simple: `"3/8"`
//! - compound: `"3/8+2/8+4/4"`
//! - summed numerator: `"3+2+5/8"`, where bare numerators share the
//!   denominator that follows them.

use fraction::{Fraction, ToPrimitive};
use itertools::Itertools;

use crate::meter::{MeterError, MeterResult};

/// Numerator and denominator of a span. Never reduced implicitly:
/// `(6, 8)` and `(3, 4)` are different ratios of the same length.
pub type Ratio = (u64, u64);

fn format_error(text: &str, reason: impl Into<String>) -> MeterError {
    MeterError::Format {
        text: text.to_string(),
        reason: reason.into(),
    }
}

fn parse_integer(token: &str, text: &str) -> MeterResult<u64> {
    let token = token.trim();
    if token.is_empty() {
        return Err(format_error(text, "empty token"));
    }
    let value = token.parse::<u64>().map_err(|_| {
        format_error(text, format!("`{token}` is not a positive integer"))
    })?;
    match value {
        0 => Err(format_error(text, "zero is not a valid span part")),
        x => Ok(x),
    }
}

/// Parse `"N/D"` into `(N, D)`.
///
/// # Example
/// ```
/// # use score_meter::primitives::slash_to_fraction;
/// assert_eq!(slash_to_fraction("3/8").unwrap(), (3, 8));
/// assert_eq!(slash_to_fraction(" 12 / 16 ").unwrap(), (12, 16));
/// assert!(slash_to_fraction("3").is_err());
/// assert!(slash_to_fraction("3/x").is_err());
/// ```
pub fn slash_to_fraction(text: &str) -> MeterResult<Ratio> {
    let (numerator, denominator) = text
        .split_once('/')
        .ok_or_else(|| format_error(text, "missing `/`"))?;
    Ok((
        parse_integer(numerator, text)?,
        parse_integer(denominator, text)?,
    ))
}

/// Parse `"N1/D1+N2/D2+…"`, every segment must be a full `N/D`.
pub fn slash_compound_to_fraction(text: &str) -> MeterResult<Vec<Ratio>> {
    text.split('+').map(slash_to_fraction).collect()
}

/// Parse slash notation with summed numerators.
///
/// Bare numerators are accumulated until a token with a denominator
/// appears, which is then applied to all of them.
///
/// # Returns
/// Ratios in the written order, and whether any numerators were summed.
///
/// # Example
/// ```
/// # use score_meter::primitives::slash_mixed_to_fraction;
/// assert_eq!(
///     slash_mixed_to_fraction("3+2+5/8").unwrap(),
///     (vec![(3, 8), (2, 8), (5, 8)], true)
/// );
/// assert_eq!(
///     slash_mixed_to_fraction("3/8+2+3/4").unwrap(),
///     (vec![(3, 8), (2, 4), (3, 4)], true)
/// );
/// assert!(slash_mixed_to_fraction("3+2+5/8+3/4+2+1+4").is_err());
/// ```
pub fn slash_mixed_to_fraction(text: &str) -> MeterResult<(Vec<Ratio>, bool)> {
    let mut pending: Vec<u64> = Vec::new();
    let mut ratios = Vec::new();
    let mut summed = false;
    for token in text.split('+') {
        if token.contains('/') {
            let (numerator, denominator) = slash_to_fraction(token)?;
            if !pending.is_empty() {
                summed = true;
                ratios.extend(pending.drain(..).map(|n| (n, denominator)));
            }
            ratios.push((numerator, denominator));
        } else {
            pending.push(parse_integer(token, text)?);
        }
    }
    if !pending.is_empty() {
        return Err(format_error(
            text,
            "cannot match denominator to numerator",
        ));
    }
    Ok((ratios, summed))
}

pub(crate) fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// `None` if the multiple does not fit into 64 bits.
pub(crate) fn lcm(a: u64, b: u64) -> Option<u64> {
    (a / gcd(a, b)).checked_mul(b)
}

/// Sum ratios over the least common multiple of their denominators,
/// without reducing the result.
///
/// `[(3, 8), (3, 8)]` gives `(6, 8)`, `[(5, 8), (4, 4)]` gives `(13, 8)`.
/// Fails, if a denominator is zero or the sum does not fit into 64 bits.
pub fn common_denominator_sum(values: &[Ratio]) -> MeterResult<Ratio> {
    let text = values.iter().map(|(n, d)| format!("{n}/{d}")).join("+");
    if values.iter().any(|(_, d)| *d == 0) {
        return Err(format_error(&text, "zero denominator"));
    }
    let too_long = || format_error(&text, "sum does not fit into 64 bits");
    let denominator = values
        .iter()
        .try_fold(1, |acc, (_, d)| lcm(acc, *d))
        .ok_or_else(too_long)?;
    let numerator = values
        .iter()
        .try_fold(0_u64, |acc, (n, d)| {
            n.checked_mul(denominator / d)?.checked_add(acc)
        })
        .ok_or_else(too_long)?;
    Ok((numerator, denominator))
}

/// Reduce a list of ratios to their sum in lowest terms.
///
/// # Example
/// ```
/// # use score_meter::primitives::fraction_sum;
/// assert_eq!(fraction_sum(&[(3, 8), (5, 8), (1, 8)]), Ok((9, 8)));
/// assert_eq!(fraction_sum(&[(1, 13), (2, 17)]), Ok((43, 221)));
/// assert!(fraction_sum(&[(1, 4294967311), (1, 4294967291)]).is_err());
/// ```
pub fn fraction_sum(values: &[Ratio]) -> MeterResult<Ratio> {
    let (numerator, denominator) = common_denominator_sum(values)?;
    let divisor = gcd(numerator, denominator);
    Ok((numerator / divisor, denominator / divisor))
}

/// Reject spans, whose length in quarters does not fit into 64 bits.
///
/// Every ratio of the meter tree passes it, so [ratio_to_quarters]
/// never overflows on them.
pub(crate) fn check_span(ratio: Ratio) -> MeterResult<Ratio> {
    match ratio.0.checked_mul(4) {
        Some(_) => Ok(ratio),
        None => Err(format_error(
            &format!("{}/{}", ratio.0, ratio.1),
            "span does not fit into 64 bits",
        )),
    }
}

/// Compact contiguous ratios with equal denominators into summed
/// numerator strings.
///
/// # Example
/// ```
/// # use score_meter::primitives::fraction_to_slash_mixed;
/// assert_eq!(
///     fraction_to_slash_mixed(&[(3, 8), (2, 8), (5, 8), (3, 4)]),
///     vec![("3+2+5".to_string(), 8), ("3".to_string(), 4)]
/// );
/// ```
pub fn fraction_to_slash_mixed(values: &[Ratio]) -> Vec<(String, u64)> {
    let mut mixed = Vec::new();
    let grouped = values.iter().group_by(|(_, denominator)| *denominator);
    for (denominator, group) in &grouped {
        mixed.push((group.map(|(n, _)| n).join("+"), denominator));
    }
    mixed
}

pub fn ratio_to_fraction(ratio: Ratio) -> Fraction {
    Fraction::new(ratio.0, ratio.1)
}

/// Length of a checked ratio in quarter notes, exact.
pub(crate) fn ratio_to_quarters(ratio: Ratio) -> Fraction {
    Fraction::new(ratio.0 * 4, ratio.1)
}

pub fn fraction_to_f64(value: Fraction) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use fraction::Fraction;

    use super::{
        check_span, common_denominator_sum, fraction_sum, fraction_to_f64,
        fraction_to_slash_mixed, ratio_to_quarters, slash_compound_to_fraction,
        slash_mixed_to_fraction, slash_to_fraction,
    };
    use crate::meter::MeterError;

    #[test]
    fn test_slash_round_trip() {
        for numerator in 1..=16_u64 {
            for denominator in [1_u64, 2, 3, 4, 8, 16, 32, 64, 128] {
                let text = format!("{numerator}/{denominator}");
                assert_eq!(
                    slash_to_fraction(&text).unwrap(),
                    (numerator, denominator)
                );
            }
        }
    }

    #[test]
    fn test_slash_malformed() {
        for text in ["", "3", "/4", "3/", "a/4", "3/4/", "0/4", "3/0", "-3/4"]
        {
            assert!(
                matches!(
                    slash_to_fraction(text),
                    Err(MeterError::Format { .. })
                ),
                "`{text}` should not parse"
            );
        }
    }

    #[test]
    fn test_compound() {
        assert_eq!(
            slash_compound_to_fraction("5/8+4/4").unwrap(),
            vec![(5, 8), (4, 4)]
        );
        assert!(slash_compound_to_fraction("3+2/8").is_err());
    }

    #[test]
    fn test_mixed() {
        assert_eq!(
            slash_mixed_to_fraction("3/4").unwrap(),
            (vec![(3, 4)], false)
        );
        assert_eq!(
            slash_mixed_to_fraction("5/8+4/4").unwrap(),
            (vec![(5, 8), (4, 4)], false)
        );
        assert_eq!(
            slash_mixed_to_fraction("3+2+5/8+3/4").unwrap(),
            (vec![(3, 8), (2, 8), (5, 8), (3, 4)], true)
        );
        assert_eq!(
            slash_mixed_to_fraction("3+2+5/8+3/4+2+1+4"),
            Err(MeterError::Format {
                text: "3+2+5/8+3/4+2+1+4".to_string(),
                reason: "cannot match denominator to numerator".to_string()
            })
        );
        assert!(slash_mixed_to_fraction("3++2/8").is_err());
    }

    #[test]
    fn test_sums() {
        assert_eq!(fraction_sum(&[(3, 8), (5, 8), (1, 8)]), Ok((9, 8)));
        assert_eq!(fraction_sum(&[(1, 13), (2, 17)]), Ok((43, 221)));
        assert_eq!(fraction_sum(&[(2, 8), (2, 8)]), Ok((1, 2)));
        assert_eq!(fraction_sum(&[]), Ok((0, 1)));
        assert_eq!(common_denominator_sum(&[(3, 8), (3, 8)]), Ok((6, 8)));
        assert_eq!(common_denominator_sum(&[(5, 8), (4, 4)]), Ok((13, 8)));
    }

    #[test]
    fn test_sums_out_of_range() {
        // both primes, their product exceeds u64::MAX
        assert!(matches!(
            common_denominator_sum(&[(1, 4294967311), (1, 4294967291)]),
            Err(MeterError::Format { .. })
        ));
        assert!(matches!(
            fraction_sum(&[(u64::MAX, 8), (1, 8)]),
            Err(MeterError::Format { .. })
        ));
        assert!(matches!(
            fraction_sum(&[(u64::MAX / 2 + 1, 4), (1, 8)]),
            Err(MeterError::Format { .. })
        ));
        assert_eq!(
            fraction_sum(&[(u64::MAX - 1, 8), (1, 8)]),
            Ok((u64::MAX, 8))
        );
    }

    #[test]
    fn test_span_range() {
        assert_eq!(check_span((1 << 61, 1)), Ok((1 << 61, 1)));
        assert!(matches!(
            check_span((1 << 62, 1)),
            Err(MeterError::Format { .. })
        ));
        assert_eq!(ratio_to_quarters((3, 8)), Fraction::new(3_u64, 2_u64));
    }

    #[test]
    fn test_slash_mixed_groups_only_contiguous_runs() {
        assert_eq!(
            fraction_to_slash_mixed(&[(3, 8), (1, 4), (2, 8)]),
            vec![
                ("3".to_string(), 8),
                ("1".to_string(), 4),
                ("2".to_string(), 8)
            ]
        );
        assert!(fraction_to_slash_mixed(&[]).is_empty());
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(fraction_to_f64(Fraction::new(3_u64, 8_u64)), 0.375);
        assert_eq!(fraction_to_f64(-Fraction::new(1_u64, 2_u64)), -0.5);
    }
}
