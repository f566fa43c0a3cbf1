//! Atomic span of the meter tree.

use std::{fmt::Display, str::FromStr};

use crate::primitives::{
    check_span, fraction_tools::gcd, slash_to_fraction, Duration, Ratio,
    LIMIT_DENOMINATOR,
};

use super::{MeterError, MeterResult, MeterSequence, Partition};

/// `numerator/denominator` whole notes, with derived duration and an
/// accent weight.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterTerminal {
    numerator: u64,
    denominator: u64,
    weight: f64,
    duration: Duration,
}
impl MeterTerminal {
    /// Both parts have to be positive, and the length in quarters has to
    /// fit into 64 bits.
    pub fn new(numerator: u64, denominator: u64) -> MeterResult<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(MeterError::Format {
                text: format!("{numerator}/{denominator}"),
                reason: "span parts should be positive".to_string(),
            });
        }
        let ratio = check_span((numerator, denominator))?;
        Ok(Self::from_parts(ratio, 1.0))
    }
    pub(crate) fn from_parts(ratio: Ratio, weight: f64) -> Self {
        Self {
            numerator: ratio.0,
            denominator: ratio.1,
            weight,
            duration: Duration::from_ratio(ratio),
        }
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
    pub fn duration(&self) -> &Duration {
        &self.duration
    }
    pub fn quarter_length(&self) -> f64 {
        self.duration.quarter_length()
    }
    pub fn weight(&self) -> f64 {
        self.weight
    }
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Exact match of numerator and denominator: `2/8` is not `1/4`.
    pub fn ratio_equal(&self, other: &Self) -> bool {
        self.ratio() == other.ratio()
    }

    /// Split into `count` parts of (nearly) equal length.
    ///
    /// # Example
    /// ```
    /// # use score_meter::MeterTerminal;
    /// let five_eighth: MeterTerminal = "5/8".parse().unwrap();
    /// let beats = five_eighth.subdivide_by_count(2).unwrap();
    /// assert_eq!(beats.to_string(), "{2/8+3/8}");
    /// let half: MeterTerminal = "1/2".parse().unwrap();
    /// assert_eq!(
    ///     half.subdivide_by_count(4).unwrap().to_string(),
    ///     "{1/8+1/8+1/8+1/8}"
    /// );
    /// ```
    pub fn subdivide_by_count(
        &self,
        count: usize,
    ) -> MeterResult<MeterSequence> {
        let mut sequence = MeterSequence::from(self.clone());
        sequence.partition_by_count(count)?;
        Ok(sequence)
    }

    /// Split into parts proportional to the given weights.
    ///
    /// # Example
    /// ```
    /// # use score_meter::MeterTerminal;
    /// let quarter = MeterTerminal::new(1, 4).unwrap();
    /// assert_eq!(
    ///     quarter.subdivide_by_list(&[1, 1, 2]).unwrap().to_string(),
    ///     "{1/16+1/16+2/16}"
    /// );
    /// ```
    pub fn subdivide_by_list(
        &self,
        proportions: &[u64],
    ) -> MeterResult<MeterSequence> {
        let mut sequence = MeterSequence::from(self.clone());
        sequence
            .replace_with_ratios(divide_by_list(self.ratio(), proportions)?)?;
        Ok(sequence)
    }

    /// Split by any kind of partition, see [MeterSequence::partition].
    pub fn subdivide(
        &self,
        partition: impl Into<Partition>,
    ) -> MeterResult<MeterSequence> {
        let mut sequence = MeterSequence::from(self.clone());
        sequence.partition(partition)?;
        Ok(sequence)
    }
}
impl FromStr for MeterTerminal {
    type Err = MeterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (numerator, denominator) = slash_to_fraction(s)?;
        Self::new(numerator, denominator)
    }
}
impl Display for MeterTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Split the span into `count` ratios.
///
/// Even splits at the given denominator are taken as is. Spans of
/// plain or dotted values (numerator a power of two, or a multiple of
/// three) may also split evenly at a doubled denominator, while the part
/// is a single (maybe dotted) note: `3/4` by 2 gives `3/8+3/8`, `3/8` by
/// 2 gives `3/16+3/16`. Otherwise parts get equal units, and the
/// remainder goes one unit each to the last parts: `5/8` by 2 gives
/// `2/8+3/8`, `7/8` by 2 gives `3/8+4/8`, `7/8` by 3 gives
/// `2/8+2/8+3/8`.
pub(crate) fn divide_by_count(
    ratio: Ratio,
    count: usize,
) -> MeterResult<Vec<Ratio>> {
    let (numerator, denominator) = ratio;
    let parts = count as u64;
    if parts == 0 {
        return Err(MeterError::Partition(format!(
            "zero parts of {numerator}/{denominator}"
        )));
    }
    let refinable = numerator.is_power_of_two() || numerator % 3 == 0;
    let limit = LIMIT_DENOMINATOR.max(denominator.saturating_mul(2));
    let (mut n, mut d) = (numerator, denominator);
    let mut uneven: Option<Ratio> = None;
    loop {
        if uneven.is_none() && n >= parts {
            uneven = Some((n, d));
        }
        if n % parts == 0 {
            let part = (n / parts, d);
            if d == denominator
                || refinable && Duration::from_ratio(part).is_representable()
            {
                return Ok(vec![part; count]);
            }
        }
        // parts stay within the quarter-length range of a span
        if d > limit / 2 || n.checked_mul(8).is_none() {
            break;
        }
        (n, d) = (n * 2, d * 2);
    }
    let (n, d) = uneven.ok_or_else(|| {
        MeterError::Partition(format!(
            "{count} parts of {numerator}/{denominator}: \
            denominator would exceed {limit}"
        ))
    })?;
    let (base, remainder) = (n / parts, n % parts);
    log::debug!(
        "irregular split of {numerator}/{denominator} into {count}: \
        {base}/{d} with remainder {remainder}"
    );
    Ok((0..parts)
        .map(|idx| match idx >= parts - remainder {
            true => (base + 1, d),
            false => (base, d),
        })
        .collect())
}

/// Split the span proportionally, growing the denominator until every
/// part is integral.
pub(crate) fn divide_by_list(
    ratio: Ratio,
    proportions: &[u64],
) -> MeterResult<Vec<Ratio>> {
    let (numerator, denominator) = ratio;
    if proportions.is_empty() || proportions.contains(&0) {
        return Err(MeterError::Partition(format!(
            "proportions {proportions:?}"
        )));
    }
    let out_of_range = || {
        MeterError::Partition(format!(
            "{numerator}/{denominator} by {proportions:?} \
            does not fit into 64 bits"
        ))
    };
    let total = proportions
        .iter()
        .try_fold(0_u64, |acc, p| acc.checked_add(*p))
        .ok_or_else(out_of_range)?;
    let scaled =
        |scale: u64, p: u64| numerator.checked_mul(scale)?.checked_mul(p);
    let fits = |scale: u64| {
        proportions
            .iter()
            .all(|p| scaled(scale, *p).map_or(false, |n| n % total == 0))
    };
    let limit = LIMIT_DENOMINATOR.max(denominator.saturating_mul(2));
    let mut scale = 1;
    while !fits(scale) {
        if denominator.saturating_mul(scale) > limit / 2 {
            scale = total / gcd(numerator, total);
            break;
        }
        scale *= 2;
    }
    let denominator = denominator.checked_mul(scale).ok_or_else(out_of_range)?;
    proportions
        .iter()
        .map(|p| {
            let part = scaled(scale, *p).ok_or_else(out_of_range)? / total;
            match part.checked_mul(4) {
                Some(_) => Ok((part, denominator)),
                None => Err(out_of_range()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{divide_by_count, divide_by_list, MeterTerminal};
    use crate::meter::MeterError;
    use crate::primitives::DurationType;

    #[test]
    fn test_construction() {
        let terminal: MeterTerminal = "3/8".parse().unwrap();
        assert_eq!(terminal.ratio(), (3, 8));
        assert_eq!(terminal.quarter_length(), 1.5);
        assert_eq!(terminal.duration().kind(), DurationType::Quarter);
        assert_eq!(terminal.duration().dots(), 1);
        assert_eq!(terminal.weight(), 1.0);
        assert!(MeterTerminal::new(0, 4).is_err());
        assert!(MeterTerminal::new(3, 0).is_err());
        assert!("3+2/8".parse::<MeterTerminal>().is_err());
        assert!(MeterTerminal::new(1 << 61, 1).is_ok());
        assert!(matches!(
            MeterTerminal::new(1 << 62, 1),
            Err(MeterError::Format { .. })
        ));
    }

    #[test]
    fn test_ratio_equal_does_not_reduce() {
        let a = MeterTerminal::new(2, 8).unwrap();
        let b = MeterTerminal::new(1, 4).unwrap();
        assert!(!a.ratio_equal(&b));
        assert_eq!(a.quarter_length(), b.quarter_length());
        assert!(a.ratio_equal(&MeterTerminal::new(2, 8).unwrap()));
    }

    #[test]
    fn test_count_even() {
        assert_eq!(divide_by_count((6, 8), 2).unwrap(), vec![(3, 8); 2]);
        assert_eq!(divide_by_count((4, 4), 4).unwrap(), vec![(1, 4); 4]);
        assert_eq!(divide_by_count((1, 4), 2).unwrap(), vec![(1, 8); 2]);
        assert_eq!(divide_by_count((3, 4), 2).unwrap(), vec![(3, 8); 2]);
        assert_eq!(divide_by_count((2, 4), 1).unwrap(), vec![(2, 4)]);
    }

    #[test]
    fn test_count_irregular() {
        assert_eq!(
            divide_by_count((5, 8), 2).unwrap(),
            vec![(2, 8), (3, 8)]
        );
        assert_eq!(
            divide_by_count((7, 8), 3).unwrap(),
            vec![(2, 8), (2, 8), (3, 8)]
        );
        assert_eq!(
            divide_by_count((1, 4), 3).unwrap(),
            vec![(1, 16), (1, 16), (2, 16)]
        );
        assert_eq!(
            divide_by_count((11, 8), 5).unwrap(),
            vec![(2, 8), (2, 8), (2, 8), (2, 8), (3, 8)]
        );
        assert_eq!(
            divide_by_count((7, 8), 2).unwrap(),
            vec![(3, 8), (4, 8)]
        );
        assert_eq!(
            divide_by_count((5, 4), 2).unwrap(),
            vec![(2, 4), (3, 4)]
        );
    }

    #[test]
    fn test_count_dotted_halves() {
        assert_eq!(divide_by_count((3, 8), 2).unwrap(), vec![(3, 16); 2]);
        assert_eq!(divide_by_count((3, 2), 2).unwrap(), vec![(3, 4); 2]);
        assert_eq!(
            divide_by_count((9, 8), 2).unwrap(),
            vec![(4, 8), (5, 8)]
        );
    }

    #[test]
    fn test_count_large_spans() {
        let parts = divide_by_count((1 << 61, 1), 3).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(|(n, _)| n).sum::<u64>(), 1 << 61);
        assert!(parts.iter().all(|(_, d)| *d == 1));
        assert_eq!(
            divide_by_count((u64::MAX / 4, u64::MAX / 2), 2).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_count_invalid() {
        assert!(matches!(
            divide_by_count((3, 4), 0),
            Err(MeterError::Partition(_))
        ));
        assert!(matches!(
            divide_by_count((1, 64), 1000),
            Err(MeterError::Partition(_))
        ));
    }

    #[test]
    fn test_list() {
        assert_eq!(
            divide_by_list((3, 4), &[1, 2]).unwrap(),
            vec![(1, 4), (2, 4)]
        );
        assert_eq!(
            divide_by_list((1, 4), &[1, 1, 2]).unwrap(),
            vec![(1, 16), (1, 16), (2, 16)]
        );
        assert_eq!(
            divide_by_list((1, 4), &[1, 1, 1]).unwrap(),
            vec![(1, 12), (1, 12), (1, 12)]
        );
        assert!(divide_by_list((1, 4), &[]).is_err());
        assert!(divide_by_list((1, 4), &[1, 0]).is_err());
    }

    #[test]
    fn test_list_out_of_range() {
        assert!(matches!(
            divide_by_list((1, 4), &[u64::MAX, 1]),
            Err(MeterError::Partition(_))
        ));
        let terminal = MeterTerminal::new(1 << 40, 1).unwrap();
        assert!(matches!(
            terminal.subdivide_by_list(&[1 << 30, 1]),
            Err(MeterError::Partition(_))
        ));
        assert_eq!(
            divide_by_list((1 << 40, 1), &[1 << 20, 1 << 20]).unwrap(),
            vec![(1 << 39, 1); 2]
        );
    }

    #[test]
    fn test_subdivide() {
        let terminal = MeterTerminal::new(3, 4).unwrap();
        let sequence = terminal.subdivide_by_list(&[2, 1]).unwrap();
        assert_eq!(sequence.to_string(), "{2/4+1/4}");
        assert_eq!(sequence.ratio(), terminal.ratio());
        let sequence = terminal.subdivide(vec!["1/8", "5/8"]).unwrap();
        assert_eq!(sequence.to_string(), "{1/8+5/8}");
    }
}
