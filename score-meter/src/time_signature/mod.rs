//! Time signature as four partitions of one bar.
//!
//! # Example
//!
//! ```
//! use score_meter::{SequenceKind, TimeSignature};
//!
//! let mut signature = TimeSignature::new("3/4", Some(3)).unwrap();
//! assert_eq!(signature.get_beat(0.0).unwrap(), 1);
//! assert_eq!(signature.get_beat(2.5).unwrap(), 3);
//! signature
//!     .partition(SequenceKind::Beat, vec!["3/8", "3/8"])
//!     .unwrap();
//! assert_eq!(signature.get_beat(2.5).unwrap(), 2);
//! assert_eq!(signature.bar_duration().quarter_length(), 3.0);
//! ```

use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    meter::{MeterError, MeterResult, MeterSequence, Partition},
    primitives::{ratio_to_fraction, Duration, Ratio, TOLERANCE},
};

use self::{
    beam::{assign_beams, Beams},
    settings::MeterSettings,
};

pub mod beam;
pub mod settings;

/// One of the four partitions kept by [TimeSignature].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceKind {
    /// Counting: beat numbers and their divisions.
    Beat,
    /// Grouping of beamed notes.
    Beam,
    /// Weights of metric stress.
    Accent,
    /// The written signature.
    Display,
}

/// Beat, beam, accent and display partitions of the same bar.
///
/// Every partition spans exactly the declared ratio. They are rebuilt
/// together by [TimeSignature::load] and can be changed separately
/// through [TimeSignature::partition] or [TimeSignature::update].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignature {
    display: MeterSequence,
    beat: MeterSequence,
    beam: MeterSequence,
    accent: MeterSequence,
    settings: MeterSettings,
}
impl TimeSignature {
    /// `beat_count` overrides the default beat partition of a simple
    /// signature.
    pub fn new(text: &str, beat_count: Option<usize>) -> MeterResult<Self> {
        Self::with_settings(text, beat_count, MeterSettings::default())
    }

    pub fn with_settings(
        text: &str,
        beat_count: Option<usize>,
        settings: MeterSettings,
    ) -> MeterResult<Self> {
        let display = MeterSequence::new(text, None)?;
        let beat = default_beat(&display, beat_count, &settings)?;
        let beam = default_beam(&display)?;
        let accent = default_accent(&beat, &settings)?;
        log::debug!(
            "time signature `{text}`: beat {beat}, beam {beam}, accent {:?}",
            accent.flat_weight()
        );
        Ok(Self {
            display,
            beat,
            beam,
            accent,
            settings,
        })
    }

    /// Rebuild all partitions. Nothing changes on error.
    pub fn load(
        &mut self,
        text: &str,
        beat_count: Option<usize>,
    ) -> MeterResult<()> {
        *self = Self::with_settings(text, beat_count, self.settings.clone())?;
        Ok(())
    }

    pub fn load_ratio(
        &mut self,
        numerator: u64,
        denominator: u64,
        beat_count: Option<usize>,
    ) -> MeterResult<()> {
        self.load(&format!("{numerator}/{denominator}"), beat_count)
    }

    pub fn settings(&self) -> &MeterSettings {
        &self.settings
    }
    pub fn display(&self) -> &MeterSequence {
        &self.display
    }
    pub fn beat(&self) -> &MeterSequence {
        &self.beat
    }
    pub fn beam(&self) -> &MeterSequence {
        &self.beam
    }
    pub fn accent(&self) -> &MeterSequence {
        &self.accent
    }
    pub fn sequence(&self, kind: SequenceKind) -> &MeterSequence {
        match kind {
            SequenceKind::Beat => &self.beat,
            SequenceKind::Beam => &self.beam,
            SequenceKind::Accent => &self.accent,
            SequenceKind::Display => &self.display,
        }
    }
    fn sequence_mut(&mut self, kind: SequenceKind) -> &mut MeterSequence {
        match kind {
            SequenceKind::Beat => &mut self.beat,
            SequenceKind::Beam => &mut self.beam,
            SequenceKind::Accent => &mut self.accent,
            SequenceKind::Display => &mut self.display,
        }
    }

    /// Re-partition one of the sequences.
    pub fn partition(
        &mut self,
        kind: SequenceKind,
        partition: impl Into<Partition>,
    ) -> MeterResult<()> {
        let partition = partition.into();
        self.update(kind, |sequence| sequence.partition(partition))
    }

    /// Edit a copy of one sequence, and keep it if the bar length holds.
    ///
    /// # Example
    /// ```
    /// # use score_meter::{SequenceKind, TimeSignature};
    /// let mut signature = TimeSignature::new("2/4", None).unwrap();
    /// signature
    ///     .update(SequenceKind::Beam, |beam| {
    ///         beam.subdivide_partitions_equal(Some(2))
    ///     })
    ///     .unwrap();
    /// assert_eq!(signature.beam().to_string(), "{{1/8+1/8}+{1/8+1/8}}");
    /// ```
    pub fn update<F>(&mut self, kind: SequenceKind, f: F) -> MeterResult<()>
    where
        F: FnOnce(&mut MeterSequence) -> MeterResult<()>,
    {
        let sequence = self.sequence_mut(kind);
        let mut updated = sequence.clone();
        f(&mut updated)?;
        if ratio_to_fraction(updated.ratio()) != ratio_to_fraction(sequence.ratio())
        {
            return Err(MeterError::SpanMismatch {
                expected: sequence.ratio_string(),
                found: updated.ratio_string(),
            });
        }
        log::debug!("{kind:?} sequence updated: {updated}");
        *sequence = updated;
        Ok(())
    }

    /// Sum of the numerators over the common denominator.
    pub fn numerator(&self) -> u64 {
        self.display.numerator()
    }
    pub fn denominator(&self) -> u64 {
        self.display.denominator()
    }
    /// True for the `3+2/8` form.
    pub fn summed_numerator(&self) -> bool {
        self.display.summed_numerator()
    }
    /// Parts of the signature as written: one for `3/4`, two for `5/8+4/4`.
    pub fn ratios(&self) -> Vec<Ratio> {
        self.display.iter().map(|part| part.ratio()).collect()
    }
    pub fn ratio_string(&self) -> String {
        self.display.ratio_string()
    }

    pub fn bar_duration(&self) -> Duration {
        self.display.duration()
    }

    /// 1-based beat at quarter-length offset from the bar start.
    pub fn get_beat(&self, position: f64) -> MeterResult<usize> {
        Ok(self.beat.position_to_index(position)? + 1)
    }

    /// Beat with the elapsed part of it: `2.5` in the middle of the
    /// second beat.
    pub fn get_beat_proportion(&self, position: f64) -> MeterResult<f64> {
        let index = self.beat.position_to_index(position)?;
        let (start, end) = self.beat.position_to_span(position)?;
        Ok(index as f64 + 1.0 + (position - start).max(0.0) / (end - start))
    }

    /// Quarter-length offset of every beat start.
    pub fn get_beat_offsets(&self) -> Vec<f64> {
        self.beat
            .get_level_span(0)
            .into_iter()
            .map(|(start, _)| start)
            .collect()
    }

    /// Offset of a (fractional) 1-based beat, the reverse of
    /// [TimeSignature::get_beat_proportion].
    pub fn get_offset_from_beat(&self, beat: f64) -> MeterResult<f64> {
        let spans = self.beat.get_level_span(0);
        let error = MeterError::Position {
            position: beat,
            total: spans.len() as f64 + 1.0,
        };
        if !beat.is_finite() || beat < 1.0 {
            return Err(error);
        }
        let (start, end) = *spans.get(beat as usize - 1).ok_or(error)?;
        Ok(start + beat.fract() * (end - start))
    }

    /// True if the offset is the start of a top-level accent span.
    ///
    /// Offsets outside of the bar are never accented.
    pub fn get_accent(&self, position: f64) -> bool {
        self.accent
            .get_level_span(0)
            .iter()
            .any(|(start, _)| (start - position).abs() < TOLERANCE)
    }

    /// Weight of the accent terminal at offset: 1 at the bar start,
    /// halved for every level the offset is not a boundary of.
    pub fn get_accent_weight(&self, position: f64) -> MeterResult<f64> {
        self.accent.position_to_weight(position)
    }

    /// Beam states of contiguous durations from the bar start.
    pub fn get_beams(&self, durations: &[Duration]) -> MeterResult<Vec<Beams>> {
        assign_beams(&self.beam, durations)
    }

    pub fn beat_count(&self) -> usize {
        self.beat.len()
    }

    /// Common duration of the beats.
    pub fn beat_duration(&self) -> MeterResult<Duration> {
        match (self.beat.is_uniform_partition(), self.beat.get(0)) {
            (true, Some(first)) => Ok(first.duration()),
            _ => Err(MeterError::Irregular(format!(
                "beats {} are not equal",
                self.beat
            ))),
        }
    }

    /// Number of parts every beat is divided into.
    pub fn beat_division_count(&self) -> MeterResult<usize> {
        let counts = self
            .beat
            .iter()
            .map(|beat| beat.as_sequence().map_or(1, |s| s.len()))
            .collect_vec();
        match counts.iter().all_equal() {
            true => Ok(counts.first().copied().unwrap_or(1)),
            false => Err(MeterError::Irregular(format!(
                "beats {} are divided differently",
                self.beat
            ))),
        }
    }

    /// Beats divided in three.
    pub fn is_compound(&self) -> bool {
        self.beat_division_count().map_or(false, |count| count == 3)
    }
    /// Beats divided in two.
    pub fn is_simple(&self) -> bool {
        self.beat_division_count().map_or(false, |count| count == 2)
    }

    /// `"Simple Duple"`, `"Compound Triple"` and so on.
    pub fn classification(&self) -> String {
        let division = match self.beat_division_count() {
            Ok(2) => "Simple",
            Ok(3) => "Compound",
            _ => "Irregular",
        };
        let count = match self.beat_count() {
            1 => "Single",
            2 => "Duple",
            3 => "Triple",
            4 => "Quadruple",
            _ => "Irregular",
        };
        format!("{division} {count}")
    }
}
impl FromStr for TimeSignature {
    type Err = MeterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s, None)
    }
}
impl Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ratio_string())
    }
}

/// Natural beats of the numerator, unless counted explicitly.
fn default_beat(
    display: &MeterSequence,
    beat_count: Option<usize>,
    settings: &MeterSettings,
) -> MeterResult<MeterSequence> {
    let mut beat =
        MeterSequence::from_ratio(display.numerator(), display.denominator())?;
    match (beat_count, display.numerator()) {
        (Some(count), _) => beat.partition_by_count(count)?,
        (None, _) if display.len() > 1 => beat.partition_by_other(display)?,
        (None, 1) => (),
        (None, n) if n <= 4 => beat.partition_by_count(n as usize)?,
        (None, n) if n % 3 == 0 => beat.partition_by_count((n / 3) as usize)?,
        (None, n) => beat.partition_by_count(n as usize)?,
    }
    if settings.subdivide_beats {
        beat.subdivide_partitions_equal(None)?;
    }
    Ok(beat)
}

/// Beam groups: beats for short denominators, pairs or triplets of
/// units for longer ones.
fn default_beam(display: &MeterSequence) -> MeterResult<MeterSequence> {
    let mut beam =
        MeterSequence::from_ratio(display.numerator(), display.denominator())?;
    let (n, d) = display.ratio();
    if display.len() > 1 {
        beam.partition_by_other(display)?;
    } else if d <= 4 {
        if n > 1 {
            beam.partition_by_count(n as usize)?;
        }
    } else if n % 3 == 0 && n > 3 {
        beam.partition_by_count((n / 3) as usize)?;
    } else if n > 3 {
        beam.partition_by_count((n / 2) as usize)?;
    }
    Ok(beam)
}

/// Copy of beats, weighted by how many levels start at each terminal.
fn default_accent(
    beat: &MeterSequence,
    settings: &MeterSettings,
) -> MeterResult<MeterSequence> {
    let mut accent = beat.clone();
    let levels = settings.accent_depth.min(accent.depth());
    let boundaries = (0..levels)
        .map(|level| {
            accent
                .get_level_span(level)
                .into_iter()
                .map(|(start, _)| start)
                .collect_vec()
        })
        .collect_vec();
    let is_boundary = |starts: &[f64], position: f64| {
        starts.iter().any(|s| (s - position).abs() < TOLERANCE)
    };
    let weights = accent
        .flat()
        .get_level_span(0)
        .into_iter()
        .map(|(start, _)| {
            let hits = usize::from(start.abs() < TOLERANCE)
                + boundaries
                    .iter()
                    .filter(|starts| is_boundary(starts.as_slice(), start))
                    .count();
            1.0 / 2_f64.powi((levels + 1 - hits) as i32)
        })
        .collect_vec();
    accent.set_flat_weight(&weights)?;
    Ok(accent)
}
