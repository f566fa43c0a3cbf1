use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// Knobs of the default partitions built by
/// [TimeSignature](super::TimeSignature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct MeterSettings {
    /// How many levels of the beat tree contribute to accent weights.
    #[derivative(Default(value = "3"))]
    pub accent_depth: usize,
    /// Split every default beat into its natural division.
    #[derivative(Default(value = "true"))]
    pub subdivide_beats: bool,
}
impl MeterSettings {
    pub fn new(accent_depth: usize, subdivide_beats: bool) -> Self {
        Self {
            accent_depth,
            subdivide_beats,
        }
    }
}
