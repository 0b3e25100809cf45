use super::{PeakScorer, ScoringError};
use crate::core::models::input::{PeakIndex, ProcessedInput};

/// Constant bonus per explained peak. Balances the per-edge penalties of the
/// probabilistic scorers, controlling how eagerly low-scoring peaks are pulled
/// into the tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeSizeScorer {
    pub bonus: f64,
}

impl TreeSizeScorer {
    pub fn new(bonus: f64) -> Self {
        Self { bonus }
    }
}

impl Default for TreeSizeScorer {
    fn default() -> Self {
        Self { bonus: 0.5 }
    }
}

impl PeakScorer for TreeSizeScorer {
    fn score(&self, _peak: PeakIndex, _input: &ProcessedInput) -> Result<f64, ScoringError> {
        Ok(self.bonus)
    }
}

/// Log of the peak's intensity relative to the most intense peak of the
/// spectrum. Intensities below `floor` (relative) are clamped so that
/// zero-intensity peaks (e.g. a synthetic parent) stay finite.
#[derive(Debug, Clone, Copy)]
pub struct IntensityPeakScorer {
    pub weight: f64,
    pub floor: f64,
}

impl IntensityPeakScorer {
    pub fn new(weight: f64, floor: f64) -> Self {
        Self { weight, floor }
    }
}

impl Default for IntensityPeakScorer {
    fn default() -> Self {
        Self {
            weight: 0.1,
            floor: 1e-3,
        }
    }
}

impl PeakScorer for IntensityPeakScorer {
    fn score(&self, peak: PeakIndex, input: &ProcessedInput) -> Result<f64, ScoringError> {
        let peak = input.peak(peak).ok_or(ScoringError::PeakOutOfRange(peak))?;
        let reference = input.max_intensity();
        let relative = if reference > 0.0 {
            peak.intensity / reference
        } else {
            1.0
        };
        let score = self.weight * relative.max(self.floor).ln();
        if !score.is_finite() {
            return Err(ScoringError::NonFiniteScore {
                scorer: "IntensityPeakScorer",
                value: score,
            });
        }
        Ok(score)
    }
}
