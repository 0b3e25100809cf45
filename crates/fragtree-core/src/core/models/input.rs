use crate::core::chemistry::MolecularFormula;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable index of a peak in the mass-ascending merged peak list. Serves as
/// the "color" for the colorful-subtree constraint.
pub type PeakIndex = usize;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum InputError {
    #[error("The peak list is empty")]
    EmptyPeakList,
    #[error("Parent peak index {index} is out of range for {peak_count} peaks")]
    ParentPeakOutOfRange { index: usize, peak_count: usize },
    #[error("Peak {index} has non-positive mass {mass}")]
    NonPositiveMass { index: usize, mass: f64 },
    #[error("Peak {index} has a non-finite mass")]
    NonFiniteMass { index: usize },
    #[error("Peak {index} has negative intensity {intensity}")]
    NegativeIntensity { index: usize, intensity: f64 },
    #[error("Peak {index} is heavier than its successor; peaks must be sorted by ascending mass")]
    UnsortedPeakList { index: usize },
    #[error("Expected one decomposition list per peak ({expected}), found {found}")]
    DecompositionCountMismatch { expected: usize, found: usize },
    #[error("Peak-pair score matrix is {found}x{found}, expected {expected}x{expected}")]
    PairMatrixDimensionMismatch { expected: usize, found: usize },
}

/// A preprocessed spectral peak with a neutralized mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub mass: f64,
    pub intensity: f64,
}

/// A candidate molecular-formula decomposition of one peak's neutral mass,
/// produced by an external decomposition service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredFormula {
    pub formula: MolecularFormula,
    pub score: f64,
}

impl ScoredFormula {
    pub fn new(formula: MolecularFormula, score: f64) -> Self {
        Self { formula, score }
    }
}

/// Dense peak-pair score matrix supplied by preprocessing. Row index is the
/// parent (heavier) peak, column index the child peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScores {
    size: usize,
    values: Vec<f64>,
}

impl PairScores {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, parent: PeakIndex, child: PeakIndex) -> f64 {
        self.values[parent * self.size + child]
    }

    pub fn set(&mut self, parent: PeakIndex, child: PeakIndex, score: f64) {
        self.values[parent * self.size + child] = score;
    }
}

/// The validated input to one graph construction: a merged, mass-ascending
/// peak list with per-peak candidate decompositions, the designated parent
/// peak, the candidate parent decompositions, and the peak-pair score matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedInput {
    peaks: Vec<Peak>,
    parent_peak: PeakIndex,
    decompositions: Vec<Vec<ScoredFormula>>,
    parent_decompositions: Vec<ScoredFormula>,
    pair_scores: PairScores,
    max_intensity: f64,
    total_intensity: f64,
}

impl ProcessedInput {
    pub fn new(
        peaks: Vec<Peak>,
        parent_peak: PeakIndex,
        decompositions: Vec<Vec<ScoredFormula>>,
        parent_decompositions: Vec<ScoredFormula>,
        pair_scores: PairScores,
    ) -> Result<Self, InputError> {
        if peaks.is_empty() {
            return Err(InputError::EmptyPeakList);
        }
        if parent_peak >= peaks.len() {
            return Err(InputError::ParentPeakOutOfRange {
                index: parent_peak,
                peak_count: peaks.len(),
            });
        }
        for (index, peak) in peaks.iter().enumerate() {
            if !peak.mass.is_finite() || !peak.intensity.is_finite() {
                return Err(InputError::NonFiniteMass { index });
            }
            if peak.mass <= 0.0 {
                return Err(InputError::NonPositiveMass {
                    index,
                    mass: peak.mass,
                });
            }
            if peak.intensity < 0.0 {
                return Err(InputError::NegativeIntensity {
                    index,
                    intensity: peak.intensity,
                });
            }
        }
        if let Some(index) = peaks.windows(2).position(|w| w[0].mass > w[1].mass) {
            return Err(InputError::UnsortedPeakList { index });
        }
        if decompositions.len() != peaks.len() {
            return Err(InputError::DecompositionCountMismatch {
                expected: peaks.len(),
                found: decompositions.len(),
            });
        }
        if pair_scores.size() != peaks.len() {
            return Err(InputError::PairMatrixDimensionMismatch {
                expected: peaks.len(),
                found: pair_scores.size(),
            });
        }
        let max_intensity = peaks.iter().map(|p| p.intensity).fold(0.0, f64::max);
        let total_intensity = peaks.iter().map(|p| p.intensity).sum();
        Ok(Self {
            peaks,
            parent_peak,
            decompositions,
            parent_decompositions,
            pair_scores,
            max_intensity,
            total_intensity,
        })
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn peak(&self, index: PeakIndex) -> Option<&Peak> {
        self.peaks.get(index)
    }

    pub fn parent_peak_index(&self) -> PeakIndex {
        self.parent_peak
    }

    pub fn parent_peak(&self) -> &Peak {
        &self.peaks[self.parent_peak]
    }

    pub fn decompositions(&self, peak: PeakIndex) -> &[ScoredFormula] {
        &self.decompositions[peak]
    }

    pub fn parent_decompositions(&self) -> &[ScoredFormula] {
        &self.parent_decompositions
    }

    pub fn pair_score(&self, parent: PeakIndex, child: PeakIndex) -> f64 {
        self.pair_scores.get(parent, child)
    }

    /// Highest single-peak intensity, used for relative-intensity scoring.
    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    /// Sum of all peak intensities, used for the explained-intensity fraction.
    pub fn total_intensity(&self) -> f64 {
        self.total_intensity
    }

    /// Returns a copy of this input with every peak mass replaced by
    /// `correct(mass)`. Candidate decompositions and pair scores are kept;
    /// re-validation applies (a correction that reorders or degenerates the
    /// peak list is rejected).
    pub fn with_corrected_masses(
        &self,
        correct: impl Fn(f64) -> f64,
    ) -> Result<Self, InputError> {
        let peaks = self
            .peaks
            .iter()
            .map(|p| Peak {
                mass: correct(p.mass),
                intensity: p.intensity,
            })
            .collect();
        Self::new(
            peaks,
            self.parent_peak,
            self.decompositions.clone(),
            self.parent_decompositions.clone(),
            self.pair_scores.clone(),
        )
    }
}
