use super::{FormulaScorer, ScoringError};
use crate::core::chemistry::MolecularFormula;
use crate::core::models::input::{Peak, ProcessedInput};

const LOG_SQRT_TWO_PI: f64 = 0.918938533204672742;

/// Log-density of the mass deviation between the observed peak and the
/// formula's theoretical mass, under a zero-mean normal model whose standard
/// deviation scales with the peak mass (ppm).
#[derive(Debug, Clone, Copy)]
pub struct MassDeviationScorer {
    /// Expected mass accuracy in parts per million (one standard deviation).
    pub ppm: f64,
}

impl MassDeviationScorer {
    pub fn new(ppm: f64) -> Self {
        Self { ppm }
    }
}

impl Default for MassDeviationScorer {
    fn default() -> Self {
        Self { ppm: 10.0 }
    }
}

impl FormulaScorer for MassDeviationScorer {
    fn score(
        &self,
        formula: &MolecularFormula,
        peak: &Peak,
        _input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        if formula.is_empty() {
            return Err(ScoringError::EmptyFormula {
                scorer: "MassDeviationScorer",
            });
        }
        let sd = peak.mass * self.ppm * 1e-6;
        let standardized = (peak.mass - formula.mass()) / sd;
        let score = -0.5 * standardized * standardized - sd.ln() - LOG_SQRT_TWO_PI;
        if !score.is_finite() {
            return Err(ScoringError::NonFiniteScore {
                scorer: "MassDeviationScorer",
                value: score,
            });
        }
        Ok(score)
    }
}

/// Penalizes chemically implausible formulas: negative ring-double-bond
/// equivalents or an excessive heteroatom-to-carbon ratio.
#[derive(Debug, Clone, Copy)]
pub struct ChemicalPriorScorer {
    pub rdbe_floor: f64,
    pub hetero_to_carbon_cap: f64,
    pub penalty: f64,
}

impl ChemicalPriorScorer {
    pub fn new(rdbe_floor: f64, hetero_to_carbon_cap: f64, penalty: f64) -> Self {
        Self {
            rdbe_floor,
            hetero_to_carbon_cap,
            penalty,
        }
    }
}

impl Default for ChemicalPriorScorer {
    fn default() -> Self {
        Self {
            rdbe_floor: -0.5,
            hetero_to_carbon_cap: 3.0,
            penalty: -3.0,
        }
    }
}

impl FormulaScorer for ChemicalPriorScorer {
    fn score(
        &self,
        formula: &MolecularFormula,
        _peak: &Peak,
        _input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        let mut score = 0.0;
        if formula.rdbe() < self.rdbe_floor {
            score += self.penalty;
        }
        let ratio = formula.hetero_to_carbon_ratio();
        if ratio.is_finite() && ratio > self.hetero_to_carbon_cap {
            score += self.penalty;
        }
        Ok(score)
    }
}
