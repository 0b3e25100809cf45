use super::{LossScorer, PreparedLossScorer, ScoringError};
use crate::core::chemistry::MolecularFormula;
use crate::core::models::input::ProcessedInput;
use std::collections::HashMap;

const LOG_SQRT_TWO_PI: f64 = 0.918938533204672742;

/// Curated expert list of frequently observed neutral losses.
const COMMON_LOSSES: &[&str] = &[
    "H2", "H2O", "CH4", "C2H4", "C2H2", "C4H8", "C5H8", "C6H6", "CH2O", "CO", "CH2O2", "CO2",
    "C2H4O2", "C2H2O", "C3H6O2", "C3H4O4", "C3H2O3", "C5H8O4", "C6H10O5", "C6H8O6", "NH3", "CH5N",
    "CH3N", "C3H9N", "CHNO", "CH4N2O", "H3PO3", "H3PO4", "HPO3", "C2H5O4P", "H2S", "S", "SO2",
    "SO3", "H2SO4",
];

/// Losses that are chemically very unlikely to occur in one fragmentation
/// step.
const IMPLAUSIBLE_LOSSES: &[&str] = &["C2O", "C4O", "C3H2", "C5H2", "C7H2", "N", "C"];

/// Radical losses that are commonly observed despite breaking the
/// even-electron rule.
const KNOWN_RADICALS: &[&str] = &["H", "OH", "CH3", "CH3O", "NO", "NO2", "C3H7", "C4H9"];

/// Log-normal prior over the neutral-loss mass: small losses are frequent,
/// very large losses are rare. Parameters follow the learned distribution of
/// the loss-mass statistics (mean and standard deviation of `ln(mass)`),
/// shifted by a normalization constant so that an average loss scores near
/// zero.
#[derive(Debug, Clone, Copy)]
pub struct LossSizeScorer {
    pub mean: f64,
    pub sd: f64,
    pub normalization: f64,
}

impl LossSizeScorer {
    pub fn new(mean: f64, sd: f64, normalization: f64) -> Self {
        Self {
            mean,
            sd,
            normalization,
        }
    }
}

impl Default for LossSizeScorer {
    fn default() -> Self {
        Self {
            mean: 3.4484318558075935,
            sd: 1.070374352318858,
            normalization: -4.909082669257325,
        }
    }
}

struct PreparedLossSize<'a> {
    scorer: &'a LossSizeScorer,
}

impl PreparedLossScorer for PreparedLossSize<'_> {
    fn score(
        &self,
        loss: &MolecularFormula,
        _input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        if loss.is_empty() {
            return Err(ScoringError::EmptyFormula {
                scorer: "LossSizeScorer",
            });
        }
        let mass = loss.mass();
        let standardized = (mass.ln() - self.scorer.mean) / self.scorer.sd;
        let log_density =
            -0.5 * standardized * standardized - (mass * self.scorer.sd).ln() - LOG_SQRT_TWO_PI;
        let score = log_density - self.scorer.normalization;
        if !score.is_finite() {
            return Err(ScoringError::NonFiniteScore {
                scorer: "LossSizeScorer",
                value: score,
            });
        }
        Ok(score)
    }
}

impl LossScorer for LossSizeScorer {
    fn prepare<'a>(&'a self, _input: &ProcessedInput) -> Box<dyn PreparedLossScorer + 'a> {
        Box::new(PreparedLossSize { scorer: self })
    }
}

/// Bonus table over curated common neutral losses, with penalties for a small
/// set of implausible losses. Losses outside both tables score zero.
#[derive(Debug, Clone)]
pub struct CommonLossScorer {
    table: HashMap<MolecularFormula, f64>,
}

impl CommonLossScorer {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Adds or overrides the score of one loss.
    pub fn with_loss(mut self, loss: MolecularFormula, score: f64) -> Self {
        self.table.insert(loss, score);
        self
    }
}

impl Default for CommonLossScorer {
    fn default() -> Self {
        let mut table = HashMap::new();
        for text in COMMON_LOSSES {
            table.insert(MolecularFormula::parse(text).unwrap(), 1.0);
        }
        for text in IMPLAUSIBLE_LOSSES {
            table.insert(MolecularFormula::parse(text).unwrap(), -2.0);
        }
        Self { table }
    }
}

struct PreparedCommonLoss<'a> {
    table: &'a HashMap<MolecularFormula, f64>,
}

impl PreparedLossScorer for PreparedCommonLoss<'_> {
    fn score(
        &self,
        loss: &MolecularFormula,
        _input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        Ok(self.table.get(loss).copied().unwrap_or(0.0))
    }
}

impl LossScorer for CommonLossScorer {
    fn prepare<'a>(&'a self, _input: &ProcessedInput) -> Box<dyn PreparedLossScorer + 'a> {
        Box::new(PreparedCommonLoss { table: &self.table })
    }
}

/// Penalizes radical (odd-electron) losses. A small set of well-known radical
/// losses receives a mild penalty; any other radical loss a strong one.
/// Even-electron losses score zero.
#[derive(Debug, Clone)]
pub struct FreeRadicalScorer {
    known: HashMap<MolecularFormula, f64>,
    pub generic_penalty: f64,
}

impl FreeRadicalScorer {
    pub fn new(known: HashMap<MolecularFormula, f64>, generic_penalty: f64) -> Self {
        Self {
            known,
            generic_penalty,
        }
    }
}

impl Default for FreeRadicalScorer {
    fn default() -> Self {
        let known_score = 0.9f64.ln();
        let known = KNOWN_RADICALS
            .iter()
            .map(|text| (MolecularFormula::parse(text).unwrap(), known_score))
            .collect();
        Self {
            known,
            generic_penalty: 0.1f64.ln(),
        }
    }
}

struct PreparedFreeRadical<'a> {
    scorer: &'a FreeRadicalScorer,
}

impl PreparedLossScorer for PreparedFreeRadical<'_> {
    fn score(
        &self,
        loss: &MolecularFormula,
        _input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        if let Some(&score) = self.scorer.known.get(loss) {
            return Ok(score);
        }
        if loss.maybe_radical() {
            Ok(self.scorer.generic_penalty)
        } else {
            Ok(0.0)
        }
    }
}

impl LossScorer for FreeRadicalScorer {
    fn prepare<'a>(&'a self, _input: &ProcessedInput) -> Box<dyn PreparedLossScorer + 'a> {
        Box::new(PreparedFreeRadical { scorer: self })
    }
}
