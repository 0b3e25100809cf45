//! Pluggable scoring pipeline.
//!
//! Three scorer kinds contribute to edge weights: peak scorers (a bonus or
//! penalty for explaining a peak at all), formula scorers (adjustments for a
//! concrete (peak, formula) hypothesis), and loss scorers (priors over the
//! neutral loss of an edge). Loss scorers may precompute shared state once
//! per graph build through [`LossScorer::prepare`].
//!
//! Scorers are summed; the pipeline iterates fixed lists of scorer instances
//! and carries no shared mutable state. A scorer failing on malformed data is
//! fatal for the current graph build, never silently treated as zero.

pub mod formula;
pub mod loss;
pub mod peak;

use crate::core::chemistry::MolecularFormula;
use crate::core::models::input::{Peak, PeakIndex, ProcessedInput};
use thiserror::Error;

pub use formula::{ChemicalPriorScorer, MassDeviationScorer};
pub use loss::{CommonLossScorer, FreeRadicalScorer, LossSizeScorer};
pub use peak::{IntensityPeakScorer, TreeSizeScorer};

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ScoringError {
    #[error("Peak index {0} is outside of the processed peak list")]
    PeakOutOfRange(PeakIndex),
    #[error("Scorer '{scorer}' produced a non-finite score {value}")]
    NonFiniteScore { scorer: &'static str, value: f64 },
    #[error("Scorer '{scorer}' cannot score an empty formula")]
    EmptyFormula { scorer: &'static str },
}

/// Context-free bonus or penalty for a peak being explained at all.
pub trait PeakScorer: Send + Sync {
    fn score(&self, peak: PeakIndex, input: &ProcessedInput) -> Result<f64, ScoringError>;
}

/// Adjustment for the hypothesis that a concrete formula explains a concrete
/// peak, applied on top of the external candidate score.
pub trait FormulaScorer: Send + Sync {
    fn score(
        &self,
        formula: &MolecularFormula,
        peak: &Peak,
        input: &ProcessedInput,
    ) -> Result<f64, ScoringError>;
}

/// Per-build state of a loss scorer; scores one neutral loss per call.
pub trait PreparedLossScorer {
    fn score(&self, loss: &MolecularFormula, input: &ProcessedInput)
    -> Result<f64, ScoringError>;
}

/// Prior over neutral-loss edges. `prepare` is invoked exactly once per graph
/// build and may perform expensive shared precomputation; the returned state
/// then scores every edge.
pub trait LossScorer: Send + Sync {
    fn prepare<'a>(&'a self, input: &ProcessedInput) -> Box<dyn PreparedLossScorer + 'a>;
}

/// A fixed set of scorer instances, summed into vertex and edge scores.
#[derive(Default)]
pub struct ScoringPipeline {
    peak_scorers: Vec<Box<dyn PeakScorer>>,
    formula_scorers: Vec<Box<dyn FormulaScorer>>,
    loss_scorers: Vec<Box<dyn LossScorer>>,
}

impl ScoringPipeline {
    /// An empty pipeline: edge weights reduce to candidate scores plus the
    /// peak-pair matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default scorer set: intensity and tree-size peak scorers, mass
    /// deviation and chemical prior formula scorers, loss size, common loss,
    /// and free radical loss scorers.
    pub fn standard() -> Self {
        Self::new()
            .with_peak_scorer(IntensityPeakScorer::default())
            .with_peak_scorer(TreeSizeScorer::default())
            .with_formula_scorer(MassDeviationScorer::default())
            .with_formula_scorer(ChemicalPriorScorer::default())
            .with_loss_scorer(LossSizeScorer::default())
            .with_loss_scorer(CommonLossScorer::default())
            .with_loss_scorer(FreeRadicalScorer::default())
    }

    pub fn with_peak_scorer(mut self, scorer: impl PeakScorer + 'static) -> Self {
        self.peak_scorers.push(Box::new(scorer));
        self
    }

    pub fn with_formula_scorer(mut self, scorer: impl FormulaScorer + 'static) -> Self {
        self.formula_scorers.push(Box::new(scorer));
        self
    }

    pub fn with_loss_scorer(mut self, scorer: impl LossScorer + 'static) -> Self {
        self.loss_scorers.push(Box::new(scorer));
        self
    }

    /// Summed peak-scorer contribution for one peak.
    pub fn peak_score(&self, peak: PeakIndex, input: &ProcessedInput) -> Result<f64, ScoringError> {
        let mut total = 0.0;
        for scorer in &self.peak_scorers {
            total += scorer.score(peak, input)?;
        }
        Ok(total)
    }

    /// Summed formula-scorer adjustment for one (peak, formula) hypothesis.
    pub fn formula_prior(
        &self,
        formula: &MolecularFormula,
        peak: &Peak,
        input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        let mut total = 0.0;
        for scorer in &self.formula_scorers {
            total += scorer.score(formula, peak, input)?;
        }
        Ok(total)
    }

    /// Runs `prepare` once per loss scorer for the given input.
    pub fn prepare_losses<'a>(
        &'a self,
        input: &ProcessedInput,
    ) -> Vec<Box<dyn PreparedLossScorer + 'a>> {
        self.loss_scorers
            .iter()
            .map(|scorer| scorer.prepare(input))
            .collect()
    }

    /// Summed loss-scorer contribution for one neutral loss.
    pub fn loss_score(
        prepared: &[Box<dyn PreparedLossScorer + '_>],
        loss: &MolecularFormula,
        input: &ProcessedInput,
    ) -> Result<f64, ScoringError> {
        let mut total = 0.0;
        for scorer in prepared {
            total += scorer.score(loss, input)?;
        }
        Ok(total)
    }
}
