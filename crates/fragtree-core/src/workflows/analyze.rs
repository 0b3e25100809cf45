use crate::core::models::input::{ProcessedInput, ScoredFormula};
use crate::core::models::tree::{FragmentationTree, Resolution};
use crate::core::scoring::ScoringPipeline;
use crate::engine::builder::GraphBuilder;
use crate::engine::config::AnalysisConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::recalibrate::{MassCorrection, fit_from_tree};
use crate::engine::solve::{CancelToken, SolveBudget, TreeSolver};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const SCORE_EPSILON: f64 = 1e-9;

/// The ranked result of one compound analysis.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// The best trees, one per surviving candidate, best first.
    pub trees: Vec<FragmentationTree>,
    /// Candidates skipped after a scoring failure.
    pub abandoned_candidates: usize,
    /// The accepted mass correction, if recalibration improved the best tree.
    pub correction: Option<MassCorrection>,
}

impl AnalysisOutcome {
    fn empty() -> Self {
        Self {
            trees: Vec::new(),
            abandoned_candidates: 0,
            correction: None,
        }
    }
}

enum CandidateResult {
    Tree(FragmentationTree),
    Infeasible,
    Abandoned,
}

/// Runs the full analysis for one compound: one hypothesis graph per
/// precursor candidate, solved in parallel under the configured budgets,
/// ranked, and optionally recalibrated.
#[instrument(skip_all, name = "analysis_workflow", fields(candidates = input.parent_decompositions().len()))]
pub fn run(
    input: &ProcessedInput,
    config: &AnalysisConfig,
    pipeline: &ScoringPipeline,
    solver: &dyn TreeSolver,
    reporter: &ProgressReporter,
) -> Result<AnalysisOutcome, EngineError> {
    // the builder validates on build, but a config assembled from its public
    // fields may carry out-of-range values
    config.validate()?;

    let candidates = input.parent_decompositions();
    if candidates.is_empty() {
        info!("no precursor candidates, nothing to analyze");
        return Ok(AnalysisOutcome::empty());
    }

    let compound_deadline = deadline_after(config.compound_timeout);
    let cancel = CancelToken::new();

    reporter.report(Progress::PhaseStart {
        name: "tree computation",
    });
    let results: Vec<CandidateResult> = candidates
        .par_iter()
        .enumerate()
        .map(|(index, candidate)| {
            reporter.report(Progress::CandidateStart {
                candidate: index,
                formula: candidate.formula,
            });
            let result = compute_candidate(
                input,
                config,
                pipeline,
                solver,
                index,
                candidate,
                compound_deadline,
                &cancel,
            );
            reporter.report(Progress::CandidateFinish {
                candidate: index,
                solved: matches!(result, CandidateResult::Tree(_)),
            });
            result
        })
        .collect();
    reporter.report(Progress::PhaseFinish);

    let abandoned_candidates = results
        .iter()
        .filter(|r| matches!(r, CandidateResult::Abandoned))
        .count();
    let mut trees: Vec<FragmentationTree> = results
        .into_iter()
        .filter_map(|r| match r {
            CandidateResult::Tree(tree) => Some(tree),
            _ => None,
        })
        .collect();
    trees.sort_by(|a, b| rank(a, b, candidates));
    trees.truncate(config.retained_trees);

    let mut correction = None;
    if config.recalibration.enabled && !trees.is_empty() {
        reporter.report(Progress::PhaseStart {
            name: "recalibration",
        });
        correction = recalibrate_best(input, config, pipeline, solver, &mut trees);
        reporter.report(Progress::PhaseFinish);
    }

    info!(
        trees = trees.len(),
        abandoned = abandoned_candidates,
        recalibrated = correction.is_some(),
        "analysis finished"
    );
    Ok(AnalysisOutcome {
        trees,
        abandoned_candidates,
        correction,
    })
}

fn deadline_after(timeout: Duration) -> Option<Instant> {
    (timeout > Duration::ZERO).then(|| Instant::now() + timeout)
}

fn budget_for(
    candidate_timeout: Duration,
    compound_deadline: Option<Instant>,
    cancel: &CancelToken,
) -> SolveBudget {
    let deadline = match (deadline_after(candidate_timeout), compound_deadline) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    let budget = match deadline {
        Some(deadline) => SolveBudget::with_deadline(deadline),
        None => SolveBudget::unbounded(),
    };
    budget.with_cancel(cancel.clone())
}

#[allow(clippy::too_many_arguments)]
fn compute_candidate(
    input: &ProcessedInput,
    config: &AnalysisConfig,
    pipeline: &ScoringPipeline,
    solver: &dyn TreeSolver,
    index: usize,
    candidate: &ScoredFormula,
    compound_deadline: Option<Instant>,
    cancel: &CancelToken,
) -> CandidateResult {
    let budget = budget_for(config.candidate_timeout, compound_deadline, cancel);
    let graph = match GraphBuilder::new(input, pipeline).build(std::slice::from_ref(candidate)) {
        Ok(graph) => graph,
        Err(error) => {
            warn!(candidate = index, %error, "candidate abandoned after scoring failure");
            return CandidateResult::Abandoned;
        }
    };
    let Some(outcome) = solver.solve(&graph, &budget) else {
        debug!(candidate = index, "no tree exists for candidate");
        return CandidateResult::Infeasible;
    };
    let resolution = if outcome.optimal {
        Resolution::Exact
    } else {
        Resolution::Heuristic
    };
    match FragmentationTree::assemble(&graph, input, &outcome.edges, resolution) {
        Some(mut tree) => {
            tree.candidate = index;
            CandidateResult::Tree(tree)
        }
        None => CandidateResult::Infeasible,
    }
}

/// Total order over trees: score first, then explained peaks, then the
/// candidate's standalone score, then candidate position for stability.
fn rank(a: &FragmentationTree, b: &FragmentationTree, candidates: &[ScoredFormula]) -> Ordering {
    if (a.total_score - b.total_score).abs() > SCORE_EPSILON {
        return b.total_score.total_cmp(&a.total_score);
    }
    b.explained_peaks()
        .cmp(&a.explained_peaks())
        .then_with(|| candidates[b.candidate].score.total_cmp(&candidates[a.candidate].score))
        .then_with(|| a.candidate.cmp(&b.candidate))
}

/// Fits a linear mass correction against the best tree and reruns that
/// candidate on corrected input, keeping the result only when its score
/// strictly improves. Failures here degrade to the uncorrected result.
fn recalibrate_best(
    input: &ProcessedInput,
    config: &AnalysisConfig,
    pipeline: &ScoringPipeline,
    solver: &dyn TreeSolver,
    trees: &mut [FragmentationTree],
) -> Option<MassCorrection> {
    let mut accepted: Option<MassCorrection> = None;
    let mut current = input.clone();
    for round in 0..config.recalibration.max_rounds {
        let Some(correction) = fit_from_tree(&trees[0], config.recalibration.min_peaks) else {
            break;
        };
        let corrected = match current.with_corrected_masses(|m| correction.apply(m)) {
            Ok(corrected) => corrected,
            Err(error) => {
                warn!(%error, "mass correction produced invalid input, keeping original");
                break;
            }
        };
        let index = trees[0].candidate;
        let candidate = corrected.parent_decompositions()[index];
        let budget = budget_for(config.candidate_timeout, None, &CancelToken::new());
        let graph =
            match GraphBuilder::new(&corrected, pipeline).build(std::slice::from_ref(&candidate)) {
                Ok(graph) => graph,
                Err(error) => {
                    warn!(%error, "scoring failed on recalibrated input, keeping original");
                    break;
                }
            };
        let Some(outcome) = solver.solve(&graph, &budget) else {
            break;
        };
        let resolution = if outcome.optimal {
            Resolution::Exact
        } else {
            Resolution::Heuristic
        };
        let Some(mut tree) = FragmentationTree::assemble(&graph, &corrected, &outcome.edges, resolution)
        else {
            break;
        };
        tree.candidate = index;
        if tree.total_score > trees[0].total_score + SCORE_EPSILON {
            info!(
                round,
                slope = correction.slope,
                intercept = correction.intercept,
                old_score = trees[0].total_score,
                new_score = tree.total_score,
                "recalibration accepted"
            );
            trees[0] = tree;
            accepted = Some(match accepted {
                Some(inner) => compose(correction, inner),
                None => correction,
            });
            current = corrected;
        } else {
            debug!(round, "recalibration rejected, score did not improve");
            break;
        }
    }
    accepted
}

/// `outer` applied after `inner`, collapsed into one affine correction.
fn compose(outer: MassCorrection, inner: MassCorrection) -> MassCorrection {
    MassCorrection {
        slope: outer.slope * inner.slope,
        intercept: outer.slope * inner.intercept + outer.intercept,
    }
}
