use super::{SolveBudget, SolverOutcome, TreeSolver};
use crate::core::models::graph::{FragmentId, FragmentationGraph, LossId};
use crate::core::models::input::PeakIndex;
use slotmap::SecondaryMap;
use tracing::trace;

const BUDGET_CHECK_INTERVAL: u64 = 1024;
const SCORE_EPSILON: f64 = 1e-9;

/// Exact maximum colorful subtree search.
///
/// Fragments are visited in construction order, which is a topological order
/// of the graph: each fragment is either skipped or attached through one of
/// its incoming edges whose tail is already part of the tree. Every partial
/// selection is itself a valid colorful tree, so the search carries an
/// incumbent at all times and degrades gracefully when the budget expires.
///
/// The admissible bound adds, for every peak not yet explained and not yet
/// passed over, the best positive edge weight into any hypothesis of that
/// peak.
///
/// Among equal-score solutions the search prefers the one explaining more
/// peaks, so pruning keeps equal-bound subtrees alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct BranchBoundSolver;

impl BranchBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

struct Search<'a> {
    colors: Vec<PeakIndex>,
    /// Per position: (tail position, edge id, weight), best weight first.
    incoming: Vec<Vec<(usize, LossId, f64)>>,
    /// Per peak: best positive edge weight into any fragment of that peak.
    color_best: Vec<f64>,
    /// Per peak: last position at which the peak can still be claimed.
    color_last_pos: Vec<usize>,
    budget: &'a SolveBudget,
    steps: u64,
    interrupted: bool,
    best_score: f64,
    best_edges: Vec<LossId>,
}

impl Search<'_> {
    fn out_of_budget(&mut self) -> bool {
        if self.interrupted {
            return true;
        }
        self.steps += 1;
        if self.steps % BUDGET_CHECK_INTERVAL == 0 && self.budget.expired() {
            self.interrupted = true;
        }
        self.interrupted
    }

    fn bound(&self, pos: usize, score: f64, used: &[bool]) -> f64 {
        let mut bound = score;
        for (peak, &best) in self.color_best.iter().enumerate() {
            if best > 0.0 && !used[peak] && self.color_last_pos[peak] >= pos {
                bound += best;
            }
        }
        bound
    }

    /// Lexicographic incumbent test: a strictly better score always wins,
    /// and a score tied within epsilon wins when it explains more peaks.
    fn improves(&self, score: f64, edge_count: usize) -> bool {
        if score > self.best_score + SCORE_EPSILON {
            return true;
        }
        score > self.best_score - SCORE_EPSILON && edge_count > self.best_edges.len()
    }

    fn dfs(
        &mut self,
        pos: usize,
        score: f64,
        used: &mut [bool],
        in_tree: &mut [bool],
        selected: &mut Vec<LossId>,
    ) {
        if self.out_of_budget() || pos == self.colors.len() {
            return;
        }
        // Prune only subtrees that are strictly worse than the incumbent;
        // equal-bound extensions may still add explained peaks at no cost.
        if self.bound(pos, score, used) < self.best_score - SCORE_EPSILON {
            return;
        }

        let color = self.colors[pos];
        if !used[color] {
            let edges = std::mem::take(&mut self.incoming[pos]);
            for &(tail, edge, weight) in &edges {
                if !in_tree[tail] {
                    continue;
                }
                used[color] = true;
                in_tree[pos] = true;
                selected.push(edge);
                let next_score = score + weight;
                if self.improves(next_score, selected.len()) {
                    self.best_score = next_score;
                    self.best_edges = selected.clone();
                }
                self.dfs(pos + 1, next_score, used, in_tree, selected);
                selected.pop();
                in_tree[pos] = false;
                used[color] = false;
            }
            self.incoming[pos] = edges;
        }
        self.dfs(pos + 1, score, used, in_tree, selected);
    }
}

impl TreeSolver for BranchBoundSolver {
    fn solve(&self, graph: &FragmentationGraph, budget: &SolveBudget) -> Option<SolverOutcome> {
        if graph.is_infeasible() {
            return None;
        }

        let mut position: SecondaryMap<FragmentId, usize> = SecondaryMap::new();
        let mut colors = Vec::new();
        for (index, (id, fragment)) in graph.fragments_in_order().enumerate() {
            position.insert(id, index);
            colors.push(fragment.peak);
        }

        let peak_count = graph.peak_count();
        let mut incoming: Vec<Vec<(usize, LossId, f64)>> = vec![Vec::new(); colors.len()];
        let mut color_best = vec![0.0f64; peak_count];
        for (id, loss) in graph.losses_in_order() {
            let head = position[loss.head];
            incoming[head].push((position[loss.tail], id, loss.weight));
            let color = colors[head];
            if loss.weight > color_best[color] {
                color_best[color] = loss.weight;
            }
        }
        for edges in &mut incoming {
            edges.sort_by(|a, b| b.2.total_cmp(&a.2));
        }
        let mut color_last_pos = vec![0usize; peak_count];
        for (pos, &color) in colors.iter().enumerate() {
            color_last_pos[color] = color_last_pos[color].max(pos);
        }

        // seed the incumbent with the best single root edge so a valid tree
        // is available even under an already-expired budget
        let (seed_edge, seed_score) = graph
            .losses_in_order()
            .filter(|(_, loss)| graph.is_root(loss.tail))
            .map(|(id, loss)| (id, loss.weight))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        let mut search = Search {
            colors,
            incoming,
            color_best,
            color_last_pos,
            budget,
            steps: 0,
            interrupted: budget.expired(),
            best_score: seed_score,
            best_edges: vec![seed_edge],
        };
        // the root is never claimed through an edge; it holds no color
        let mut used = vec![false; peak_count];
        let mut in_tree = vec![false; search.colors.len()];
        in_tree[0] = true;
        let mut selected = Vec::new();
        search.dfs(1, 0.0, &mut used, &mut in_tree, &mut selected);

        trace!(
            steps = search.steps,
            objective = search.best_score,
            optimal = !search.interrupted,
            "tree search finished"
        );
        Some(SolverOutcome {
            edges: search.best_edges,
            objective: search.best_score,
            optimal: !search.interrupted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chemistry::MolecularFormula;
    use crate::core::models::input::{PairScores, Peak, ProcessedInput, ScoredFormula};
    use crate::core::scoring::ScoringPipeline;
    use crate::engine::builder::GraphBuilder;
    use std::collections::HashSet;
    use std::time::Instant;

    fn formula(text: &str) -> MolecularFormula {
        MolecularFormula::parse(text).unwrap()
    }

    fn peak(mass: f64) -> Peak {
        Peak {
            mass,
            intensity: 1.0,
        }
    }

    fn ester_input() -> ProcessedInput {
        let mut pairs = PairScores::zeros(3);
        pairs.set(2, 1, 0.2);
        pairs.set(1, 0, 0.3);
        pairs.set(2, 0, 0.1);
        ProcessedInput::new(
            vec![peak(58.0419), peak(72.0575), peak(102.0681)],
            2,
            vec![
                vec![ScoredFormula::new(formula("C3H6O"), 0.4)],
                vec![ScoredFormula::new(formula("C4H8O"), 0.5)],
                Vec::new(),
            ],
            vec![ScoredFormula::new(formula("C5H10O2"), 1.0)],
            pairs,
        )
        .unwrap()
    }

    /// Like `ester_input`, but peak 1 gains a second hypothesis C3H4O2 with a
    /// better standalone score that cannot parent the C3H6O fragment.
    fn competing_input() -> ProcessedInput {
        let mut pairs = PairScores::zeros(3);
        pairs.set(2, 1, 0.2);
        pairs.set(1, 0, 0.3);
        pairs.set(2, 0, 0.1);
        ProcessedInput::new(
            vec![peak(58.0419), peak(72.0575), peak(102.0681)],
            2,
            vec![
                vec![ScoredFormula::new(formula("C3H6O"), 0.4)],
                vec![
                    ScoredFormula::new(formula("C4H8O"), 0.5),
                    ScoredFormula::new(formula("C3H4O2"), 0.6),
                ],
                Vec::new(),
            ],
            vec![ScoredFormula::new(formula("C5H10O2"), 1.0)],
            pairs,
        )
        .unwrap()
    }

    fn build(input: &ProcessedInput) -> FragmentationGraph {
        let pipeline = ScoringPipeline::new();
        GraphBuilder::new(input, &pipeline)
            .build(input.parent_decompositions())
            .unwrap()
    }

    /// Exhaustive reference optimum over all valid edge selections.
    fn brute_force(graph: &FragmentationGraph) -> f64 {
        let edges: Vec<(LossId, _)> = graph.losses_in_order().collect();
        let mut best = f64::NEG_INFINITY;
        for mask in 1u32..(1 << edges.len()) {
            let chosen: Vec<_> = edges
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, e)| e)
                .collect();
            let heads: Vec<FragmentId> = chosen.iter().map(|(_, l)| l.head).collect();
            let head_set: HashSet<FragmentId> = heads.iter().copied().collect();
            if head_set.len() != heads.len() {
                continue; // in-degree above one
            }
            let colors: HashSet<usize> = heads
                .iter()
                .map(|&h| graph.fragment(h).unwrap().peak)
                .collect();
            if colors.len() != heads.len() {
                continue; // peak explained twice
            }
            if !chosen
                .iter()
                .all(|(_, l)| graph.is_root(l.tail) || head_set.contains(&l.tail))
            {
                continue; // disconnected
            }
            let score: f64 = chosen.iter().map(|(_, l)| l.weight).sum();
            best = best.max(score);
        }
        best
    }

    fn assert_valid_tree(graph: &FragmentationGraph, outcome: &SolverOutcome) {
        let head_set: HashSet<FragmentId> = outcome
            .edges
            .iter()
            .map(|&id| graph.loss(id).unwrap().head)
            .collect();
        assert_eq!(head_set.len(), outcome.edges.len());
        let colors: HashSet<usize> = head_set
            .iter()
            .map(|&h| graph.fragment(h).unwrap().peak)
            .collect();
        assert_eq!(colors.len(), head_set.len());
        for &id in &outcome.edges {
            let loss = graph.loss(id).unwrap();
            assert!(graph.is_root(loss.tail) || head_set.contains(&loss.tail));
        }
        let sum: f64 = outcome
            .edges
            .iter()
            .map(|&id| graph.loss(id).unwrap().weight)
            .sum();
        assert!((sum - outcome.objective).abs() < 1e-9);
    }

    #[test]
    fn finds_the_brute_force_optimum() {
        let input = ester_input();
        let graph = build(&input);
        let outcome = BranchBoundSolver::new()
            .solve(&graph, &SolveBudget::unbounded())
            .unwrap();

        assert!(outcome.optimal);
        assert!((outcome.objective - 2.4).abs() < 1e-9);
        assert!((outcome.objective - brute_force(&graph)).abs() < 1e-9);
        assert_valid_tree(&graph, &outcome);
    }

    #[test]
    fn equal_score_ties_prefer_more_explained_peaks() {
        // the C4H8O hypothesis contributes exactly zero weight, so the
        // one-peak and two-peak trees tie on score; the larger tree wins
        let input = ProcessedInput::new(
            vec![peak(72.0575), peak(102.0681)],
            1,
            vec![vec![ScoredFormula::new(formula("C4H8O"), 0.0)], Vec::new()],
            vec![ScoredFormula::new(formula("C5H10O2"), 1.0)],
            PairScores::zeros(2),
        )
        .unwrap();
        let graph = build(&input);
        let outcome = BranchBoundSolver::new()
            .solve(&graph, &SolveBudget::unbounded())
            .unwrap();

        assert!(outcome.optimal);
        assert!((outcome.objective - 1.0).abs() < 1e-9);
        assert_eq!(outcome.edges.len(), 2);
        assert_valid_tree(&graph, &outcome);
    }

    #[test]
    fn colorful_constraint_beats_greedy_local_scores() {
        // C3H4O2 scores better on its own but cannot parent C3H6O, so the
        // full chain through C4H8O wins
        let input = competing_input();
        let graph = build(&input);
        let outcome = BranchBoundSolver::new()
            .solve(&graph, &SolveBudget::unbounded())
            .unwrap();

        assert!(outcome.optimal);
        assert!((outcome.objective - brute_force(&graph)).abs() < 1e-9);
        assert!((outcome.objective - 2.4).abs() < 1e-9);
        let formulas: HashSet<String> = outcome
            .edges
            .iter()
            .map(|&id| {
                let loss = graph.loss(id).unwrap();
                graph.fragment(loss.head).unwrap().formula.to_string()
            })
            .collect();
        assert!(formulas.contains("C4H8O"));
        assert!(!formulas.contains("C3H4O2"));
    }

    #[test]
    fn expired_budget_still_yields_a_valid_tree() {
        let input = competing_input();
        let graph = build(&input);
        let budget = SolveBudget::unbounded();
        budget.cancel_token().cancel();
        let outcome = BranchBoundSolver::new().solve(&graph, &budget).unwrap();

        assert!(!outcome.optimal);
        assert_valid_tree(&graph, &outcome);
        assert!(!outcome.edges.is_empty());
    }

    #[test]
    fn infeasible_graph_yields_no_outcome() {
        let input = ester_input();
        let pipeline = ScoringPipeline::new();
        let graph = GraphBuilder::new(&input, &pipeline).build(&[]).unwrap();
        assert!(
            BranchBoundSolver::new()
                .solve(&graph, &SolveBudget::unbounded())
                .is_none()
        );
    }

    #[test]
    fn repeated_solves_are_deterministic() {
        let input = competing_input();
        let graph = build(&input);
        let solver = BranchBoundSolver::new();
        let first = solver.solve(&graph, &SolveBudget::unbounded()).unwrap();
        let second = solver.solve(&graph, &SolveBudget::unbounded()).unwrap();
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.objective, second.objective);
    }

    #[test]
    fn deadline_in_the_past_is_anytime_not_a_failure() {
        let input = ester_input();
        let graph = build(&input);
        let budget = SolveBudget::with_deadline(Instant::now());
        let outcome = BranchBoundSolver::new().solve(&graph, &budget).unwrap();
        assert!(!outcome.optimal);
        assert_valid_tree(&graph, &outcome);
    }
}
