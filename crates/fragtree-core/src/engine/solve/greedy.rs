use super::{SolveBudget, SolverOutcome, TreeSolver};
use crate::core::models::graph::{FragmentId, FragmentationGraph, LossId};
use slotmap::SecondaryMap;

/// Fast heuristic lower bound for the maximum colorful subtree.
///
/// Attaches the best root edge first, then repeatedly scans the remaining
/// edges in descending weight order and attaches the first admissible one.
/// Nonnegative-weight edges are kept, so zero-weight attachments still grow
/// peak coverage. Outcomes are never marked optimal.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedySolver;

impl GreedySolver {
    pub fn new() -> Self {
        Self
    }
}

impl TreeSolver for GreedySolver {
    fn solve(&self, graph: &FragmentationGraph, _budget: &SolveBudget) -> Option<SolverOutcome> {
        if graph.is_infeasible() {
            return None;
        }

        let (root_edge, root_loss) = graph
            .losses_in_order()
            .filter(|(_, loss)| graph.is_root(loss.tail))
            .max_by(|a, b| a.1.weight.total_cmp(&b.1.weight))?;

        let mut in_tree: SecondaryMap<FragmentId, ()> = SecondaryMap::new();
        in_tree.insert(graph.root(), ());
        in_tree.insert(root_loss.head, ());
        let mut used_color = vec![false; graph.peak_count()];
        used_color[graph.fragment(root_loss.head)?.peak] = true;
        let mut selected: Vec<LossId> = vec![root_edge];
        let mut objective = root_loss.weight;

        // stable sort keeps equal-weight edges in construction order
        let mut candidates: Vec<(LossId, FragmentId, FragmentId, f64)> = graph
            .losses_in_order()
            .filter(|(id, loss)| {
                *id != root_edge && !graph.is_root(loss.tail) && loss.weight >= 0.0
            })
            .map(|(id, loss)| (id, loss.tail, loss.head, loss.weight))
            .collect();
        candidates.sort_by(|a, b| b.3.total_cmp(&a.3));

        loop {
            let next = candidates.iter().position(|&(_, tail, head, _)| {
                in_tree.contains_key(tail)
                    && !in_tree.contains_key(head)
                    && !used_color[graph.fragment(head).map(|f| f.peak).unwrap_or(0)]
            });
            let Some(index) = next else {
                break;
            };
            let (id, _, head, weight) = candidates.remove(index);
            in_tree.insert(head, ());
            if let Some(fragment) = graph.fragment(head) {
                used_color[fragment.peak] = true;
            }
            selected.push(id);
            objective += weight;
        }

        Some(SolverOutcome {
            edges: selected,
            objective,
            optimal: false,
        })
    }
}
