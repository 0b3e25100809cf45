use crate::core::chemistry::MolecularFormula;
use crate::core::models::graph::{FragmentationGraph, LossId, VertexScore};
use crate::core::models::input::{PeakIndex, ProcessedInput};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Whether a tree was proven optimal or produced by a bounded/interrupted
/// search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Exact,
    Heuristic,
}

/// One explained peak in the result tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub formula: MolecularFormula,
    pub peak: PeakIndex,
    pub observed_mass: f64,
    pub intensity: f64,
    /// Index of the parent node; `None` for the tree root (the precursor
    /// fragment).
    pub parent: Option<usize>,
    /// Neutral loss on the incoming edge; `None` for the tree root.
    pub loss: Option<MolecularFormula>,
    pub vertex_score: VertexScore,
    pub pair_score: f64,
    pub loss_score: f64,
    /// Weight of the incoming edge (for the root: the root-edge weight).
    pub edge_weight: f64,
    /// Cumulative score along the path from the root to this node.
    pub path_score: f64,
}

impl TreeNode {
    /// Signed mass error between the observed peak and the formula's
    /// theoretical mass.
    pub fn mass_error(&self) -> f64 {
        self.observed_mass - self.formula.mass()
    }
}

/// The optimizer's output: one path from the precursor to every retained
/// fragment, one fragment per peak, plus score annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentationTree {
    /// Index of the parent decomposition that seeded the root.
    pub candidate: usize,
    nodes: Vec<TreeNode>,
    pub total_score: f64,
    pub root_score: f64,
    pub resolution: Resolution,
    /// Fraction of the summed peak intensity explained by the tree's nodes.
    pub explained_intensity: f64,
}

impl FragmentationTree {
    /// Walks the selected edge set from the pseudo-root and materializes the
    /// annotated tree. Returns `None` if the selection contains no root edge.
    pub(crate) fn assemble(
        graph: &FragmentationGraph,
        input: &ProcessedInput,
        selected: &[LossId],
        resolution: Resolution,
    ) -> Option<Self> {
        let chosen: HashSet<LossId> = selected.iter().copied().collect();
        let root_edge = graph
            .losses_in_order()
            .find(|(id, loss)| chosen.contains(id) && graph.is_root(loss.tail))?;

        let mut nodes: Vec<TreeNode> = Vec::with_capacity(selected.len());
        // (fragment, incoming edge, parent node index)
        let mut pending = vec![(root_edge.1.head, root_edge.0, None::<usize>)];
        let mut total_score = 0.0;
        while let Some((fragment_id, edge_id, parent)) = pending.pop() {
            let fragment = graph.fragment(fragment_id)?;
            let loss = graph.loss(edge_id)?;
            let peak = input.peak(fragment.peak)?;
            let path_score = parent.map_or(0.0, |p| nodes[p].path_score) + loss.weight;
            total_score += loss.weight;
            let index = nodes.len();
            nodes.push(TreeNode {
                formula: fragment.formula,
                peak: fragment.peak,
                observed_mass: peak.mass,
                intensity: peak.intensity,
                parent,
                loss: parent.map(|_| loss.formula),
                vertex_score: fragment.vertex_score,
                pair_score: loss.pair_score,
                loss_score: loss.loss_score,
                edge_weight: loss.weight,
                path_score,
            });
            // construction order keeps the traversal deterministic
            for (child_edge, child_loss) in graph.losses_in_order() {
                if child_loss.tail == fragment_id && chosen.contains(&child_edge) {
                    pending.push((child_loss.head, child_edge, Some(index)));
                }
            }
        }

        let candidate = graph.fragment(root_edge.1.head)?.candidate.unwrap_or(0);
        let explained: f64 = nodes.iter().map(|n| n.intensity).sum();
        let explained_intensity = if input.total_intensity() > 0.0 {
            explained / input.total_intensity()
        } else {
            0.0
        };
        Some(Self {
            candidate,
            root_score: root_edge.1.weight,
            nodes,
            total_score,
            resolution,
            explained_intensity,
        })
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// The precursor fragment the tree is rooted at.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Number of peaks explained by the tree (one per node, by the colorful
    /// invariant).
    pub fn explained_peaks(&self) -> usize {
        self.nodes.len()
    }

    /// Recomputes the total score from the stored per-edge weights,
    /// independently of `total_score`.
    pub fn recomputed_score(&self) -> f64 {
        self.nodes.iter().map(|n| n.edge_weight).sum()
    }
}
