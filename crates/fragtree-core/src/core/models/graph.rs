use crate::core::chemistry::MolecularFormula;
use crate::core::models::input::PeakIndex;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct FragmentId;
    pub struct LossId;
}

/// Per-fragment score components shared by every incoming edge of the
/// fragment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexScore {
    /// Score of the external candidate decomposition.
    pub candidate: f64,
    /// Sum of the formula-scorer adjustments for this (peak, formula) pair.
    pub formula_prior: f64,
    /// Sum of the peak-scorer contributions for explaining this peak at all.
    pub peak: f64,
}

impl VertexScore {
    pub fn total(&self) -> f64 {
        self.candidate + self.formula_prior + self.peak
    }
}

/// A hypothesis that one peak's ion corresponds to one molecular formula.
/// Multiple fragments may share a peak index; at most one of them may appear
/// in the final tree.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub peak: PeakIndex,
    pub formula: MolecularFormula,
    pub vertex_score: VertexScore,
    /// Position in the parent-candidate list when this fragment is a direct
    /// child of the pseudo-root; `None` for ordinary fragments.
    pub candidate: Option<usize>,
    pub incoming: Vec<LossId>,
    pub outgoing: Vec<LossId>,
}

/// A directed edge from a heavier fragment (tail) to a lighter one (head);
/// the formula difference is the neutral loss. Root edges carry an empty loss
/// formula.
#[derive(Debug, Clone)]
pub struct Loss {
    pub tail: FragmentId,
    pub head: FragmentId,
    pub formula: MolecularFormula,
    pub pair_score: f64,
    pub loss_score: f64,
    /// Total weight used by the optimizer: head vertex score plus the
    /// pair and loss components.
    pub weight: f64,
}

/// The scored hypothesis graph for one compound: fragment and loss arenas
/// rooted at a synthetic precursor node. Built once per candidate set,
/// read-only to the optimizer.
#[derive(Debug)]
pub struct FragmentationGraph {
    fragments: SlotMap<FragmentId, Fragment>,
    losses: SlotMap<LossId, Loss>,
    root: FragmentId,
    fragment_order: Vec<FragmentId>,
    loss_order: Vec<LossId>,
    peak_count: usize,
}

impl FragmentationGraph {
    /// Creates a graph containing only the pseudo-root, placed at the parent
    /// peak with an empty formula.
    pub(crate) fn new(parent_peak: PeakIndex, peak_count: usize) -> Self {
        let mut fragments = SlotMap::with_key();
        let root = fragments.insert(Fragment {
            peak: parent_peak,
            formula: MolecularFormula::empty(),
            vertex_score: VertexScore::default(),
            candidate: None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        Self {
            fragments,
            losses: SlotMap::with_key(),
            root,
            fragment_order: vec![root],
            loss_order: Vec::new(),
            peak_count,
        }
    }

    pub fn root(&self) -> FragmentId {
        self.root
    }

    pub fn is_root(&self, id: FragmentId) -> bool {
        id == self.root
    }

    pub fn peak_count(&self) -> usize {
        self.peak_count
    }

    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(id)
    }

    pub fn loss(&self, id: LossId) -> Option<&Loss> {
        self.losses.get(id)
    }

    /// Fragments in deterministic construction order, pseudo-root first.
    pub fn fragments_in_order(&self) -> impl Iterator<Item = (FragmentId, &Fragment)> {
        self.fragment_order.iter().map(|&id| (id, &self.fragments[id]))
    }

    /// Losses in deterministic construction order.
    pub fn losses_in_order(&self) -> impl Iterator<Item = (LossId, &Loss)> {
        self.loss_order.iter().map(|&id| (id, &self.losses[id]))
    }

    /// Number of fragments excluding the pseudo-root.
    pub fn fragment_count(&self) -> usize {
        self.fragment_order.len() - 1
    }

    pub fn loss_count(&self) -> usize {
        self.loss_order.len()
    }

    /// True when no candidate decomposition could be attached, i.e. the
    /// pseudo-root has no outgoing edges and no tree exists.
    pub fn is_infeasible(&self) -> bool {
        self.fragments[self.root].outgoing.is_empty()
    }

    pub(crate) fn add_fragment(&mut self, fragment: Fragment) -> FragmentId {
        let id = self.fragments.insert(fragment);
        self.fragment_order.push(id);
        id
    }

    pub(crate) fn add_loss(
        &mut self,
        tail: FragmentId,
        head: FragmentId,
        formula: MolecularFormula,
    ) -> LossId {
        let id = self.losses.insert(Loss {
            tail,
            head,
            formula,
            pair_score: 0.0,
            loss_score: 0.0,
            weight: 0.0,
        });
        self.fragments[tail].outgoing.push(id);
        self.fragments[head].incoming.push(id);
        self.loss_order.push(id);
        id
    }

    pub(crate) fn fragment_mut(&mut self, id: FragmentId) -> &mut Fragment {
        &mut self.fragments[id]
    }

    pub(crate) fn loss_mut(&mut self, id: LossId) -> &mut Loss {
        &mut self.losses[id]
    }
}
