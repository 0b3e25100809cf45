use crate::core::models::graph::{Fragment, FragmentId, FragmentationGraph, VertexScore};
use crate::core::models::input::{PeakIndex, ProcessedInput, ScoredFormula};
use crate::core::scoring::{ScoringError, ScoringPipeline};
use slotmap::SecondaryMap;
use tracing::{debug, instrument};

/// Constructs the scored hypothesis graph for one compound.
///
/// Construction runs in two passes over the same graph: a structure pass
/// that places fragments in descending peak-mass order and wires every
/// admissible loss edge, and a scoring pass that fills vertex scores and
/// edge weights once the topology is fixed.
pub struct GraphBuilder<'a> {
    input: &'a ProcessedInput,
    pipeline: &'a ScoringPipeline,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(input: &'a ProcessedInput, pipeline: &'a ScoringPipeline) -> Self {
        Self { input, pipeline }
    }

    /// Builds the graph for the given parent candidates. Hypotheses without
    /// any admissible parent are discarded; a graph whose pseudo-root has no
    /// outgoing edge is returned as-is and reported infeasible.
    #[instrument(skip_all, fields(peaks = self.input.peaks().len(), candidates = candidates.len()))]
    pub fn build(&self, candidates: &[ScoredFormula]) -> Result<FragmentationGraph, ScoringError> {
        let mut graph = self.build_structure(candidates);
        self.score_graph(&mut graph)?;
        debug!(
            fragments = graph.fragment_count(),
            losses = graph.loss_count(),
            "hypothesis graph built"
        );
        Ok(graph)
    }

    fn build_structure(&self, candidates: &[ScoredFormula]) -> FragmentationGraph {
        let peaks = self.input.peaks();
        let parent = self.input.parent_peak_index();
        let parent_mass = self.input.parent_peak().mass;
        let mut graph = FragmentationGraph::new(parent, peaks.len());
        let root = graph.root();

        // placed fragments, heaviest peaks first
        let mut placed: Vec<(FragmentId, PeakIndex)> = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let id = graph.add_fragment(Fragment {
                peak: parent,
                formula: candidate.formula,
                vertex_score: VertexScore {
                    candidate: candidate.score,
                    ..VertexScore::default()
                },
                candidate: Some(index),
                incoming: Vec::new(),
                outgoing: Vec::new(),
            });
            graph.add_loss(root, id, crate::core::chemistry::MolecularFormula::empty());
            placed.push((id, parent));
        }

        // peaks are sorted ascending, so the reverse scan visits fragments
        // before any of their possible children
        for peak in (0..peaks.len()).rev() {
            if peak == parent || peaks[peak].mass >= parent_mass {
                continue;
            }
            for hypothesis in self.input.decompositions(peak) {
                let mut parents = Vec::new();
                for &(tail, tail_peak) in &placed {
                    if tail_peak == peak || peaks[tail_peak].mass <= peaks[peak].mass {
                        continue;
                    }
                    let tail_formula = graph
                        .fragment(tail)
                        .map(|f| f.formula)
                        .unwrap_or_default();
                    if let Some(loss) = tail_formula.checked_sub(&hypothesis.formula) {
                        if !loss.is_empty() {
                            parents.push((tail, loss));
                        }
                    }
                }
                if parents.is_empty() {
                    continue;
                }
                let id = graph.add_fragment(Fragment {
                    peak,
                    formula: hypothesis.formula,
                    vertex_score: VertexScore {
                        candidate: hypothesis.score,
                        ..VertexScore::default()
                    },
                    candidate: None,
                    incoming: Vec::new(),
                    outgoing: Vec::new(),
                });
                for (tail, loss) in parents {
                    graph.add_loss(tail, id, loss);
                }
                placed.push((id, peak));
            }
        }
        graph
    }

    fn score_graph(&self, graph: &mut FragmentationGraph) -> Result<(), ScoringError> {
        let fragment_ids: Vec<FragmentId> = graph
            .fragments_in_order()
            .skip(1)
            .map(|(id, _)| id)
            .collect();
        let mut totals: SecondaryMap<FragmentId, f64> = SecondaryMap::new();
        for id in fragment_ids {
            let (peak_index, formula, candidate) = {
                let Some(fragment) = graph.fragment(id) else {
                    continue;
                };
                (fragment.peak, fragment.formula, fragment.vertex_score.candidate)
            };
            let peak = *self
                .input
                .peak(peak_index)
                .ok_or(ScoringError::PeakOutOfRange(peak_index))?;
            let vertex = VertexScore {
                candidate,
                formula_prior: self.pipeline.formula_prior(&formula, &peak, self.input)?,
                peak: self.pipeline.peak_score(peak_index, self.input)?,
            };
            totals.insert(id, vertex.total());
            graph.fragment_mut(id).vertex_score = vertex;
        }

        let prepared = self.pipeline.prepare_losses(self.input);
        let edges: Vec<_> = graph
            .losses_in_order()
            .map(|(id, loss)| (id, loss.tail, loss.head, loss.formula))
            .collect();
        for (id, tail, head, formula) in edges {
            let head_total = totals[head];
            if graph.is_root(tail) {
                let loss = graph.loss_mut(id);
                loss.weight = head_total;
                continue;
            }
            let tail_peak = graph.fragment(tail).map(|f| f.peak).unwrap_or_default();
            let head_peak = graph.fragment(head).map(|f| f.peak).unwrap_or_default();
            let pair_score = self.input.pair_score(tail_peak, head_peak);
            let loss_score = ScoringPipeline::loss_score(&prepared, &formula, self.input)?;
            let loss = graph.loss_mut(id);
            loss.pair_score = pair_score;
            loss.loss_score = loss_score;
            loss.weight = head_total + pair_score + loss_score;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chemistry::MolecularFormula;
    use crate::core::models::input::{PairScores, Peak};
    use crate::core::scoring::{LossScorer, PreparedLossScorer};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn formula(text: &str) -> MolecularFormula {
        MolecularFormula::parse(text).unwrap()
    }

    fn peak(mass: f64) -> Peak {
        Peak {
            mass,
            intensity: 1.0,
        }
    }

    /// Three peaks, one candidate per peak: the parent C5H10O2, C4H8O, and
    /// C3H6O, chained by CH2O and CH2 losses.
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

    fn edge_weights(graph: &FragmentationGraph) -> Vec<(String, String, f64)> {
        graph
            .losses_in_order()
            .map(|(_, loss)| {
                let tail = graph.fragment(loss.tail).unwrap().formula.to_string();
                let head = graph.fragment(loss.head).unwrap().formula.to_string();
                (tail, head, loss.weight)
            })
            .collect()
    }

    #[test]
    fn builds_all_admissible_edges_with_candidate_and_pair_weights() {
        let input = ester_input();
        let pipeline = ScoringPipeline::new();
        let graph = GraphBuilder::new(&input, &pipeline)
            .build(input.parent_decompositions())
            .unwrap();

        assert_eq!(graph.fragment_count(), 3);
        let weights = edge_weights(&graph);
        assert_eq!(weights.len(), 4);
        let expect = |tail: &str, head: &str, weight: f64| {
            let found = weights
                .iter()
                .find(|(t, h, _)| t == tail && h == head)
                .unwrap_or_else(|| panic!("missing edge {tail} -> {head}"));
            assert!((found.2 - weight).abs() < 1e-12);
        };
        expect("", "C5H10O2", 1.0);
        expect("C5H10O2", "C4H8O", 0.7);
        expect("C4H8O", "C3H6O", 0.7);
        expect("C5H10O2", "C3H6O", 0.5);
    }

    #[test]
    fn loss_formulas_are_componentwise_differences() {
        let input = ester_input();
        let pipeline = ScoringPipeline::new();
        let graph = GraphBuilder::new(&input, &pipeline)
            .build(input.parent_decompositions())
            .unwrap();

        let losses: Vec<String> = graph
            .losses_in_order()
            .filter(|(_, loss)| !graph.is_root(loss.tail))
            .map(|(_, loss)| loss.formula.to_string())
            .collect();
        assert!(losses.contains(&"CH2O".to_string()));
        assert!(losses.contains(&"CH2".to_string()));
        assert!(losses.contains(&"C2H4O".to_string()));
    }

    #[test]
    fn hypotheses_without_an_admissible_parent_are_discarded() {
        // C3H9N is not subtractable from the pure-CHO candidate
        let input = ProcessedInput::new(
            vec![peak(59.0735), peak(102.0681)],
            1,
            vec![
                vec![ScoredFormula::new(formula("C3H9N"), 0.8)],
                Vec::new(),
            ],
            vec![ScoredFormula::new(formula("C5H10O2"), 1.0)],
            PairScores::zeros(2),
        )
        .unwrap();
        let pipeline = ScoringPipeline::new();
        let graph = GraphBuilder::new(&input, &pipeline)
            .build(input.parent_decompositions())
            .unwrap();

        assert_eq!(graph.fragment_count(), 1);
        assert_eq!(graph.loss_count(), 1);
    }

    #[test]
    fn peaks_at_or_above_the_parent_mass_are_excluded() {
        let input = ProcessedInput::new(
            vec![peak(72.0575), peak(102.0681), peak(120.0786)],
            1,
            vec![
                vec![ScoredFormula::new(formula("C4H8O"), 0.5)],
                Vec::new(),
                vec![ScoredFormula::new(formula("C5H12O3"), 0.9)],
            ],
            vec![ScoredFormula::new(formula("C5H10O2"), 1.0)],
            PairScores::zeros(3),
        )
        .unwrap();
        let pipeline = ScoringPipeline::new();
        let graph = GraphBuilder::new(&input, &pipeline)
            .build(input.parent_decompositions())
            .unwrap();

        for (_, fragment) in graph.fragments_in_order().skip(1) {
            assert_ne!(fragment.peak, 2);
        }
    }

    #[test]
    fn no_candidates_yields_an_infeasible_graph() {
        let input = ester_input();
        let pipeline = ScoringPipeline::new();
        let graph = GraphBuilder::new(&input, &pipeline).build(&[]).unwrap();
        assert!(graph.is_infeasible());
        assert_eq!(graph.fragment_count(), 0);
    }

    struct CountingLossScorer {
        prepares: Arc<AtomicUsize>,
    }

    struct PreparedCounting;

    impl PreparedLossScorer for PreparedCounting {
        fn score(
            &self,
            _loss: &MolecularFormula,
            _input: &ProcessedInput,
        ) -> Result<f64, ScoringError> {
            Ok(0.25)
        }
    }

    impl LossScorer for CountingLossScorer {
        fn prepare<'a>(&'a self, _input: &ProcessedInput) -> Box<dyn PreparedLossScorer + 'a> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            Box::new(PreparedCounting)
        }
    }

    #[test]
    fn loss_scorers_are_prepared_once_per_build() {
        let input = ester_input();
        let prepares = Arc::new(AtomicUsize::new(0));
        let scorer = CountingLossScorer {
            prepares: Arc::clone(&prepares),
        };
        let pipeline = ScoringPipeline::new().with_loss_scorer(scorer);
        let graph = GraphBuilder::new(&input, &pipeline)
            .build(input.parent_decompositions())
            .unwrap();

        assert_eq!(prepares.load(Ordering::SeqCst), 1);

        // one prepare, three scored non-root edges
        let non_root: Vec<f64> = graph
            .losses_in_order()
            .filter(|(_, loss)| !graph.is_root(loss.tail))
            .map(|(_, loss)| loss.loss_score)
            .collect();
        assert_eq!(non_root.len(), 3);
        assert!(non_root.iter().all(|&s| (s - 0.25).abs() < 1e-12));
    }
}
