//! Data structures for fragmentation-tree computation.
//!
//! - [`input`] - the immutable preprocessed-input contract: a mass-ascending
//!   merged peak list, per-peak candidate decompositions, the designated
//!   parent peak, and the dense peak-pair score matrix.
//! - [`graph`] - the scored hypothesis graph: arenas of fragment nodes and
//!   loss edges rooted at a synthetic precursor node.
//! - [`tree`] - the optimization result: an annotated fragmentation tree with
//!   per-node score breakdowns.

pub mod graph;
pub mod input;
pub mod tree;
