//! # fragtree
//!
//! A library for identifying the most plausible fragmentation history of an
//! unknown compound from its tandem mass spectrum (MS/MS): a rooted tree whose
//! nodes are candidate sub-formulas of the precursor molecule and whose edges
//! are chemically valid neutral losses.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`MolecularFormula`, `ProcessedInput`, `FragmentationGraph`,
//!   `FragmentationTree`) and the pure, pluggable scoring pipeline.
//!
//! - **[`engine`]: The Logic Core.** This layer builds the scored hypothesis
//!   graph from a preprocessed peak list (`GraphBuilder`), solves the maximum
//!   colorful subtree problem behind a narrow solver interface
//!   (`TreeSolver`), and refines results through mass recalibration.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer.
//!   It ties the `engine` and `core` together to execute the complete
//!   per-compound computation: candidate iteration, ranking, and the
//!   recalibration loop.

pub mod core;
pub mod engine;
pub mod workflows;
