//! # Core Module
//!
//! This module provides the fundamental building blocks for fragmentation-tree
//! computation: chemistry arithmetic, the preprocessed-input data model, the
//! hypothesis graph and result tree structures, and the pluggable scoring
//! pipeline.
//!
//! ## Overview
//!
//! Everything in this layer is stateless and free of orchestration concerns.
//! The engine layer drives these types; external callers consume them.
//!
//! - **Chemistry** ([`chemistry`]) - Molecular formula arithmetic: parsing,
//!   monoisotopic mass, ring-double-bond equivalents, componentwise
//!   subtraction and subtractability tests over a fixed element alphabet.
//! - **Data Models** ([`models`]) - The immutable preprocessed input contract
//!   (peaks, candidate decompositions, peak-pair score matrix), the
//!   fragment/loss hypothesis graph, and the annotated result tree.
//! - **Scoring** ([`scoring`]) - Pluggable scorer traits over peaks,
//!   (peak, formula) pairs, and loss edges, with the built-in scorers used by
//!   the default pipeline.

pub mod chemistry;
pub mod models;
pub mod scoring;
