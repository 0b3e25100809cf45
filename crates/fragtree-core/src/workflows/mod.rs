//! # Workflows Module
//!
//! This module provides the high-level entry point that orchestrates a
//! complete fragmentation-tree analysis for one compound.
//!
//! ## Overview
//!
//! A workflow takes processed spectral input, builds one scored hypothesis
//! graph per precursor candidate, runs the tree optimizer under the
//! configured time budgets, ranks the resulting trees, and optionally
//! recalibrates the input against the best tree before a final rerun.
//!
//! - **Analysis Workflow** ([`analyze`]) - Per-candidate tree computation,
//!   ranking, and recalibration.

pub mod analyze;
