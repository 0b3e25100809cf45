//! # Engine Module
//!
//! This module implements the computational machinery for fragmentation-tree
//! analysis: hypothesis-graph construction, tree optimization, and mass
//! recalibration.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules that handle different
//! aspects of the analysis process:
//!
//! - **Configuration** ([`config`]) - Analysis parameters, time budgets, and settings
//! - **Graph Building** ([`builder`]) - Scored hypothesis-graph construction from processed input
//! - **Tree Solving** ([`solve`]) - Exact and heuristic maximum colorful subtree solvers
//! - **Recalibration** ([`recalibrate`]) - Mass-error model fitting and input correction
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user feedback mechanisms
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation

pub mod builder;
pub mod config;
pub mod error;
pub mod progress;
pub mod recalibrate;
pub mod solve;
