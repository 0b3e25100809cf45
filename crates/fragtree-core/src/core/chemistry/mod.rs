//! Molecular formula arithmetic over a fixed element alphabet.
//!
//! Formulas are represented as compact count vectors, so subtraction and
//! subtractability tests are componentwise integer operations. Element
//! constants (monoisotopic masses, valences) live in static tables; no global
//! mutable state is involved.

mod elements;
mod formula;

pub use elements::Element;
pub use formula::{FormulaError, MolecularFormula};
