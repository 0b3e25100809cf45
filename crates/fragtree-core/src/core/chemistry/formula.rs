use super::elements::{ELEMENT_COUNT, Element, HILL_ORDER, SYMBOLS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FormulaError {
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Unexpected character '{0}' in formula")]
    UnexpectedCharacter(char),
    #[error("Element count '{0}' is out of range")]
    CountOutOfRange(String),
}

/// A molecular formula: a multiset of element counts over the supported
/// alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MolecularFormula {
    counts: [i16; ELEMENT_COUNT],
}

impl MolecularFormula {
    /// The empty formula (all counts zero).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a formula in Hill-style notation, e.g. `"C6H12O6"` or `"H2O"`.
    /// Repeated element symbols accumulate.
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let mut counts = [0i16; ELEMENT_COUNT];
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if !c.is_ascii_uppercase() {
                return Err(FormulaError::UnexpectedCharacter(c));
            }
            let mut symbol = c.to_string();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    symbol.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let element = Element::from_symbol(&symbol)
                .ok_or_else(|| FormulaError::UnknownElement(symbol.clone()))?;
            let mut digits = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    digits.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let count = if digits.is_empty() {
                1
            } else {
                digits
                    .parse::<i16>()
                    .map_err(|_| FormulaError::CountOutOfRange(digits.clone()))?
            };
            let slot = &mut counts[element.index()];
            *slot = slot
                .checked_add(count)
                .ok_or(FormulaError::CountOutOfRange(digits))?;
        }
        Ok(Self { counts })
    }

    pub fn count(&self, element: Element) -> i16 {
        self.counts[element.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn total_atoms(&self) -> i32 {
        self.counts.iter().map(|&c| c as i32).sum()
    }

    /// Monoisotopic mass in Dalton.
    pub fn mass(&self) -> f64 {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c as f64 * Element::from_index(i).monoisotopic_mass())
            .sum()
    }

    /// Ring-double-bond equivalents: `1 + Σ n_i (v_i - 2) / 2`.
    pub fn rdbe(&self) -> f64 {
        1.0 + self.valence_balance() as f64 / 2.0
    }

    /// True when the formula has an odd valence balance, i.e. it cannot be an
    /// even-electron (closed-shell) species.
    pub fn maybe_radical(&self) -> bool {
        self.valence_balance().rem_euclid(2) != 0
    }

    fn valence_balance(&self) -> i32 {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c as i32 * (Element::from_index(i).valence() - 2))
            .sum()
    }

    /// True iff every element count in `other` is less than or equal to the
    /// corresponding count in `self`.
    pub fn is_subtractable(&self, other: &MolecularFormula) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(a, b)| a >= b)
    }

    /// Componentwise difference, or `None` when any count would go negative.
    pub fn checked_sub(&self, other: &MolecularFormula) -> Option<MolecularFormula> {
        if !self.is_subtractable(other) {
            return None;
        }
        let mut counts = [0i16; ELEMENT_COUNT];
        for i in 0..ELEMENT_COUNT {
            counts[i] = self.counts[i] - other.counts[i];
        }
        Some(MolecularFormula { counts })
    }

    /// Number of atoms that are neither carbon nor hydrogen.
    pub fn heteroatoms(&self) -> i32 {
        self.total_atoms() - self.count(Element::C) as i32 - self.count(Element::H) as i32
    }

    /// Heteroatom-to-carbon ratio; infinite for carbon-free formulas.
    pub fn hetero_to_carbon_ratio(&self) -> f64 {
        let carbons = self.count(Element::C);
        if carbons == 0 {
            if self.heteroatoms() == 0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            self.heteroatoms() as f64 / carbons as f64
        }
    }
}

impl fmt::Display for MolecularFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &i in &HILL_ORDER {
            match self.counts[i] {
                0 => {}
                1 => write!(f, "{}", SYMBOLS[i])?,
                n => write!(f, "{}{}", SYMBOLS[i], n)?,
            }
        }
        Ok(())
    }
}

impl FromStr for MolecularFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula(text: &str) -> MolecularFormula {
        MolecularFormula::parse(text).unwrap()
    }

    #[test]
    fn parses_and_computes_water_mass() {
        let water = formula("H2O");
        assert_eq!(water.count(Element::H), 2);
        assert_eq!(water.count(Element::O), 1);
        assert!((water.mass() - 18.010564684).abs() < 1e-6);
    }

    #[test]
    fn accumulates_repeated_symbols() {
        assert_eq!(formula("CH3CH2OH"), formula("C2H6O"));
    }

    #[test]
    fn rejects_unknown_elements_and_garbage() {
        assert_eq!(
            MolecularFormula::parse("C2Xe"),
            Err(FormulaError::UnknownElement("Xe".to_string()))
        );
        assert_eq!(
            MolecularFormula::parse("2CO"),
            Err(FormulaError::UnexpectedCharacter('2'))
        );
    }

    #[test]
    fn rdbe_of_benzene_is_four() {
        assert!((formula("C6H6").rdbe() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn radical_parity() {
        assert!(formula("OH").maybe_radical());
        assert!(formula("CH3").maybe_radical());
        assert!(!formula("H2O").maybe_radical());
        assert!(!formula("CO2").maybe_radical());
    }

    #[test]
    fn subtraction_respects_componentwise_bounds() {
        let glucose = formula("C6H12O6");
        let water = formula("H2O");
        assert!(glucose.is_subtractable(&water));
        assert_eq!(glucose.checked_sub(&water), Some(formula("C6H10O5")));
        assert!(!water.is_subtractable(&glucose));
        assert_eq!(water.checked_sub(&glucose), None);
    }

    #[test]
    fn displays_in_hill_order() {
        assert_eq!(formula("H12C6O6").to_string(), "C6H12O6");
        assert_eq!(formula("ClH").to_string(), "HCl");
        assert_eq!(MolecularFormula::empty().to_string(), "");
    }

    #[test]
    fn hetero_ratio_handles_missing_carbon() {
        assert!((formula("C2H6O").hetero_to_carbon_ratio() - 0.5).abs() < 1e-12);
        assert!(formula("H3PO4").hetero_to_carbon_ratio().is_infinite());
        assert_eq!(formula("H2").hetero_to_carbon_ratio(), 0.0);
    }
}
