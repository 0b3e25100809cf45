use phf::{Map, phf_map};

/// Number of elements in the supported alphabet.
pub(crate) const ELEMENT_COUNT: usize = 12;

/// Element symbols, indexed by alphabet position.
pub(crate) const SYMBOLS: [&str; ELEMENT_COUNT] = [
    "C", "H", "N", "O", "P", "S", "Cl", "Br", "I", "F", "Na", "K",
];

/// Monoisotopic masses in Dalton, indexed by alphabet position.
const MONOISOTOPIC_MASSES: [f64; ELEMENT_COUNT] = [
    12.0,
    1.007825032,
    14.003074005,
    15.994914620,
    30.973761998,
    31.972071174,
    34.968852682,
    78.918337600,
    126.904471900,
    18.998403163,
    22.989769282,
    38.963706486,
];

/// Default valences used for ring-double-bond-equivalent computation.
const VALENCES: [i32; ELEMENT_COUNT] = [4, 1, 3, 2, 3, 2, 1, 1, 1, 1, 1, 1];

static SYMBOL_INDEX: Map<&'static str, u8> = phf_map! {
    "C" => 0,
    "H" => 1,
    "N" => 2,
    "O" => 3,
    "P" => 4,
    "S" => 5,
    "Cl" => 6,
    "Br" => 7,
    "I" => 8,
    "F" => 9,
    "Na" => 10,
    "K" => 11,
};

/// Alphabet positions in Hill order (carbon, hydrogen, then alphabetical),
/// used for formatting.
pub(crate) const HILL_ORDER: [usize; ELEMENT_COUNT] = [0, 1, 7, 6, 9, 8, 11, 2, 10, 3, 4, 5];

/// A chemical element from the fixed supported alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element(u8);

impl Element {
    pub const C: Element = Element(0);
    pub const H: Element = Element(1);
    pub const N: Element = Element(2);
    pub const O: Element = Element(3);
    pub const P: Element = Element(4);
    pub const S: Element = Element(5);

    /// Looks up an element by its symbol (e.g. `"Cl"`). Symbols are
    /// case-sensitive.
    pub fn from_symbol(symbol: &str) -> Option<Element> {
        SYMBOL_INDEX.get(symbol).map(|&i| Element(i))
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    pub fn monoisotopic_mass(self) -> f64 {
        MONOISOTOPIC_MASSES[self.0 as usize]
    }

    pub fn valence(self) -> i32 {
        VALENCES[self.0 as usize]
    }

    pub(crate) fn from_index(index: usize) -> Element {
        debug_assert!(index < ELEMENT_COUNT);
        Element(index as u8)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
