use phf::{Map, phf_map};
use serde::Serialize;

/// Atomic number reserved for symbols and numbers the table does not know.
pub const UNKNOWN_ATOMIC_NUMBER: i32 = 999;

/// Atomic number of hydrogen; deuterium and tritium share it.
pub const HYDROGEN: i32 = 1;

/// Immutable per-element data used by bond perception and display.
///
/// Covalent radii are in Ångström (Cordero et al. 2008, extended with
/// single-bond radii past curium). Colors are the usual CPK/Jmol palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Element {
    /// Atomic number. Negative values in -9..=-6 are QTAIM critical points.
    pub number: i32,
    /// Canonical symbol (e.g. "C", "Fe", "BCP").
    pub symbol: &'static str,
    /// Covalent radius in Ångström; zero for entries that never bond.
    pub covalent_radius: f64,
    /// Display color as RGB.
    pub color: [u8; 3],
}

impl Element {
    /// Returns `true` for the unknown placeholder entry.
    pub fn is_unknown(&self) -> bool {
        self.number == UNKNOWN_ATOMIC_NUMBER
    }

    /// Returns `true` for critical-point pseudo-elements.
    pub fn is_pseudo(&self) -> bool {
        (-9..=-6).contains(&self.number)
    }

    /// Returns `true` if the entry may take part in bond inference.
    pub fn can_bond(&self) -> bool {
        self.covalent_radius > 0.0
    }
}

const fn el(number: i32, symbol: &'static str, covalent_radius: f64, rgb: u32) -> Element {
    Element {
        number,
        symbol,
        covalent_radius,
        color: [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8],
    }
}

static UNKNOWN: Element = el(UNKNOWN_ATOMIC_NUMBER, "X", 0.0, 0xFF1493);

static PSEUDO_ELEMENTS: [Element; 4] = [
    el(-6, "NNA", 0.0, 0x8B4513),
    el(-7, "BCP", 0.0, 0xFFA500),
    el(-8, "RCP", 0.0, 0xFFFF00),
    el(-9, "CCP", 0.0, 0x00FF00),
];

static ELEMENTS: [Element; 109] = [
    el(1, "H", 0.31, 0xFFFFFF),
    el(2, "He", 0.28, 0xD9FFFF),
    el(3, "Li", 1.28, 0xCC80FF),
    el(4, "Be", 0.96, 0xC2FF00),
    el(5, "B", 0.84, 0xFFB5B5),
    el(6, "C", 0.76, 0x909090),
    el(7, "N", 0.71, 0x3050F8),
    el(8, "O", 0.66, 0xFF0D0D),
    el(9, "F", 0.57, 0x90E050),
    el(10, "Ne", 0.58, 0xB3E3F5),
    el(11, "Na", 1.66, 0xAB5CF2),
    el(12, "Mg", 1.41, 0x8AFF00),
    el(13, "Al", 1.21, 0xBFA6A6),
    el(14, "Si", 1.11, 0xF0C8A0),
    el(15, "P", 1.07, 0xFF8000),
    el(16, "S", 1.05, 0xFFFF30),
    el(17, "Cl", 1.02, 0x1FF01F),
    el(18, "Ar", 1.06, 0x80D1E3),
    el(19, "K", 2.03, 0x8F40D4),
    el(20, "Ca", 1.76, 0x3DFF00),
    el(21, "Sc", 1.70, 0xE6E6E6),
    el(22, "Ti", 1.60, 0xBFC2C7),
    el(23, "V", 1.53, 0xA6A6AB),
    el(24, "Cr", 1.39, 0x8A99C7),
    el(25, "Mn", 1.39, 0x9C7AC7),
    el(26, "Fe", 1.32, 0xE06633),
    el(27, "Co", 1.26, 0xF090A0),
    el(28, "Ni", 1.24, 0x50D050),
    el(29, "Cu", 1.32, 0xC88033),
    el(30, "Zn", 1.22, 0x7D80B0),
    el(31, "Ga", 1.22, 0xC28F8F),
    el(32, "Ge", 1.20, 0x668F8F),
    el(33, "As", 1.19, 0xBD80E3),
    el(34, "Se", 1.20, 0xFFA100),
    el(35, "Br", 1.20, 0xA62929),
    el(36, "Kr", 1.16, 0x5CB8D1),
    el(37, "Rb", 2.20, 0x702EB0),
    el(38, "Sr", 1.95, 0x00FF00),
    el(39, "Y", 1.90, 0x94FFFF),
    el(40, "Zr", 1.75, 0x94E0E0),
    el(41, "Nb", 1.64, 0x73C2C9),
    el(42, "Mo", 1.54, 0x54B5B5),
    el(43, "Tc", 1.47, 0x3B9E9E),
    el(44, "Ru", 1.46, 0x248F8F),
    el(45, "Rh", 1.42, 0x0A7D8C),
    el(46, "Pd", 1.39, 0x006985),
    el(47, "Ag", 1.45, 0xC0C0C0),
    el(48, "Cd", 1.44, 0xFFD98F),
    el(49, "In", 1.42, 0xA67573),
    el(50, "Sn", 1.39, 0x668080),
    el(51, "Sb", 1.39, 0x9E63B5),
    el(52, "Te", 1.38, 0xD47A00),
    el(53, "I", 1.39, 0x940094),
    el(54, "Xe", 1.40, 0x429EB0),
    el(55, "Cs", 2.44, 0x57178F),
    el(56, "Ba", 2.15, 0x00C900),
    el(57, "La", 2.07, 0x70D4FF),
    el(58, "Ce", 2.04, 0xFFFFC7),
    el(59, "Pr", 2.03, 0xD9FFC7),
    el(60, "Nd", 2.01, 0xC7FFC7),
    el(61, "Pm", 1.99, 0xA3FFC7),
    el(62, "Sm", 1.98, 0x8FFFC7),
    el(63, "Eu", 1.98, 0x61FFC7),
    el(64, "Gd", 1.96, 0x45FFC7),
    el(65, "Tb", 1.94, 0x30FFC7),
    el(66, "Dy", 1.92, 0x1FFFC7),
    el(67, "Ho", 1.92, 0x00FF9C),
    el(68, "Er", 1.89, 0x00E675),
    el(69, "Tm", 1.90, 0x00D452),
    el(70, "Yb", 1.87, 0x00BF38),
    el(71, "Lu", 1.87, 0x00AB24),
    el(72, "Hf", 1.75, 0x4DC2FF),
    el(73, "Ta", 1.70, 0x4DA6FF),
    el(74, "W", 1.62, 0x2194D6),
    el(75, "Re", 1.51, 0x267DAB),
    el(76, "Os", 1.44, 0x266696),
    el(77, "Ir", 1.41, 0x175487),
    el(78, "Pt", 1.36, 0xD0D0E0),
    el(79, "Au", 1.36, 0xFFD123),
    el(80, "Hg", 1.32, 0xB8B8D0),
    el(81, "Tl", 1.45, 0xA6544D),
    el(82, "Pb", 1.46, 0x575961),
    el(83, "Bi", 1.48, 0x9E4FB5),
    el(84, "Po", 1.40, 0xAB5C00),
    el(85, "At", 1.50, 0x754F45),
    el(86, "Rn", 1.50, 0x428296),
    el(87, "Fr", 2.60, 0x420066),
    el(88, "Ra", 2.21, 0x007D00),
    el(89, "Ac", 2.15, 0x70ABFA),
    el(90, "Th", 2.06, 0x00BAFF),
    el(91, "Pa", 2.00, 0x00A1FF),
    el(92, "U", 1.96, 0x008FFF),
    el(93, "Np", 1.90, 0x0080FF),
    el(94, "Pu", 1.87, 0x006BFF),
    el(95, "Am", 1.80, 0x545CF2),
    el(96, "Cm", 1.69, 0x785CE3),
    el(97, "Bk", 1.68, 0x8A4FE3),
    el(98, "Cf", 1.68, 0xA136D4),
    el(99, "Es", 1.65, 0xB31FD4),
    el(100, "Fm", 1.67, 0xB31FBA),
    el(101, "Md", 1.73, 0xB30DA6),
    el(102, "No", 1.76, 0xBD0D87),
    el(103, "Lr", 1.61, 0xC70066),
    el(104, "Rf", 1.57, 0xCC0059),
    el(105, "Db", 1.49, 0xD1004F),
    el(106, "Sg", 1.43, 0xD90045),
    el(107, "Bh", 1.41, 0xE00038),
    el(108, "Hs", 1.34, 0xE6002E),
    el(109, "Mt", 1.29, 0xEB0026),
];

static SYMBOL_TO_NUMBER: Map<&'static str, i32> = phf_map! {
    "H" => 1, "D" => 1, "T" => 1, "He" => 2,
    "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8, "F" => 9, "Ne" => 10,
    "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15, "S" => 16, "Cl" => 17, "Ar" => 18,
    "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22, "V" => 23, "Cr" => 24, "Mn" => 25,
    "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29, "Zn" => 30, "Ga" => 31, "Ge" => 32,
    "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
    "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49, "Sn" => 50,
    "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54,
    "Cs" => 55, "Ba" => 56, "La" => 57, "Ce" => 58, "Pr" => 59, "Nd" => 60, "Pm" => 61,
    "Sm" => 62, "Eu" => 63, "Gd" => 64, "Tb" => 65, "Dy" => 66, "Ho" => 67, "Er" => 68,
    "Tm" => 69, "Yb" => 70, "Lu" => 71, "Hf" => 72, "Ta" => 73, "W" => 74, "Re" => 75,
    "Os" => 76, "Ir" => 77, "Pt" => 78, "Au" => 79, "Hg" => 80, "Tl" => 81, "Pb" => 82,
    "Bi" => 83, "Po" => 84, "At" => 85, "Rn" => 86,
    "Fr" => 87, "Ra" => 88, "Ac" => 89, "Th" => 90, "Pa" => 91, "U" => 92, "Np" => 93,
    "Pu" => 94, "Am" => 95, "Cm" => 96, "Bk" => 97, "Cf" => 98, "Es" => 99, "Fm" => 100,
    "Md" => 101, "No" => 102, "Lr" => 103, "Rf" => 104, "Db" => 105, "Sg" => 106,
    "Bh" => 107, "Hs" => 108, "Mt" => 109,
};

/// Looks up an element by symbol.
///
/// The first letter is matched case-insensitively and the remainder is folded to
/// lower case, so `"fe"`, `"Fe"` and `"FE"` all resolve to iron. Critical-point
/// pseudo-element symbols are matched case-insensitively. Never fails: unknown
/// symbols resolve to the placeholder with number 999 and radius 0.
pub fn by_symbol(symbol: &str) -> &'static Element {
    let symbol = symbol.trim();
    if let Some(pseudo) = PSEUDO_ELEMENTS
        .iter()
        .find(|e| e.symbol.eq_ignore_ascii_case(symbol))
    {
        return pseudo;
    }

    let mut chars = symbol.chars();
    let Some(first) = chars.next() else {
        return &UNKNOWN;
    };
    let canonical: String = std::iter::once(first.to_ascii_uppercase())
        .chain(chars.map(|c| c.to_ascii_lowercase()))
        .collect();

    SYMBOL_TO_NUMBER
        .get(canonical.as_str())
        .map_or(&UNKNOWN, |&z| by_number(z))
}

/// Looks up an element by atomic number. Never fails.
pub fn by_number(number: i32) -> &'static Element {
    match number {
        1..=109 => &ELEMENTS[(number - 1) as usize],
        -9..=-6 => &PSEUDO_ELEMENTS[(-number - 6) as usize],
        _ => &UNKNOWN,
    }
}

/// Covalent radius of the given atomic number (0 for unknown and pseudo entries).
pub fn covalent_radius(number: i32) -> f64 {
    by_number(number).covalent_radius
}

/// Largest covalent radius present in the table.
pub fn max_covalent_radius() -> f64 {
    ELEMENTS
        .iter()
        .map(|e| e.covalent_radius)
        .fold(0.0, f64::max)
}

/// Iterates over all real elements in ascending atomic number.
pub fn all() -> impl Iterator<Item = &'static Element> {
    ELEMENTS.iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_atomic_number() {
        for (i, element) in ELEMENTS.iter().enumerate() {
            assert_eq!(element.number, i as i32 + 1);
            assert_eq!(by_number(element.number), element);
        }
    }

    #[test]
    fn every_symbol_in_the_map_round_trips() {
        for element in all() {
            assert_eq!(by_symbol(element.symbol).number, element.number);
        }
    }

    #[test]
    fn symbol_lookup_tolerates_case() {
        assert_eq!(by_symbol("fe").number, 26);
        assert_eq!(by_symbol("FE").number, 26);
        assert_eq!(by_symbol(" Cl ").number, 17);
        assert_eq!(by_symbol("c").number, 6);
    }

    #[test]
    fn hydrogen_isotopes_map_to_hydrogen() {
        assert_eq!(by_symbol("D").number, HYDROGEN);
        assert_eq!(by_symbol("T").number, HYDROGEN);
    }

    #[test]
    fn unknown_lookups_return_placeholder() {
        let unknown = by_symbol("Qq");
        assert!(unknown.is_unknown());
        assert_eq!(unknown.number, UNKNOWN_ATOMIC_NUMBER);
        assert_eq!(unknown.covalent_radius, 0.0);
        assert!(by_symbol("").is_unknown());
        assert!(by_number(0).is_unknown());
        assert!(by_number(110).is_unknown());
        assert!(by_number(-3).is_unknown());
    }

    #[test]
    fn pseudo_elements_have_zero_radius() {
        for z in -9..=-6 {
            let element = by_number(z);
            assert!(element.is_pseudo());
            assert!(!element.can_bond());
            assert_eq!(covalent_radius(z), 0.0);
        }
        assert_eq!(by_symbol("bcp").number, -7);
        assert_eq!(by_symbol("CCP").number, -9);
    }

    #[test]
    fn common_radii_and_colors() {
        assert_eq!(covalent_radius(6), 0.76);
        assert_eq!(covalent_radius(8), 0.66);
        assert_eq!(by_number(8).color, [0xFF, 0x0D, 0x0D]);
        assert_eq!(max_covalent_radius(), 2.60);
    }
}
