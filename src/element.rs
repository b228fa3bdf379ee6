use crate::bond::BondOrder;

static OUTER_ELECTRONS: [u8; 119] = [
    0,  // dummy
    1, 2,                                                       // H  He
    1, 2, 3, 4, 5, 6, 7, 8,                                    // Li Be B  C  N  O  F  Ne
    1, 2, 3, 4, 5, 6, 7, 8,                                    // Na Mg Al Si P  S  Cl Ar
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 3, 4, 5, 6, 7, 8, // K  Ca Sc..Zn Ga Ge As Se Br Kr
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 3, 4, 5, 6, 7, 8, // Rb Sr Y ..Cd In Sn Sb Te I  Xe
    1, 2,                                                       // Cs Ba
    3, 4, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14,            // La Ce..Yb
    3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 3, 4, 5, 6, 7, 8,       // Lu Hf..Hg Tl Pb Bi Po At Rn
    1, 2,                                                       // Fr Ra
    3, 4, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14,            // Ac Th..No
    3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 3, 4, 5, 6, 7, 8,       // Lr Rf..Cn Nh Fl Mc Lv Ts Og
];

/// Element of the periodic table, `repr(u8)` by atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Element {
    H = 1,
    He = 2,
    Li = 3,
    Be = 4,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Ne = 10,
    Na = 11,
    Mg = 12,
    Al = 13,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    Ar = 18,
    K = 19,
    Ca = 20,
    Sc = 21,
    Ti = 22,
    V = 23,
    Cr = 24,
    Mn = 25,
    Fe = 26,
    Co = 27,
    Ni = 28,
    Cu = 29,
    Zn = 30,
    Ga = 31,
    Ge = 32,
    As = 33,
    Se = 34,
    Br = 35,
    Kr = 36,
    Rb = 37,
    Sr = 38,
    Y = 39,
    Zr = 40,
    Nb = 41,
    Mo = 42,
    Tc = 43,
    Ru = 44,
    Rh = 45,
    Pd = 46,
    Ag = 47,
    Cd = 48,
    In = 49,
    Sn = 50,
    Sb = 51,
    Te = 52,
    I = 53,
    Xe = 54,
    Cs = 55,
    Ba = 56,
    La = 57,
    Ce = 58,
    Pr = 59,
    Nd = 60,
    Pm = 61,
    Sm = 62,
    Eu = 63,
    Gd = 64,
    Tb = 65,
    Dy = 66,
    Ho = 67,
    Er = 68,
    Tm = 69,
    Yb = 70,
    Lu = 71,
    Hf = 72,
    Ta = 73,
    W = 74,
    Re = 75,
    Os = 76,
    Ir = 77,
    Pt = 78,
    Au = 79,
    Hg = 80,
    Tl = 81,
    Pb = 82,
    Bi = 83,
    Po = 84,
    At = 85,
    Rn = 86,
    Fr = 87,
    Ra = 88,
    Ac = 89,
    Th = 90,
    Pa = 91,
    U = 92,
    Np = 93,
    Pu = 94,
    Am = 95,
    Cm = 96,
    Bk = 97,
    Cf = 98,
    Es = 99,
    Fm = 100,
    Md = 101,
    No = 102,
    Lr = 103,
    Rf = 104,
    Db = 105,
    Sg = 106,
    Bh = 107,
    Hs = 108,
    Mt = 109,
    Ds = 110,
    Rg = 111,
    Cn = 112,
    Nh = 113,
    Fl = 114,
    Mc = 115,
    Lv = 116,
    Ts = 117,
    Og = 118,
}

impl Element {
    pub fn from_atomic_num(n: u8) -> Option<Element> {
        if (1..=118).contains(&n) {
            // SAFETY: Element is repr(u8) with variants 1..=118, and we checked bounds.
            Some(unsafe { std::mem::transmute::<u8, Element>(n) })
        } else {
            None
        }
    }

    pub fn from_symbol(s: &str) -> Option<Element> {
        SYMBOLS
            .iter()
            .position(|sym| *sym == s)
            .and_then(|i| Element::from_atomic_num(i as u8 + 1))
    }

    pub fn all() -> impl Iterator<Item = Element> {
        (1..=118).filter_map(Element::from_atomic_num)
    }

    pub fn atomic_num(self) -> u8 {
        self as u8
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self as usize - 1]
    }

    /// Mass number of the most abundant (or longest-lived) isotope.
    ///
    /// The legacy atom block stores isotopes as a difference to this value.
    pub fn abundant_isotope(self) -> u16 {
        ABUNDANT_ISOTOPES[self as usize - 1]
    }

    pub fn outer_electrons(self) -> u8 {
        OUTER_ELECTRONS[self as usize]
    }

    pub fn default_valences(self) -> &'static [u8] {
        match self {
            Element::H => &[1],
            Element::B => &[3],
            Element::C => &[4],
            Element::N => &[3, 5],
            Element::O => &[2],
            Element::F | Element::Cl | Element::Br | Element::At => &[1],
            Element::Si | Element::Ge => &[4],
            Element::P | Element::As => &[3, 5],
            Element::S | Element::Se | Element::Te => &[2, 4, 6],
            Element::I => &[1, 3, 5, 7],
            _ => &[],
        }
    }

    /// Valences allowed for this element carrying `charge`.
    ///
    /// Charged atoms are treated as isoelectronic neighbours: a cation of a
    /// group 15-17 element gains one bond per unit charge, carbon loses one
    /// per unit of either sign, boron gains one per unit of negative charge.
    pub fn valences(self, charge: i8) -> Vec<u8> {
        let shift: i16 = match self.outer_electrons() {
            4 => -(charge.unsigned_abs() as i16),
            n if n > 4 => charge as i16,
            _ => -(charge as i16),
        };
        self.default_valences()
            .iter()
            .filter_map(|&v| u8::try_from(v as i16 + shift).ok())
            .collect()
    }

    /// Number of hydrogens needed to saturate the lowest valence that can
    /// accommodate `bonds`. Zero for elements without a valence table or when
    /// every valence is already exceeded.
    pub fn implicit_hydrogens(self, charge: i8, bonds: &[BondOrder]) -> u8 {
        let used = bond_valence(bonds);
        self.valences(charge)
            .into_iter()
            .find(|&v| v >= used)
            .map(|v| v - used)
            .unwrap_or(0)
    }

    /// Whether the bonding environment fits one of the allowed valences.
    ///
    /// Elements without a valence table always pass. Neighbors are `None`
    /// for wildcard atoms; only the bond orders are weighed.
    pub fn check_valence(self, charge: i8, environment: &[(BondOrder, Option<Element>)]) -> bool {
        if self.default_valences().is_empty() {
            return true;
        }
        let allowed = self.valences(charge);
        let orders: Vec<BondOrder> = environment.iter().map(|(order, _)| *order).collect();
        let used = bond_valence(&orders);
        allowed.iter().any(|&v| v >= used)
    }
}

/// Valence consumed by a multiset of bond orders. Two aromatic bonds count
/// as three, three as four; query (any) bonds count as single.
pub fn bond_valence(bonds: &[BondOrder]) -> u8 {
    let mut aromatic = 0u8;
    let mut total = 0u8;
    for order in bonds {
        match order {
            BondOrder::Aromatic => aromatic += 1,
            BondOrder::Single | BondOrder::Any => total += 1,
            BondOrder::Double => total += 2,
            BondOrder::Triple => total += 3,
        }
    }
    total + aromatic * 3 / 2
}

static SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca",
    "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr",
    "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn",
    "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd",
    "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th",
    "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm",
    "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds",
    "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

// Mass number of the most abundant isotope; longest-lived for radioactive elements.
static ABUNDANT_ISOTOPES: [u16; 118] = [
    1, 4, 7, 9, 11, 12, 14, 16, 19, 20,
    23, 24, 27, 28, 31, 32, 35, 40, 39, 40,
    45, 48, 51, 52, 55, 56, 59, 58, 63, 64,
    69, 74, 75, 80, 79, 84, 85, 88, 89, 90,
    93, 98, 97, 102, 103, 106, 107, 114, 115, 120,
    121, 130, 127, 132, 133, 138, 139, 140, 141, 142,
    145, 152, 153, 158, 159, 164, 165, 166, 169, 174,
    175, 180, 181, 184, 187, 192, 193, 195, 197, 202,
    205, 208, 209, 209, 210, 222, 223, 226, 227, 232,
    231, 238, 237, 244, 243, 247, 247, 251, 252, 257,
    258, 259, 266, 267, 268, 269, 270, 277, 278, 281,
    282, 285, 286, 289, 290, 293, 294, 294,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trip() {
        for e in Element::all() {
            assert_eq!(Element::from_symbol(e.symbol()), Some(e));
        }
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::from_symbol("c"), None);
    }

    #[test]
    fn abundant_isotopes() {
        assert_eq!(Element::H.abundant_isotope(), 1);
        assert_eq!(Element::C.abundant_isotope(), 12);
        assert_eq!(Element::Cl.abundant_isotope(), 35);
        assert_eq!(Element::Fe.abundant_isotope(), 56);
    }

    #[test]
    fn methane_carbon_needs_four() {
        assert_eq!(Element::C.implicit_hydrogens(0, &[]), 4);
        assert_eq!(Element::C.implicit_hydrogens(0, &[BondOrder::Double]), 2);
        assert_eq!(
            Element::C.implicit_hydrogens(0, &[BondOrder::Aromatic, BondOrder::Aromatic]),
            1
        );
    }

    #[test]
    fn nitrogen_hypervalent_branch() {
        let four = [BondOrder::Single; 4];
        assert_eq!(Element::N.implicit_hydrogens(0, &four), 1);
        assert_eq!(Element::N.implicit_hydrogens(1, &[]), 4);
    }

    #[test]
    fn charged_oxygen() {
        assert_eq!(Element::O.implicit_hydrogens(-1, &[]), 1);
        assert_eq!(Element::O.implicit_hydrogens(1, &[]), 3);
    }

    #[test]
    fn metals_have_no_implicit_h() {
        assert_eq!(Element::Fe.implicit_hydrogens(0, &[]), 0);
        assert!(Element::Fe.check_valence(0, &[(BondOrder::Single, Some(Element::C)); 6]));
    }

    #[test]
    fn pentavalent_carbon_fails() {
        let env = [(BondOrder::Single, Some(Element::H)); 5];
        assert!(!Element::C.check_valence(0, &env));
        assert!(Element::C.check_valence(0, &env[..4]));
    }
}
