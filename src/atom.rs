use std::collections::BTreeMap;

use crate::element::Element;

/// A value that is either a single scalar or an ordered list of
/// superimposed alternatives.
///
/// Query atoms may allow several elements, isotopes or charges at once; all
/// lists of one atom have the same length and are read in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Multi<T> {
    Single(T),
    List(Vec<T>),
}

impl<T> Multi<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            Multi::Single(v) => Some(v),
            Multi::List(v) => v.first(),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Multi::Single(v) => std::slice::from_ref(v),
            Multi::List(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Multi::List(_))
    }

    pub fn single(&self) -> Option<&T> {
        match self {
            Multi::Single(v) => Some(v),
            Multi::List(_) => None,
        }
    }
}

impl<T: PartialEq> Multi<T> {
    /// Builds a list, rejecting duplicate alternatives.
    pub fn distinct(values: Vec<T>) -> Option<Self> {
        for (i, v) in values.iter().enumerate() {
            if values[..i].contains(v) {
                return None;
            }
        }
        Some(Multi::List(values))
    }
}

impl<T> From<T> for Multi<T> {
    fn from(v: T) -> Self {
        Multi::Single(v)
    }
}

impl<T: Default> Default for Multi<T> {
    fn default() -> Self {
        Multi::Single(T::default())
    }
}

/// Stereo label carried on atoms and bonds. Only transported, never derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StereoMark {
    E,
    Z,
    U,
    R,
    S,
    Re,
    Si,
}

impl StereoMark {
    pub fn from_label(s: &str) -> Option<StereoMark> {
        match s {
            "e" => Some(StereoMark::E),
            "z" => Some(StereoMark::Z),
            "u" => Some(StereoMark::U),
            "r" => Some(StereoMark::R),
            "s" => Some(StereoMark::S),
            "re" => Some(StereoMark::Re),
            "si" => Some(StereoMark::Si),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StereoMark::E => "e",
            StereoMark::Z => "z",
            StereoMark::U => "u",
            StereoMark::R => "r",
            StereoMark::S => "s",
            StereoMark::Re => "re",
            StereoMark::Si => "si",
        }
    }
}

/// Query hybridization class. Numbering follows the record codes
/// (`1` sp3, `2` sp2, `3` sp, `4` aromatic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Hybridization {
    #[default]
    Sp3 = 1,
    Sp2 = 2,
    Sp = 3,
    Aromatic = 4,
}

impl Hybridization {
    pub fn from_code(code: u8) -> Option<Hybridization> {
        match code {
            1 => Some(Hybridization::Sp3),
            2 => Some(Hybridization::Sp2),
            3 => Some(Hybridization::Sp),
            4 => Some(Hybridization::Aromatic),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Side-channel atom annotations: kind -> population -> value.
pub type Colors = BTreeMap<String, BTreeMap<u32, String>>;

/// One atom of a condensed graph of reaction.
///
/// Element, isotope and mark are shared by both states. Every other
/// attribute comes as a pair: the plain field is the reagent state, the
/// `p_` field the product state.
#[derive(Debug, Clone, PartialEq)]
pub struct DynAtom {
    /// `None` is a wildcard atom; a list is a substituent set.
    pub element: Option<Multi<Element>>,
    /// Absolute mass number. `None` means natural abundance.
    pub isotope: Option<Multi<u16>>,
    pub charge: Multi<i8>,
    pub p_charge: Multi<i8>,
    pub position: [f64; 3],
    pub p_position: [f64; 3],
    pub stereo: Option<StereoMark>,
    pub p_stereo: Option<StereoMark>,
    /// Wedge depth mark (`1` up, `-1` down) inferred from legacy bond stereo.
    pub depth: Option<i8>,
    pub p_depth: Option<i8>,
    pub hybridization: Option<Multi<Hybridization>>,
    pub p_hybridization: Option<Multi<Hybridization>>,
    pub neighbors: Option<Multi<u8>>,
    pub p_neighbors: Option<Multi<u8>>,
    pub mark: String,
    pub colors: Colors,
    pub p_colors: Colors,
}

impl Default for DynAtom {
    fn default() -> Self {
        Self {
            element: None,
            isotope: None,
            charge: Multi::Single(0),
            p_charge: Multi::Single(0),
            position: [0.0; 3],
            p_position: [0.0; 3],
            stereo: None,
            p_stereo: None,
            depth: None,
            p_depth: None,
            hybridization: None,
            p_hybridization: None,
            neighbors: None,
            p_neighbors: None,
            mark: "0".to_string(),
            colors: Colors::new(),
            p_colors: Colors::new(),
        }
    }
}

impl DynAtom {
    pub fn new(element: Element) -> Self {
        Self {
            element: Some(Multi::Single(element)),
            ..Self::default()
        }
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.charge = Multi::Single(charge);
        self.p_charge = Multi::Single(charge);
        self
    }

    pub fn with_charges(mut self, reagent: i8, product: i8) -> Self {
        self.charge = Multi::Single(reagent);
        self.p_charge = Multi::Single(product);
        self
    }

    pub fn with_position(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self.p_position = position;
        self
    }

    /// The concrete element, if the atom is neither a wildcard nor a list.
    pub fn single_element(&self) -> Option<Element> {
        self.element.as_ref().and_then(|e| e.single()).copied()
    }

    pub fn is_hydrogen(&self) -> bool {
        self.single_element() == Some(Element::H)
    }

    pub fn is_dynamic(&self) -> bool {
        self.charge != self.p_charge
    }

    pub fn is_stereo_dynamic(&self) -> bool {
        self.stereo != self.p_stereo
    }

    pub fn reagent(&self) -> Atom {
        Atom {
            element: self.element.clone(),
            isotope: self.isotope.clone(),
            charge: self.charge.clone(),
            position: self.position,
            stereo: self.stereo,
            depth: self.depth,
            hybridization: self.hybridization.clone(),
            neighbors: self.neighbors.clone(),
            mark: self.mark.clone(),
            colors: self.colors.clone(),
        }
    }

    pub fn product(&self) -> Atom {
        Atom {
            element: self.element.clone(),
            isotope: self.isotope.clone(),
            charge: self.p_charge.clone(),
            position: self.p_position,
            stereo: self.p_stereo,
            depth: self.p_depth,
            hybridization: self.p_hybridization.clone(),
            neighbors: self.p_neighbors.clone(),
            mark: self.mark.clone(),
            colors: self.p_colors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Option<Multi<Element>>,
    pub isotope: Option<Multi<u16>>,
    pub charge: Multi<i8>,
    pub position: [f64; 3],
    pub stereo: Option<StereoMark>,
    pub depth: Option<i8>,
    pub hybridization: Option<Multi<Hybridization>>,
    pub neighbors: Option<Multi<u8>>,
    pub mark: String,
    pub colors: Colors,
}

impl Atom {
    pub fn single_element(&self) -> Option<Element> {
        self.element.as_ref().and_then(|e| e.single()).copied()
    }

    /// Charge used for valence rules; lists use their first alternative.
    pub fn valence_charge(&self) -> i8 {
        self.charge.first().copied().unwrap_or(0)
    }
}
