use crate::atom::StereoMark;

/// Bond order of one side. Absence of a bond is `None` at the use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    Single = 1,
    Double = 2,
    Triple = 3,
    Aromatic = 4,
    /// Query bond matching any order.
    Any = 9,
}

impl BondOrder {
    pub fn from_code(code: u8) -> Option<BondOrder> {
        match code {
            1 => Some(BondOrder::Single),
            2 => Some(BondOrder::Double),
            3 => Some(BondOrder::Triple),
            4 => Some(BondOrder::Aromatic),
            9 => Some(BondOrder::Any),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One bond of a condensed graph of reaction.
///
/// `order` is the reagent order, `p_order` the product order; `None` means
/// the bond does not exist on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DynBond {
    pub order: Option<BondOrder>,
    pub p_order: Option<BondOrder>,
    pub stereo: Option<StereoMark>,
    pub p_stereo: Option<StereoMark>,
}

impl DynBond {
    pub fn new(order: Option<BondOrder>, p_order: Option<BondOrder>) -> Self {
        Self {
            order,
            p_order,
            ..Self::default()
        }
    }

    pub fn fixed(order: BondOrder) -> Self {
        Self::new(Some(order), Some(order))
    }

    pub fn is_dynamic(&self) -> bool {
        self.order != self.p_order
    }

    pub fn is_stereo_dynamic(&self) -> bool {
        self.stereo != self.p_stereo
    }

    pub fn reagent(&self) -> Option<Bond> {
        self.order.map(|order| Bond {
            order,
            stereo: self.stereo,
        })
    }

    pub fn product(&self) -> Option<Bond> {
        self.p_order.map(|order| Bond {
            order,
            stereo: self.p_stereo,
        })
    }
}

/// One side of a [`DynBond`]. Only present bonds have a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub order: BondOrder,
    pub stereo: Option<StereoMark>,
}
