use crate::atom::{Hybridization, Multi};
use crate::bond::BondOrder;
use crate::mol::DynGraph;

/// Running classification of one side of one atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Classifier {
    neighbors: u8,
    hybridization: Hybridization,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            neighbors: 0,
            hybridization: Hybridization::Sp3,
        }
    }
}

impl Classifier {
    fn push(&mut self, order: Option<BondOrder>, heavy: bool) {
        let Some(order) = order else { return };
        if heavy {
            self.neighbors += 1;
        }
        self.hybridization = match (self.hybridization, order) {
            (Hybridization::Sp | Hybridization::Aromatic, _) => return,
            (_, BondOrder::Aromatic) => Hybridization::Aromatic,
            (_, BondOrder::Triple) => Hybridization::Sp,
            (Hybridization::Sp2, BondOrder::Double) => Hybridization::Sp,
            (_, BondOrder::Double) => Hybridization::Sp2,
            (current, _) => current,
        };
    }
}

impl DynGraph {
    /// Recomputes the hybridization and heavy-neighbor marks of every atom
    /// on both sides.
    ///
    /// Classes only move up: sp3 -> sp2 on a double bond, sp2 -> sp on a
    /// second double bond, straight to sp or aromatic on a triple or
    /// aromatic bond, and never down again.
    pub fn reset_query_marks(&mut self) {
        let ids: Vec<u32> = self.atom_ids().collect();
        for id in ids {
            let mut reagent = Classifier::default();
            let mut product = Classifier::default();
            for (n, bond) in self.bonds_of(id) {
                let heavy = !self.atom(n).is_some_and(|a| a.is_hydrogen());
                reagent.push(bond.order, heavy);
                product.push(bond.p_order, heavy);
            }
            if let Some(atom) = self.atom_mut(id) {
                atom.neighbors = Some(Multi::Single(reagent.neighbors));
                atom.hybridization = Some(Multi::Single(reagent.hybridization));
                atom.p_neighbors = Some(Multi::Single(product.neighbors));
                atom.p_hybridization = Some(Multi::Single(product.hybridization));
            }
        }
        self.flush_cache();
    }

    /// Copy of the graph with fresh query marks; `self` is left untouched.
    pub fn with_query_marks(&self) -> DynGraph {
        let mut g = self.clone();
        g.reset_query_marks();
        g
    }
}
