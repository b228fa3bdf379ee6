use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::atom::{Atom, DynAtom, Multi};
use crate::bond::{BondOrder, DynBond};
use crate::container::DynamicContainer;
use crate::element::Element;
use crate::mol::DynGraph;

fn implicit_h(atom: &Atom, bonds: &[BondOrder]) -> u8 {
    match atom.single_element() {
        Some(element) => element.implicit_hydrogens(atom.valence_charge(), bonds),
        None => 0,
    }
}

/// A hydrogen that may be folded into its neighbor's implicit count.
fn is_plain_hydrogen(atom: &DynAtom) -> bool {
    atom.is_hydrogen()
        && atom.isotope.is_none()
        && atom.charge == Multi::Single(0)
        && atom.p_charge == Multi::Single(0)
}

impl DynGraph {
    /// Implicit hydrogens of an atom on each side, from the orders of the
    /// bonds present on that side.
    pub fn atom_implicit_h(&self, id: u32) -> Option<DynamicContainer<u8>> {
        let atom = self.atom(id)?;
        let (s_bonds, p_bonds): (Vec<_>, Vec<_>) = self
            .bonds_of(id)
            .map(|(_, bond)| (bond.order, bond.p_order))
            .unzip();
        let s_bonds: Vec<BondOrder> = s_bonds.into_iter().flatten().collect();
        let p_bonds: Vec<BondOrder> = p_bonds.into_iter().flatten().collect();
        Some(DynamicContainer::new(
            implicit_h(&atom.reagent(), &s_bonds),
            implicit_h(&atom.product(), &p_bonds),
        ))
    }

    /// Hydrogen neighbors reachable through a bond present on each side.
    pub fn atom_explicit_h(&self, id: u32) -> Option<DynamicContainer<u8>> {
        if !self.contains_atom(id) {
            return None;
        }
        let mut count = DynamicContainer::new(0u8, 0u8);
        for (n, bond) in self.bonds_of(id) {
            if !self.atom(n).is_some_and(DynAtom::is_hydrogen) {
                continue;
            }
            if bond.order.is_some() {
                count.reagent += 1;
            }
            if bond.p_order.is_some() {
                count.product += 1;
            }
        }
        Some(count)
    }

    pub fn atom_total_h(&self, id: u32) -> Option<DynamicContainer<u8>> {
        let implicit = self.atom_implicit_h(id)?;
        let explicit = self.atom_explicit_h(id)?;
        Some(DynamicContainer::new(
            implicit.reagent + explicit.reagent,
            implicit.product + explicit.product,
        ))
    }

    /// Removes explicit hydrogens that the valence rules can reproduce.
    ///
    /// A heavy atom whose remaining bonds leave no implicit hydrogen on a
    /// side where one of its hydrogens is bonded keeps all of its
    /// hydrogens. Hydrogens bonded to other hydrogens or to several heavy
    /// atoms are kept. Returns the number of removed atoms.
    pub fn implicify_hydrogens(&mut self) -> usize {
        let mut explicit: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        let mut keep = BTreeSet::new();
        for (id, atom) in self.atoms() {
            if !atom.is_hydrogen() {
                continue;
            }
            let mut heavy = 0;
            for n in self.neighbors(id) {
                if self.atom(n).is_some_and(DynAtom::is_hydrogen) {
                    keep.insert(n);
                    keep.insert(id);
                } else {
                    heavy += 1;
                    if is_plain_hydrogen(atom) {
                        explicit.entry(n).or_default().push(id);
                    } else {
                        keep.insert(id);
                    }
                }
            }
            if heavy > 1 {
                keep.insert(id);
            }
        }

        let mut for_remove = BTreeSet::new();
        for (&n, hs) in &explicit {
            let Some(atom) = self.atom(n) else { continue };
            let mut s_bonds = Vec::new();
            let mut p_bonds = Vec::new();
            let mut s_h = false;
            let mut p_h = false;
            for (m, bond) in self.bonds_of(n) {
                if hs.contains(&m) {
                    s_h |= bond.order.is_some();
                    p_h |= bond.p_order.is_some();
                } else {
                    s_bonds.extend(bond.order);
                    p_bonds.extend(bond.p_order);
                }
            }
            let s_implicit = implicit_h(&atom.reagent(), &s_bonds);
            let p_implicit = implicit_h(&atom.product(), &p_bonds);
            if s_implicit == 0 && s_h || p_implicit == 0 && p_h {
                debug!(atom = n, "hydrogens kept: not reproducible from valence");
                keep.extend(hs.iter().copied());
            } else {
                for_remove.extend(hs.iter().copied());
            }
        }

        let mut removed = 0;
        for h in for_remove {
            if !keep.contains(&h) && self.remove_atom(h).is_some() {
                removed += 1;
            }
        }
        self.flush_cache();
        removed
    }

    /// Adds one explicit hydrogen per implicit hydrogen of every heavy atom.
    ///
    /// When the two sides need different numbers, the surplus hydrogens are
    /// bonded only on the side that needs them. Returns the number of added
    /// atoms.
    pub fn explicify_hydrogens(&mut self) -> usize {
        let mut pending = Vec::new();
        for (id, atom) in self.atoms() {
            if atom.is_hydrogen() {
                continue;
            }
            let Some(implicit) = self.atom_implicit_h(id) else {
                continue;
            };
            for k in 0..implicit.reagent.max(implicit.product) {
                let order = (k < implicit.reagent).then_some(BondOrder::Single);
                let p_order = (k < implicit.product).then_some(BondOrder::Single);
                pending.push((id, DynBond::new(order, p_order)));
            }
        }

        let added = pending.len();
        for (parent, bond) in pending {
            let position = self.atom(parent).map(|a| a.position).unwrap_or_default();
            let h = self.add_atom(DynAtom::new(Element::H).with_position(position));
            // both endpoints were just checked or created
            let _ = self.add_bond(parent, h, bond);
        }
        self.flush_cache();
        added
    }

    /// [`implicify_hydrogens`](Self::implicify_hydrogens) on a copy; `self`
    /// and its cached results are left untouched.
    pub fn implicified(&self) -> (DynGraph, usize) {
        let mut g = self.clone();
        let removed = g.implicify_hydrogens();
        (g, removed)
    }

    /// [`explicify_hydrogens`](Self::explicify_hydrogens) on a copy.
    pub fn explicified(&self) -> (DynGraph, usize) {
        let mut g = self.clone();
        let added = g.explicify_hydrogens();
        (g, added)
    }
}
