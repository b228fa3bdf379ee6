use std::collections::BTreeSet;

use crate::container::DynamicContainer;
use crate::mol::{DynGraph, Molecule};

impl DynGraph {
    /// Atoms of the reaction center: atoms whose charge changes and both
    /// ends of every bond whose order changes. With `stereo`, changed stereo
    /// marks count as well.
    ///
    /// The result is sorted and cached until the next edit.
    pub fn center_atoms(&self, stereo: bool) -> &[u32] {
        let cell = if stereo {
            &self.cache().stereo_center
        } else {
            &self.cache().center
        };
        cell.get_or_init(|| {
            let mut nodes = BTreeSet::new();
            for (id, atom) in self.atoms() {
                if atom.is_dynamic() || stereo && atom.is_stereo_dynamic() {
                    nodes.insert(id);
                }
            }
            for (a, b, bond) in self.bonds() {
                if bond.is_dynamic() || stereo && bond.is_stereo_dynamic() {
                    nodes.insert(a);
                    nodes.insert(b);
                }
            }
            nodes.into_iter().collect()
        })
    }

    /// Splits the graph into its reagent and product molecules.
    ///
    /// Both molecules keep every atom; each keeps only the bonds present on
    /// its side.
    pub fn decompose(&self) -> DynamicContainer<Molecule> {
        let mut reagents = Molecule::new();
        let mut products = Molecule::new();
        for (id, atom) in self.atoms() {
            // identifiers come from a map keyed by id, so they are unique
            let _ = reagents.add_atom_with_id(id, atom.reagent());
            let _ = products.add_atom_with_id(id, atom.product());
        }
        for (a, b, bond) in self.bonds() {
            if let Some(r) = bond.reagent() {
                let _ = reagents.add_bond(a, b, r);
            }
            if let Some(p) = bond.product() {
                let _ = products.add_bond(a, b, p);
            }
        }
        *reagents.meta_mut() = self.meta().clone();
        *products.meta_mut() = self.meta().clone();
        DynamicContainer::new(reagents, products)
    }
}
