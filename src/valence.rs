use crate::atom::Atom;
use crate::bond::BondOrder;
use crate::element::Element;
use crate::mol::DynGraph;

/// An atom whose bonding does not fit any allowed valence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValenceIssue {
    pub atom: u32,
    pub reagent: bool,
    pub product: bool,
}

impl std::fmt::Display for ValenceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "atom {} has invalid valence", self.atom)?;
        match (self.reagent, self.product) {
            (true, true) => Ok(()),
            (true, false) => write!(f, " in reagents"),
            _ => write!(f, " in products"),
        }
    }
}

fn side_is_valid(atom: &Atom, environment: &[(BondOrder, Option<Element>)]) -> bool {
    match atom.single_element() {
        Some(element) => element.check_valence(atom.valence_charge(), environment),
        None => true,
    }
}

impl DynGraph {
    /// Checks every atom on both sides. Never fails; the report lists one
    /// entry per offending atom and is empty for a sane graph.
    pub fn check_valence(&self) -> Vec<ValenceIssue> {
        let mut report = Vec::new();
        for (id, atom) in self.atoms() {
            let mut s_env = Vec::new();
            let mut p_env = Vec::new();
            for (n, bond) in self.bonds_of(id) {
                let neighbor = self.atom(n).and_then(|a| a.single_element());
                if let Some(order) = bond.order {
                    s_env.push((order, neighbor));
                }
                if let Some(order) = bond.p_order {
                    p_env.push((order, neighbor));
                }
            }
            let reagent = !side_is_valid(&atom.reagent(), &s_env);
            let product = !side_is_valid(&atom.product(), &p_env);
            if reagent || product {
                report.push(ValenceIssue {
                    atom: id,
                    reagent,
                    product,
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::DynAtom;
    use crate::bond::DynBond;

    #[test]
    fn ethane_is_valid() {
        let mut g = DynGraph::new();
        let a = g.add_atom(DynAtom::new(Element::C));
        let b = g.add_atom(DynAtom::new(Element::C));
        g.add_bond(a, b, DynBond::fixed(BondOrder::Single)).unwrap();
        assert!(g.check_valence().is_empty());
    }

    #[test]
    fn overbonded_product_is_reported() {
        let mut g = DynGraph::new();
        let c = g.add_atom(DynAtom::new(Element::C));
        for _ in 0..4 {
            let f = g.add_atom(DynAtom::new(Element::F));
            g.add_bond(c, f, DynBond::fixed(BondOrder::Single)).unwrap();
        }
        let x = g.add_atom(DynAtom::new(Element::Cl));
        g.add_bond(c, x, DynBond::new(None, Some(BondOrder::Single)))
            .unwrap();

        let report = g.check_valence();
        assert_eq!(
            report,
            vec![ValenceIssue {
                atom: c,
                reagent: false,
                product: true
            }]
        );
        assert_eq!(report[0].to_string(), "atom 1 has invalid valence in products");
    }

    #[test]
    fn charged_nitrogen_allows_four_bonds() {
        let mut g = DynGraph::new();
        let n = g.add_atom(DynAtom::new(Element::N).with_charge(1));
        for _ in 0..4 {
            let c = g.add_atom(DynAtom::new(Element::C));
            g.add_bond(n, c, DynBond::fixed(BondOrder::Single)).unwrap();
        }
        assert!(g.check_valence().is_empty());
    }

    #[test]
    fn wildcards_are_not_checked() {
        let mut g = DynGraph::new();
        let a = g.add_atom(DynAtom::default());
        for _ in 0..6 {
            let c = g.add_atom(DynAtom::new(Element::C));
            g.add_bond(a, c, DynBond::fixed(BondOrder::Double)).unwrap();
        }
        assert!(g.check_valence().iter().all(|issue| issue.atom != a));
    }
}
