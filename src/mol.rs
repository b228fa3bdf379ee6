use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use petgraph::graphmap::UnGraphMap;

use crate::atom::{Atom, DynAtom};
use crate::bond::{Bond, DynBond};

/// Errors from structural edits of a [`Mol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("atom {0} does not exist")]
    MissingAtom(u32),
    #[error("atom {0} already exists")]
    DuplicateAtom(u32),
    #[error("atom {0} cannot be bonded to itself")]
    SelfLoop(u32),
}

/// Results derived from a graph and cached until the next edit.
#[derive(Debug, Default)]
pub(crate) struct DerivedCache {
    pub(crate) center: OnceCell<Vec<u32>>,
    pub(crate) stereo_center: OnceCell<Vec<u32>>,
}

/// Attributed undirected graph with stable `u32` atom identifiers.
///
/// Atoms are stored in identifier order; bonds are kept in a petgraph
/// `GraphMap`, so there is at most one bond per unordered atom pair and
/// every bond endpoint is an atom of the graph.
pub struct Mol<A, B> {
    atoms: BTreeMap<u32, A>,
    graph: UnGraphMap<u32, B>,
    meta: BTreeMap<String, String>,
    cache: DerivedCache,
}

/// Condensed graph of reaction.
pub type DynGraph = Mol<DynAtom, DynBond>;

/// Plain molecule: one side of a [`DynGraph`].
pub type Molecule = Mol<Atom, Bond>;

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            atoms: BTreeMap::new(),
            graph: UnGraphMap::new(),
            meta: BTreeMap::new(),
            cache: DerivedCache::default(),
        }
    }

    pub fn graph(&self) -> &UnGraphMap<u32, B> {
        &self.graph
    }

    pub fn atom(&self, id: u32) -> Option<&A> {
        self.atoms.get(&id)
    }

    pub fn atom_mut(&mut self, id: u32) -> Option<&mut A> {
        self.flush_cache();
        self.atoms.get_mut(&id)
    }

    pub fn bond(&self, a: u32, b: u32) -> Option<&B> {
        self.graph.edge_weight(a, b)
    }

    pub fn bond_mut(&mut self, a: u32, b: u32) -> Option<&mut B> {
        self.flush_cache();
        self.graph.edge_weight_mut(a, b)
    }

    /// Adds an atom under the next free identifier (one above the largest).
    pub fn add_atom(&mut self, atom: A) -> u32 {
        let id = self.max_id() + 1;
        self.atoms.insert(id, atom);
        self.graph.add_node(id);
        self.flush_cache();
        id
    }

    pub fn add_atom_with_id(&mut self, id: u32, atom: A) -> Result<(), GraphError> {
        if self.atoms.contains_key(&id) {
            return Err(GraphError::DuplicateAtom(id));
        }
        self.atoms.insert(id, atom);
        self.graph.add_node(id);
        self.flush_cache();
        Ok(())
    }

    /// Adds or replaces the bond between `a` and `b`.
    pub fn add_bond(&mut self, a: u32, b: u32, bond: B) -> Result<Option<B>, GraphError> {
        for id in [a, b] {
            if !self.atoms.contains_key(&id) {
                return Err(GraphError::MissingAtom(id));
            }
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        self.flush_cache();
        Ok(self.graph.add_edge(a, b, bond))
    }

    pub fn remove_atom(&mut self, id: u32) -> Option<A> {
        let atom = self.atoms.remove(&id)?;
        self.graph.remove_node(id);
        self.flush_cache();
        Some(atom)
    }

    pub fn remove_bond(&mut self, a: u32, b: u32) -> Option<B> {
        self.flush_cache();
        self.graph.remove_edge(a, b)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_atom(&self, id: u32) -> bool {
        self.atoms.contains_key(&id)
    }

    /// Largest atom identifier, `0` for an empty graph.
    pub fn max_id(&self) -> u32 {
        self.atoms.keys().next_back().copied().unwrap_or(0)
    }

    /// Atoms in ascending identifier order.
    pub fn atoms(&self) -> impl Iterator<Item = (u32, &A)> + '_ {
        self.atoms.iter().map(|(&id, atom)| (id, atom))
    }

    pub fn atom_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.atoms.keys().copied()
    }

    /// Bonds in insertion order.
    pub fn bonds(&self) -> impl Iterator<Item = (u32, u32, &B)> + '_ {
        self.graph.all_edges()
    }

    pub fn neighbors(&self, id: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph.neighbors(id)
    }

    /// Neighbors of `id` together with the connecting bond.
    pub fn bonds_of(&self, id: u32) -> impl Iterator<Item = (u32, &B)> + '_ {
        self.graph.edges(id).map(move |(a, b, bond)| (if a == id { b } else { a }, bond))
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.meta
    }

    /// Drops every cached derived result. Edits through this type call it
    /// themselves; algorithms that rewrite attributes in bulk call it once
    /// when done.
    pub fn flush_cache(&mut self) {
        self.cache = DerivedCache::default();
    }

    pub(crate) fn cache(&self) -> &DerivedCache {
        &self.cache
    }
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            atoms: self.atoms.clone(),
            graph: self.graph.clone(),
            meta: self.meta.clone(),
            cache: DerivedCache::default(),
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atoms != other.atoms || self.bond_count() != other.bond_count() {
            return false;
        }
        self.bonds()
            .all(|(a, b, bond)| other.bond(a, b) == Some(bond))
    }
}

impl<A: fmt::Debug, B: fmt::Debug> fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .field("atoms", &self.atoms.keys().collect::<Vec<_>>())
            .finish()
    }
}
