use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::atom::{DynAtom, Hybridization, Multi, StereoMark};
use crate::bond::{BondOrder, DynBond};
use crate::container::ReactionContainer;
use crate::element::Element;
use crate::mol::{DynGraph, GraphError};

use super::ctab::MolBlock;
use super::error::CgrError;
use super::record::{Record, RecordKind};
use super::value::{
    parse_atom_delta, parse_colors, parse_list, parse_transition, AtomDelta, Sides,
};

/// Product z of a recorded atom below this disables product-side wedge
/// inference.
const FLAT_PRODUCT_Z: f64 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Molecules get positional identifiers `1..=N` instead of their map
    /// numbers; reactions get their map numbers closed into `1..=N`.
    pub remap: bool,
}

/// The parsed components of one reaction, before assembly.
///
/// `colors` keys are `<kind>.<index>`, the index counting molecules from 1
/// across reactants then products.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReaction {
    pub reactants: Vec<MolBlock>,
    pub products: Vec<MolBlock>,
    pub meta: BTreeMap<String, Vec<String>>,
    pub colors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CgrReader {
    options: ReaderOptions,
}

impl CgrReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    /// Assembles a standalone molecule. Atoms without a map number are
    /// numbered upwards from the largest one present.
    pub fn molecule(&self, block: MolBlock) -> Result<DynGraph, CgrError> {
        let mapping: Vec<u32> = if self.options.remap {
            (1..=block.atoms.len() as u32).collect()
        } else {
            let mut maps: Vec<u32> = block.atoms.iter().map(|a| a.map).collect();
            let top = maps.iter().copied().max().unwrap_or(0);
            assign_missing(&mut maps, top);
            maps
        };
        check_unique("molecule", &mapping)?;

        let mut g = build(&block, &mapping, &block.colors)?;
        for (key, lines) in block.meta {
            g.meta_mut().insert(key, lines.join("\n"));
        }
        Ok(g)
    }

    /// Unmapped atoms of each role are numbered upwards from the largest
    /// map number of the whole reaction. Map numbers must be unique within
    /// a role.
    pub fn reaction(&self, raw: RawReaction) -> Result<ReactionContainer, CgrError> {
        let RawReaction {
            reactants,
            products,
            meta,
            colors,
        } = raw;

        let mut s_maps = role_maps(&reactants);
        let mut p_maps = role_maps(&products);
        let top = s_maps.iter().chain(&p_maps).copied().max().unwrap_or(0);
        assign_missing(&mut s_maps, top);
        assign_missing(&mut p_maps, top);
        check_unique("reactants", &s_maps)?;
        check_unique("products", &p_maps)?;
        if self.options.remap {
            close_gaps(&mut s_maps, &mut p_maps);
        }

        let mut by_molecule: BTreeMap<usize, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for (key, lines) in colors {
            let index = key
                .rsplit_once('.')
                .and_then(|(kind, idx)| Some((kind, idx.parse::<usize>().ok()?)));
            match index {
                Some((kind, idx)) => {
                    by_molecule
                        .entry(idx)
                        .or_default()
                        .insert(kind.to_string(), lines);
                }
                None => debug!(key = %key, "colors key without molecule index"),
            }
        }

        let mut rc = ReactionContainer::new();
        rc.meta = meta
            .into_iter()
            .map(|(key, lines)| (key, lines.join("\n")))
            .collect();
        let mut index = 0;
        rc.reactants = assemble_role(&reactants, &s_maps, &mut by_molecule, &mut index)?;
        rc.products = assemble_role(&products, &p_maps, &mut by_molecule, &mut index)?;
        Ok(rc)
    }
}

fn role_maps(blocks: &[MolBlock]) -> Vec<u32> {
    blocks
        .iter()
        .flat_map(|b| b.atoms.iter().map(|a| a.map))
        .collect()
}

fn assign_missing(maps: &mut [u32], top: u32) {
    let mut next = top;
    for map in maps.iter_mut().filter(|m| **m == 0) {
        next += 1;
        *map = next;
    }
}

fn check_unique(role: &'static str, maps: &[u32]) -> Result<(), CgrError> {
    let mut seen = BTreeSet::new();
    for &map in maps {
        if !seen.insert(map) {
            return Err(CgrError::DuplicateMap { role, map });
        }
    }
    Ok(())
}

/// Shifts map numbers down over every number unused by both roles, largest
/// gap first, so the union becomes `1..=N`.
fn close_gaps(s_maps: &mut [u32], p_maps: &mut [u32]) {
    let used: BTreeSet<u32> = s_maps.iter().chain(p_maps.iter()).copied().collect();
    let top = used.iter().next_back().copied().unwrap_or(0);
    let gaps: Vec<u32> = (1..=top).rev().filter(|m| !used.contains(m)).collect();
    if gaps.is_empty() {
        return;
    }
    debug!(gaps = gaps.len(), "closing atom map gaps");
    for gap in gaps {
        for map in s_maps.iter_mut().chain(p_maps.iter_mut()) {
            if *map > gap {
                *map -= 1;
            }
        }
    }
}

fn assemble_role(
    blocks: &[MolBlock],
    maps: &[u32],
    colors: &mut BTreeMap<usize, BTreeMap<String, Vec<String>>>,
    index: &mut usize,
) -> Result<Vec<DynGraph>, CgrError> {
    let mut shift = 0;
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        let len = block.atoms.len();
        *index += 1;
        let molecule_colors = colors.remove(index).unwrap_or_default();
        out.push(build(block, &maps[shift..shift + len], &molecule_colors)?);
        shift += len;
    }
    Ok(out)
}

#[derive(Debug, Default)]
struct AtomPatch {
    element: Option<Multi<Element>>,
    isotope: Option<Multi<u16>>,
    charge: Option<(Multi<i8>, Multi<i8>)>,
    shift: Option<[f64; 3]>,
    depth: Option<i8>,
    hybridization: Option<Sides<Hybridization>>,
    neighbors: Option<Sides<u8>>,
    stereo: Option<(Option<StereoMark>, Option<StereoMark>)>,
}

#[derive(Debug, Default)]
struct BondPatch {
    order: Option<(Option<BondOrder>, Option<BondOrder>)>,
    stereo: Option<(Option<StereoMark>, Option<StereoMark>)>,
}

/// Bonds and stereo marks are scalar per side; list values are rejected.
fn scalar<T: Copy>(sides: Sides<T>) -> Option<(Option<T>, Option<T>)> {
    fn side<T: Copy>(m: Option<Multi<T>>) -> Option<Option<T>> {
        match m {
            None => Some(None),
            Some(Multi::Single(v)) => Some(Some(v)),
            Some(Multi::List(_)) => None,
        }
    }
    Some((side(sides.reagent)?, side(sides.product)?))
}

fn element_list(value: &str) -> Option<Vec<Element>> {
    value
        .split(',')
        .map(|s| Element::from_symbol(s.trim()))
        .collect()
}

fn apply_atom_record(patch: &mut AtomPatch, record: &Record, base_charge: i8) -> Option<()> {
    let value = record.value.as_str();
    match record.kind {
        RecordKind::DynAtom => match parse_atom_delta(value, base_charge)? {
            AtomDelta::Charge(s, p) => patch.charge = Some((s, p)),
            AtomDelta::Shift(shift) => patch.shift = Some(shift),
            AtomDelta::Depth(depth) => patch.depth = Some(depth),
        },
        RecordKind::AtomList => {
            patch.element = Some(Multi::distinct(element_list(value)?)?);
        }
        RecordKind::AtomNotList => {
            let excluded: Vec<Element> = value
                .split(',')
                .filter_map(|s| Element::from_symbol(s.trim()))
                .collect();
            let allowed: Vec<Element> = Element::all().filter(|e| !excluded.contains(e)).collect();
            patch.element = Some(Multi::distinct(allowed)?);
        }
        RecordKind::Isotope => {
            let values = value
                .split(',')
                .map(|s| s.trim().parse::<u16>().ok())
                .collect::<Option<Vec<_>>>()?;
            patch.isotope = Some(if values.len() == 1 {
                Multi::Single(values[0])
            } else {
                Multi::distinct(values)?
            });
        }
        RecordKind::AtomHyb => patch.hybridization = Some(parse_list(value)?),
        RecordKind::DynAtomHyb => patch.hybridization = Some(parse_transition(value)?),
        RecordKind::AtomNeighbors => patch.neighbors = Some(parse_list(value)?),
        RecordKind::DynAtomNeighbors => patch.neighbors = Some(parse_transition(value)?),
        RecordKind::AtomStereo => patch.stereo = Some(scalar(parse_list(value)?)?),
        RecordKind::DynAtomStereo => patch.stereo = Some(scalar(parse_transition(value)?)?),
        _ => return None,
    }
    Some(())
}

fn apply_bond_record(patch: &mut BondPatch, record: &Record) -> Option<()> {
    let value = record.value.as_str();
    match record.kind {
        RecordKind::DynBond => patch.order = Some(scalar(parse_transition(value)?)?),
        RecordKind::ExtraBond => patch.order = Some(scalar(parse_list(value)?)?),
        RecordKind::BondStereo => patch.stereo = Some(scalar(parse_list(value)?)?),
        RecordKind::DynBondStereo => patch.stereo = Some(scalar(parse_transition(value)?)?),
        _ => return None,
    }
    Some(())
}

type Patches = (BTreeMap<u32, AtomPatch>, BTreeMap<(u32, u32), BondPatch>);

fn collect_patches(block: &MolBlock) -> Patches {
    let mut atoms: BTreeMap<u32, AtomPatch> = BTreeMap::new();
    let mut bonds: BTreeMap<(u32, u32), BondPatch> = BTreeMap::new();
    for record in &block.records {
        let kind = record.kind.name();
        let in_block = |&a: &u32| a >= 1 && (a as usize) <= block.atoms.len();
        if record.atoms.len() != record.kind.arity() || !record.atoms.iter().all(in_block) {
            debug!(kind, atoms = ?record.atoms, "record refers to missing atoms");
            continue;
        }
        let applied = match record.atoms[..] {
            [a, b] => apply_bond_record(bonds.entry((a.min(b), a.max(b))).or_default(), record),
            [a] => {
                let base = block.atoms[a as usize - 1].charge;
                apply_atom_record(atoms.entry(a).or_default(), record, base)
            }
            _ => None,
        };
        match applied {
            Some(()) => trace!(kind, value = %record.value, "record applied"),
            None => debug!(kind, value = %record.value, "discarding malformed record"),
        }
    }
    (atoms, bonds)
}

fn legacy_element(symbol: &str) -> Option<Element> {
    match symbol {
        "A" | "*" | "L" | "Q" => None,
        _ => {
            let element = Element::from_symbol(symbol);
            if element.is_none() {
                debug!(symbol, "unknown element symbol read as wildcard");
            }
            element
        }
    }
}

fn position_of(mapping: &[u32], n: u32) -> Result<u32, GraphError> {
    (n as usize)
        .checked_sub(1)
        .and_then(|i| mapping.get(i))
        .copied()
        .ok_or(GraphError::MissingAtom(n))
}

/// Builds one graph from a block whose atom `k` (1-based) gets identifier
/// `mapping[k - 1]`.
fn build(
    block: &MolBlock,
    mapping: &[u32],
    colors: &BTreeMap<String, Vec<String>>,
) -> Result<DynGraph, CgrError> {
    if block.atoms.is_empty() {
        return Err(CgrError::EmptyMolecule);
    }
    let (atom_patches, bond_patches) = collect_patches(block);

    let mut g = DynGraph::new();
    let mut reagent_stereo = true;
    let mut product_stereo = true;
    let mut deferred_depth = BTreeMap::new();

    for (k, raw) in block.atoms.iter().enumerate() {
        let id = mapping[k];
        let mut atom = DynAtom {
            charge: Multi::Single(raw.charge),
            p_charge: Multi::Single(raw.charge),
            position: raw.position,
            p_position: raw.position,
            mark: raw.mark.clone(),
            ..DynAtom::default()
        };

        if let Some(patch) = atom_patches.get(&(k as u32 + 1)) {
            if let Some((s, p)) = &patch.charge {
                atom.charge = s.clone();
                atom.p_charge = p.clone();
            }
            if let Some(shift) = patch.shift {
                for (coord, delta) in atom.p_position.iter_mut().zip(shift) {
                    *coord += delta;
                }
            }
            if product_stereo && atom.p_position[2] < FLAT_PRODUCT_Z {
                debug!(atom = id, "product wedge inference disabled");
                product_stereo = false;
            }
            if let Some(depth) = patch.depth {
                deferred_depth.insert(id, depth);
            }
            atom.element = patch.element.clone();
            atom.isotope = patch.isotope.clone();
            if let Some(sides) = &patch.hybridization {
                atom.hybridization = sides.reagent.clone();
                atom.p_hybridization = sides.product.clone();
            }
            if let Some(sides) = &patch.neighbors {
                atom.neighbors = sides.reagent.clone();
                atom.p_neighbors = sides.product.clone();
            }
            if let Some((s, p)) = patch.stereo {
                atom.stereo = s;
                atom.p_stereo = p;
            }
        }

        if atom.element.is_none() {
            atom.element = legacy_element(&raw.element).map(Multi::Single);
        }
        if atom.isotope.is_none() && raw.mass_diff != 0 {
            if let Some(element) = atom.single_element() {
                let mass = i32::from(element.abundant_isotope()) + i32::from(raw.mass_diff);
                atom.isotope = u16::try_from(mass)
                    .ok()
                    .filter(|&m| m > 0)
                    .map(Multi::Single);
            }
        }
        if reagent_stereo && raw.position[2] != 0.0 {
            debug!(atom = id, "reagent wedge inference disabled");
            reagent_stereo = false;
        }
        g.add_atom_with_id(id, atom)?;
    }

    for raw in &block.bonds {
        let a = position_of(mapping, raw.a)?;
        let b = position_of(mapping, raw.b)?;
        let mut bond = DynBond::new(raw.order, raw.order);
        if let Some(patch) = bond_patches.get(&(raw.a.min(raw.b), raw.a.max(raw.b))) {
            if let Some((s, p)) = patch.order {
                bond.order = s;
                bond.p_order = p;
            }
            if let Some((s, p)) = patch.stereo {
                bond.stereo = s;
                bond.p_stereo = p;
            }
        }
        g.add_bond(a, b, bond)?;

        let mark = match raw.stereo {
            1 => 1,
            6 => -1,
            _ => continue,
        };
        if let Some(atom) = g.atom_mut(b) {
            if reagent_stereo {
                atom.depth = Some(mark);
            }
            if product_stereo && !deferred_depth.contains_key(&b) {
                atom.p_depth = Some(mark);
            }
        }
    }

    if product_stereo {
        for (id, depth) in deferred_depth {
            if let Some(atom) = g.atom_mut(id).filter(|_| depth != 0) {
                atom.p_depth = Some(depth);
            }
        }
    }

    for (kind, lines) in colors {
        let (plain, assignments) = parse_colors(kind, lines);
        for assignment in assignments {
            let Ok(id) = position_of(mapping, assignment.atom) else {
                debug!(kind = %kind, atom = assignment.atom, "colors for a missing atom");
                continue;
            };
            if let Some(atom) = g.atom_mut(id) {
                atom.colors
                    .entry(plain.clone())
                    .or_default()
                    .insert(assignment.population, assignment.reagent);
                atom.p_colors
                    .entry(plain.clone())
                    .or_default()
                    .insert(assignment.population, assignment.product);
            }
        }
    }

    g.flush_cache();
    Ok(g)
}
