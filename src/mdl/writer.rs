use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::atom::{DynAtom, Multi};
use crate::bond::BondOrder;
use crate::element::Element;
use crate::mol::DynGraph;

use super::charge_to_code;
use super::record::{Record, RecordKind};
use super::value::{write_charge, write_state, Label};

/// Text framing of the encoded block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// V2000 molecule block with extension records.
    #[default]
    Mdl,
    /// Marvin-style XML atom and bond arrays with data groups.
    Mrv,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Also write hybridization and neighbor-count records.
    pub extended_labels: bool,
    /// Write the atom mark into the map column instead of the identifier.
    pub mark_to_map: bool,
    pub format: OutputFormat,
}

/// An encoded graph: the structure block and the data items that travel
/// next to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedCgr {
    pub meta: BTreeMap<String, String>,
    /// Colors blocks by kind (`PHTYP`, `dynPHTYP`, ...).
    pub colors: BTreeMap<String, String>,
    /// Without the trailing `M  END`.
    pub block: String,
}

struct AtomLine {
    map: String,
    charge: i8,
    element: &'static str,
    mark: String,
    position: [f64; 3],
}

struct BondLine {
    a: u32,
    b: u32,
    code: u8,
    stereo: u8,
}

enum Extended {
    Charge { atom: u32, charge: i8 },
    Isotope { atom: u32, mass: u16 },
    AtomList { atom: u32, elements: Vec<Element> },
}

struct Layout {
    atoms: Vec<AtomLine>,
    bonds: Vec<BondLine>,
    extended: Vec<Extended>,
    records: Vec<Record>,
}

impl Layout {
    fn atom(&self, n: u32) -> Option<&AtomLine> {
        self.atoms.get((n as usize).checked_sub(1)?)
    }
}

/// Legacy order code and the record describing a bond's two orders.
fn bond_table(s: Option<BondOrder>, p: Option<BondOrder>) -> (u8, Option<(RecordKind, String)>) {
    match (s, p) {
        _ if s != p => {
            let value = write_state(s.map(Multi::Single).as_ref(), p.map(Multi::Single).as_ref())
                .map(|(value, _)| value)
                .unwrap_or_default();
            (8, Some((RecordKind::DynBond, value)))
        }
        (Some(BondOrder::Any), _) => (8, Some((RecordKind::ExtraBond, "s".to_string()))),
        (Some(order), _) => (order.code(), None),
        (None, _) => (0, None),
    }
}

fn state_record<T: Label>(
    atoms: Vec<u32>,
    s: Option<&Multi<T>>,
    p: Option<&Multi<T>>,
    plain: RecordKind,
    dynamic: RecordKind,
) -> Option<Record> {
    let (value, is_dynamic) = write_state(s, p)?;
    Some(Record {
        kind: if is_dynamic { dynamic } else { plain },
        atoms,
        value,
    })
}

fn pending_wedge(g: &DynGraph, id: u32, wedged: &BTreeMap<u32, i8>) -> Option<i8> {
    g.atom(id)?
        .depth
        .filter(|&d| d != 0 && !wedged.contains_key(&id))
}

fn format_shift(atom: &DynAtom) -> String {
    let [dx, dy, dz] = [0, 1, 2].map(|i| atom.p_position[i] - atom.position[i]);
    format!("x{dx},{dy},{dz}")
}

fn half_table() -> usize {
    Element::all().count() / 2
}

/// Label anchor of a data group: beside a single atom, or off the middle
/// of a bond on the side away from its slope.
fn label_position(points: &[[f64; 3]]) -> (f64, f64) {
    match points {
        [] => (0.0, 0.0),
        [only] => (only[0] + 0.25, only[1]),
        [first, .., last] => {
            let x = (last[0] + first[0]) / 2.0 + 0.2;
            let mut y = (last[1] + first[1]) / 2.0;
            let dx = last[0] - first[0];
            let dy = last[1] - first[1];
            if dx > 0.0 {
                y += if dy > 0.0 { -0.2 } else { 0.2 };
            } else if dx < 0.0 {
                y += if dy < 0.0 { -0.2 } else { 0.2 };
            }
            (x, y)
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Clone, Default)]
pub struct CgrWriter {
    options: WriterOptions,
}

impl CgrWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> WriterOptions {
        self.options
    }

    pub fn format_graph(&self, g: &DynGraph) -> FormattedCgr {
        let (layout, colors) = self.layout(g);
        let block = match self.options.format {
            OutputFormat::Mdl => render_mdl(&layout),
            OutputFormat::Mrv => render_mrv(&layout),
        };
        FormattedCgr {
            meta: g.meta().clone(),
            colors,
            block,
        }
    }

    fn layout(&self, g: &DynGraph) -> (Layout, BTreeMap<String, String>) {
        let renum: BTreeMap<u32, u32> = g.atom_ids().zip(1..).collect();
        let number = |id: u32| renum.get(&id).copied().unwrap_or_default();

        let mut bonds: Vec<_> = g
            .bonds()
            .map(|(a, b, bond)| if number(a) <= number(b) { (a, b, bond) } else { (b, a, bond) })
            .collect();
        bonds.sort_by_key(|&(a, b, _)| (number(a), number(b)));

        // wedges go on the first free bond of each atom with a reagent depth
        // mark, pointing at that atom
        let mut wedged: BTreeMap<u32, i8> = BTreeMap::new();
        let mut bond_lines = Vec::with_capacity(bonds.len());
        let mut bond_records = Vec::new();
        for &(a, b, bond) in &bonds {
            let (code, record) = bond_table(bond.order, bond.p_order);
            let (first, second, depth) = if let Some(d) = pending_wedge(g, a, &wedged) {
                (b, a, Some(d))
            } else if let Some(d) = pending_wedge(g, b, &wedged) {
                (a, b, Some(d))
            } else {
                (a, b, None)
            };
            if let Some(d) = depth {
                wedged.insert(second, d);
            }
            bond_lines.push(BondLine {
                a: number(first),
                b: number(second),
                code,
                stereo: match depth {
                    Some(d) if d > 0 => 1,
                    Some(_) => 6,
                    None => 0,
                },
            });

            let pair = vec![number(a), number(b)];
            if let Some((kind, value)) = record {
                bond_records.push(Record {
                    kind,
                    atoms: pair.clone(),
                    value,
                });
            }
            bond_records.extend(state_record(
                pair,
                bond.stereo.map(Multi::Single).as_ref(),
                bond.p_stereo.map(Multi::Single).as_ref(),
                RecordKind::BondStereo,
                RecordKind::DynBondStereo,
            ));
        }

        let mut atoms = Vec::with_capacity(g.atom_count());
        let mut extended = Vec::new();
        let mut records = Vec::new();
        let mut colors: BTreeMap<String, BTreeMap<u32, Vec<String>>> = BTreeMap::new();
        for (id, atom) in g.atoms() {
            let n = number(id);
            let dynatom = |value: String| Record {
                kind: RecordKind::DynAtom,
                atoms: vec![n],
                value,
            };

            // the charge column only holds -3..=3
            let legacy = atom.charge.first().copied().unwrap_or(0);
            if legacy != 0 && charge_to_code(legacy) == 0 {
                extended.push(Extended::Charge {
                    atom: n,
                    charge: legacy,
                });
            }
            if let Some(value) = write_charge(&atom.charge, &atom.p_charge) {
                records.push(dynatom(value));
            }
            if atom.p_position != atom.position {
                records.push(dynatom(format_shift(atom)));
            }
            if atom.p_depth != wedged.get(&id).copied() {
                records.push(dynatom(format!("z{}", atom.p_depth.unwrap_or(0))));
            }

            records.extend(state_record(
                vec![n],
                atom.stereo.map(Multi::Single).as_ref(),
                atom.p_stereo.map(Multi::Single).as_ref(),
                RecordKind::AtomStereo,
                RecordKind::DynAtomStereo,
            ));
            if self.options.extended_labels {
                records.extend(state_record(
                    vec![n],
                    atom.hybridization.as_ref(),
                    atom.p_hybridization.as_ref(),
                    RecordKind::AtomHyb,
                    RecordKind::DynAtomHyb,
                ));
                records.extend(state_record(
                    vec![n],
                    atom.neighbors.as_ref(),
                    atom.p_neighbors.as_ref(),
                    RecordKind::AtomNeighbors,
                    RecordKind::DynAtomNeighbors,
                ));
            }

            match &atom.isotope {
                Some(Multi::Single(mass)) => extended.push(Extended::Isotope {
                    atom: n,
                    mass: *mass,
                }),
                Some(Multi::List(masses)) => {
                    let value: Vec<String> = masses.iter().map(u16::to_string).collect();
                    records.push(Record {
                        kind: RecordKind::Isotope,
                        atoms: vec![n],
                        value: value.join(","),
                    });
                }
                None => {}
            }

            for (kind, populations) in &atom.colors {
                for (&population, s_value) in populations {
                    let p_value = atom
                        .p_colors
                        .get(kind)
                        .and_then(|p| p.get(&population))
                        .unwrap_or(s_value);
                    let (kind, value) = if s_value == p_value {
                        (kind.clone(), s_value.clone())
                    } else {
                        (format!("dyn{kind}"), format!("{s_value}>{p_value}"))
                    };
                    colors
                        .entry(kind)
                        .or_default()
                        .entry(population)
                        .or_default()
                        .push(format!("{n}:{value}"));
                }
            }

            let element = match &atom.element {
                None => "A",
                Some(Multi::Single(element)) => element.symbol(),
                Some(Multi::List(elements)) => {
                    extended.push(Extended::AtomList {
                        atom: n,
                        elements: elements.clone(),
                    });
                    "L"
                }
            };
            atoms.push(AtomLine {
                map: if self.options.mark_to_map {
                    atom.mark.clone()
                } else {
                    id.to_string()
                },
                charge: atom.charge.first().copied().unwrap_or(0),
                element,
                mark: atom.mark.clone(),
                position: atom.position,
            });
        }
        records.extend(bond_records);

        let colors = colors
            .into_iter()
            .map(|(kind, populations)| {
                let lines: Vec<String> = populations
                    .into_iter()
                    .map(|(population, items)| format!("{population} {}", items.join(" ")))
                    .collect();
                (kind, lines.join("\n"))
            })
            .collect();

        let layout = Layout {
            atoms,
            bonds: bond_lines,
            extended,
            records,
        };
        (layout, colors)
    }
}

fn render_mdl(layout: &Layout) -> String {
    let mut out = String::from("\n  cgrcrab\n\n");
    out.push_str(&format!(
        "{:>3}{:>3}  0  0  0  0            999 V2000\n",
        layout.atoms.len(),
        layout.bonds.len()
    ));
    for atom in &layout.atoms {
        let [x, y, z] = atom.position;
        out.push_str(&format!(
            "{x:>10.4}{y:>10.4}{z:>10.4} {:<3} 0{:>3}  0  0  0  0  0{:>3}  0{:>3}  0  0\n",
            atom.element,
            charge_to_code(atom.charge),
            atom.mark,
            atom.map
        ));
    }
    for bond in &layout.bonds {
        out.push_str(&format!(
            "{:>3}{:>3}{:>3}{:>3}  0  0  0\n",
            bond.a, bond.b, bond.code, bond.stereo
        ));
    }

    for item in &layout.extended {
        match item {
            Extended::Charge { atom, charge } => {
                out.push_str(&format!("M  CHG  1 {atom:>3} {charge:>3}\n"));
            }
            Extended::Isotope { atom, mass } => {
                out.push_str(&format!("M  ISO  1 {atom:>3} {mass:>3}\n"));
            }
            Extended::AtomList { atom, elements } => {
                let (listed, kind): (Vec<Element>, char) = if elements.len() > half_table() {
                    let excluded = Element::all().filter(|e| !elements.contains(e)).collect();
                    (excluded, 'T')
                } else {
                    (elements.clone(), 'F')
                };
                let symbols: String = listed.iter().map(|e| format!("{:<4}", e.symbol())).collect();
                out.push_str(&format!(
                    "M  ALS {atom:>3}{:>3} {kind} {}\n",
                    listed.len(),
                    symbols.trim_end()
                ));
            }
        }
    }

    for (chunk_no, chunk) in layout.records.chunks(8).enumerate() {
        let entries: Vec<String> = (1..=chunk.len())
            .map(|i| format!("{:>3} DAT", i + chunk_no * 8))
            .collect();
        out.push_str(&format!("M  STY{:>3} {}\n", chunk.len(), entries.join(" ")));
    }
    for (i, record) in layout.records.iter().enumerate() {
        let i = i + 1;
        let points: Vec<[f64; 3]> = record
            .atoms
            .iter()
            .filter_map(|&n| layout.atom(n))
            .map(|a| a.position)
            .collect();
        let (x, y) = label_position(&points);
        let refs: Vec<String> = record.atoms.iter().map(|a| format!("{a:>3}")).collect();
        out.push_str(&format!(
            "M  SAL {i:>3}{:>3} {}\n",
            record.atoms.len(),
            refs.join(" ")
        ));
        out.push_str(&format!("M  SDT {i:>3} {}\n", record.kind.name()));
        out.push_str(&format!(
            "M  SDD {i:>3} {x:>10.4}{y:>10.4}    DAU   ALL  0       0\n"
        ));
        out.push_str(&format!("M  SED {i:>3} {}\n", record.value));
    }
    out
}

fn render_mrv(layout: &Layout) -> String {
    let scaled = |p: [f64; 3]| p.map(|c| c * 2.0);
    let mut isotopes = BTreeMap::new();
    let mut queries = BTreeMap::new();
    for item in &layout.extended {
        match item {
            Extended::Charge { .. } => {}
            Extended::Isotope { atom, mass } => {
                isotopes.insert(*atom, format!(" isotope=\"{mass}\""));
            }
            Extended::AtomList { atom, elements } => {
                let list = if elements.len() > half_table() {
                    Element::all()
                        .filter(|e| !elements.contains(e))
                        .map(|e| format!("!{}", e.symbol()))
                        .collect::<String>()
                } else {
                    let symbols: Vec<&str> = elements.iter().map(|e| e.symbol()).collect();
                    format!(",{}", symbols.join(","))
                };
                queries.insert(*atom, format!(" mrvQueryProps=\"L{list}:\""));
            }
        }
    }

    let mut out = String::from("<atomArray>");
    for (i, atom) in (1u32..).zip(&layout.atoms) {
        let [x, y, z] = scaled(atom.position);
        let mark = if atom.mark != "0" {
            format!(" ISIDAmark=\"{}\"", xml_escape(&atom.mark))
        } else {
            String::new()
        };
        out.push_str(&format!(
            "<atom id=\"a{i}\" elementType=\"{}\" x3=\"{x:.4}\" y3=\"{y:.4}\" z3=\"{z:.4}\" \
             mrvMap=\"{}\" formalCharge=\"{}\"{}{}{mark}/>",
            atom.element,
            xml_escape(&atom.map),
            atom.charge,
            isotopes.get(&i).map_or("", String::as_str),
            queries.get(&i).map_or("", String::as_str),
        ));
    }
    out.push_str("</atomArray><bondArray>");
    for (i, bond) in (1u32..).zip(&layout.bonds) {
        let (order, query) = match bond.code {
            8 => ("1".to_string(), " queryType=\"Any\""),
            code => (code.to_string(), ""),
        };
        out.push_str(&format!(
            "<bond id=\"b{i}\" atomRefs2=\"a{} a{}\" order=\"{order}\"{query}/>",
            bond.a, bond.b
        ));
    }
    out.push_str("</bondArray>");
    for (i, record) in (1u32..).zip(&layout.records) {
        let points: Vec<[f64; 3]> = record
            .atoms
            .iter()
            .filter_map(|&n| layout.atom(n))
            .map(|a| scaled(a.position))
            .collect();
        let (x, y) = label_position(&points);
        let refs: Vec<String> = record.atoms.iter().map(|a| format!("a{a}")).collect();
        out.push_str(&format!(
            "<molecule id=\"sg{i}\" role=\"DataSgroup\" fieldName=\"{}\" fieldData=\"{}\" \
             atomRefs=\"{}\" x=\"{x:.4}\" y=\"{y:.4}\" />",
            record.kind.name(),
            xml_escape(&record.value),
            refs.join(" ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{DynAtom, StereoMark};
    use crate::bond::DynBond;

    fn write(g: &DynGraph) -> String {
        CgrWriter::default().format_graph(g).block
    }

    fn ethylene_to_ethane() -> DynGraph {
        let mut g = DynGraph::new();
        let a = g.add_atom(DynAtom::new(Element::C).with_position([0.0, 0.0, 0.0]));
        let b = g.add_atom(DynAtom::new(Element::C).with_position([1.5, 0.0, 0.0]));
        g.add_bond(
            a,
            b,
            DynBond::new(Some(BondOrder::Double), Some(BondOrder::Single)),
        )
        .unwrap();
        g
    }

    #[test]
    fn bond_table_cases() {
        use BondOrder::*;
        assert_eq!(bond_table(Some(Single), Some(Single)), (1, None));
        assert_eq!(bond_table(None, None), (0, None));
        assert_eq!(
            bond_table(Some(Single), Some(Double)),
            (8, Some((RecordKind::DynBond, "1>2".to_string())))
        );
        assert_eq!(
            bond_table(None, Some(Aromatic)),
            (8, Some((RecordKind::DynBond, "0>4".to_string())))
        );
        assert_eq!(
            bond_table(Some(Any), Some(Any)),
            (8, Some((RecordKind::ExtraBond, "s".to_string())))
        );
        assert_eq!(
            bond_table(Some(Triple), Some(Any)),
            (8, Some((RecordKind::DynBond, "3>9".to_string())))
        );
    }

    #[test]
    fn static_block_layout() {
        let mut g = DynGraph::new();
        let o = g.add_atom(DynAtom::new(Element::O).with_charge(-1));
        let c = g.add_atom(DynAtom::new(Element::C).with_position([1.25, -0.5, 0.0]));
        g.add_bond(o, c, DynBond::fixed(BondOrder::Single)).unwrap();
        let block = write(&g);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "  cgrcrab");
        assert_eq!(lines[3], "  2  1  0  0  0  0            999 V2000");
        assert_eq!(
            lines[4],
            "    0.0000    0.0000    0.0000 O   0  5  0  0  0  0  0  0  0  1  0  0"
        );
        assert_eq!(
            lines[5],
            "    1.2500   -0.5000    0.0000 C   0  0  0  0  0  0  0  0  0  2  0  0"
        );
        assert_eq!(lines[6], "  1  2  1  0  0  0  0");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn dynamic_bond_record() {
        let block = write(&ethylene_to_ethane());
        assert!(block.contains("  1  2  8  0  0  0  0\n"));
        assert!(block.contains("M  STY  1   1 DAT\n"));
        assert!(block.contains("M  SAL   1  2   1   2\n"));
        assert!(block.contains("M  SDT   1 dynbond\n"));
        assert!(block.contains("M  SDD   1     0.9500    0.2000    DAU   ALL  0       0\n"));
        assert!(block.contains("M  SED   1 2>1\n"));
    }

    #[test]
    fn charge_shift_and_stereo_records() {
        let mut g = DynGraph::new();
        let mut n = DynAtom::new(Element::N).with_charges(0, 1);
        n.p_position = [0.0, 1.0, 0.0];
        n.stereo = Some(StereoMark::R);
        n.p_stereo = Some(StereoMark::S);
        g.add_atom(n);
        let block = write(&g);
        assert!(block.contains("M  SED   1 c+1\n"));
        assert!(block.contains("M  SED   2 x0,1,0\n"));
        assert!(block.contains("M  SDT   3 dynatomstereo\n"));
        assert!(block.contains("M  SED   3 r>s\n"));
    }

    #[test]
    fn extended_labels_are_optional() {
        let mut g = ethylene_to_ethane();
        g.reset_query_marks();
        assert!(!write(&g).contains("atomhyb"));
        let writer = CgrWriter::new(WriterOptions {
            extended_labels: true,
            ..WriterOptions::default()
        });
        let block = writer.format_graph(&g).block;
        assert!(block.contains("M  SDT   1 dynatomhyb\n"));
        assert!(block.contains("M  SED   1 2>1\n"));
        assert!(block.contains("M  SDT   2 atomneighbors\n"));
        assert!(block.contains("M  SED   2 1\n"));
        assert!(block.contains("M  SDT   5 dynbond\n"));
    }

    #[test]
    fn wedges_and_depth_records() {
        let mut g = DynGraph::new();
        let a = g.add_atom(DynAtom::new(Element::C));
        let mut marked = DynAtom::new(Element::C);
        marked.depth = Some(-1);
        marked.p_depth = Some(1);
        let b = g.add_atom(marked);
        g.add_bond(a, b, DynBond::fixed(BondOrder::Single)).unwrap();
        let block = write(&g);
        assert!(block.contains("  1  2  1  6  0  0  0\n"));
        assert!(block.contains("M  SED   1 z1\n"));

        // the marked atom goes second even when it sorts first
        let mut g = DynGraph::new();
        let mut marked = DynAtom::new(Element::C);
        marked.depth = Some(1);
        marked.p_depth = Some(1);
        let a = g.add_atom(marked);
        let b = g.add_atom(DynAtom::new(Element::O));
        g.add_bond(a, b, DynBond::fixed(BondOrder::Single)).unwrap();
        let block = write(&g);
        assert!(block.contains("  2  1  1  1  0  0  0\n"));
        assert!(!block.contains("M  STY"));
    }

    #[test]
    fn lists_and_isotopes() {
        let mut g = DynGraph::new();
        let mut query = DynAtom::default();
        query.element = Some(Multi::List(vec![Element::C, Element::N]));
        g.add_atom(query);
        let mut heavy = DynAtom::new(Element::O);
        heavy.isotope = Some(Multi::Single(18));
        g.add_atom(heavy);
        let mut listed = DynAtom::new(Element::H);
        listed.isotope = Some(Multi::List(vec![2, 3]));
        g.add_atom(listed);
        g.add_atom(DynAtom::default());

        let block = write(&g);
        let lines: Vec<&str> = block.lines().collect();
        assert!(lines[4].contains(" L  "));
        assert!(lines[7].contains(" A  "));
        assert!(block.contains("M  ALS   1  2 F C   N\n"));
        assert!(block.contains("M  ISO  1   2  18\n"));
        assert!(block.contains("M  SDT   1 isotope\n"));
        assert!(block.contains("M  SED   1 2,3\n"));
    }

    #[test]
    fn out_of_range_charges_use_charge_records() {
        let mut g = DynGraph::new();
        g.add_atom(DynAtom::new(Element::C).with_charges(4, 5));
        g.add_atom(DynAtom::new(Element::N).with_charges(-4, -4));
        g.add_atom(DynAtom::new(Element::O).with_charges(-1, 0));

        let block = write(&g);
        let lines: Vec<&str> = block.lines().collect();
        assert!(lines[4].contains(" C   0  0"));
        assert!(lines[6].contains(" O   0  5"));
        assert!(block.contains("M  CHG  1   1   4\n"));
        assert!(block.contains("M  CHG  1   2  -4\n"));
        assert_eq!(block.matches("M  CHG").count(), 2);
        assert!(block.contains("M  SED   1 c+1\n"));
    }

    #[test]
    fn long_lists_become_exclusions() {
        let mut g = DynGraph::new();
        let mut query = DynAtom::default();
        query.element = Some(Multi::List(
            Element::all().filter(|&e| e != Element::Xe).collect(),
        ));
        g.add_atom(query);
        assert!(write(&g).contains("M  ALS   1  1 T Xe\n"));
    }

    #[test]
    fn colors_group_by_kind_and_population() {
        let mut g = ethylene_to_ethane();
        for (id, s, p) in [(1, "a", "a"), (2, "b", "c")] {
            let atom = g.atom_mut(id).unwrap();
            atom.colors
                .entry("PHTYP".into())
                .or_default()
                .insert(1, s.into());
            atom.p_colors
                .entry("PHTYP".into())
                .or_default()
                .insert(1, p.into());
        }
        g.atom_mut(1)
            .unwrap()
            .colors
            .get_mut("PHTYP")
            .unwrap()
            .insert(2, "x".into());
        let formatted = CgrWriter::default().format_graph(&g);
        assert_eq!(formatted.colors["PHTYP"], "1 1:a\n2 1:x");
        assert_eq!(formatted.colors["dynPHTYP"], "1 2:b>c");
    }

    #[test]
    fn mark_to_map() {
        let mut g = DynGraph::new();
        let mut atom = DynAtom::new(Element::C);
        atom.mark = "7".into();
        g.add_atom(atom);
        let writer = CgrWriter::new(WriterOptions {
            mark_to_map: true,
            ..WriterOptions::default()
        });
        let block = writer.format_graph(&g).block;
        assert!(block.contains(" C   0  0  0  0  0  0  0  7  0  7  0  0\n"));
    }

    #[test]
    fn mrv_rendering() {
        let mut g = ethylene_to_ethane();
        g.atom_mut(1).unwrap().mark = "3".into();
        let writer = CgrWriter::new(WriterOptions {
            format: OutputFormat::Mrv,
            ..WriterOptions::default()
        });
        let block = writer.format_graph(&g).block;
        assert!(block.starts_with("<atomArray><atom id=\"a1\" elementType=\"C\""));
        assert!(block.contains("x3=\"3.0000\""));
        assert!(block.contains("ISIDAmark=\"3\""));
        assert!(block.contains("<bond id=\"b1\" atomRefs2=\"a1 a2\" order=\"1\" queryType=\"Any\"/>"));
        assert!(block.contains("fieldName=\"dynbond\" fieldData=\"2&gt;1\""));
        assert!(block.ends_with("/>"));
    }

    #[test]
    fn label_positions() {
        assert_eq!(label_position(&[[1.0, 2.0, 0.0]]), (1.25, 2.0));
        let (x, y) = label_position(&[[0.0, 0.0, 0.0], [2.0, 2.0, 0.0]]);
        assert!((x - 1.2).abs() < 1e-9 && (y - 0.8).abs() < 1e-9);
        let (_, y) = label_position(&[[2.0, 0.0, 0.0], [0.0, 2.0, 0.0]]);
        assert!((y - 1.2).abs() < 1e-9);
    }
}
