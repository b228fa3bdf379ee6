use cgrcrab::mdl::{parse_molfile, Record};
use cgrcrab::{BondOrder, CgrReader, CgrWriter, DynGraph, Element, Multi};
use serde::Deserialize;

#[derive(Deserialize)]
struct AtomEntry {
    id: u32,
    element: Option<String>,
    charge: [Vec<i8>; 2],
}

#[derive(Deserialize)]
struct BondEntry {
    a: u32,
    b: u32,
    order: [Option<u8>; 2],
}

#[derive(Deserialize)]
struct DecodeEntry {
    name: String,
    molfile: String,
    center: Vec<u32>,
    atoms: Vec<AtomEntry>,
    bonds: Vec<BondEntry>,
}

fn load() -> Vec<DecodeEntry> {
    serde_json::from_str(include_str!("approval_data/decode.json")).unwrap()
}

fn decode(entry: &DecodeEntry) -> DynGraph {
    let block = parse_molfile(&entry.molfile).unwrap();
    CgrReader::default().molecule(block).unwrap()
}

fn as_list(m: &Multi<i8>) -> Vec<i8> {
    m.as_slice().to_vec()
}

fn sorted(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|x, y| {
        (x.kind, &x.atoms, &x.value).cmp(&(y.kind, &y.atoms, &y.value))
    });
    records
}

#[test]
fn approval_decode() {
    let mut failures = Vec::new();
    for entry in &load() {
        let g = decode(entry);

        if g.center_atoms(false) != entry.center.as_slice() {
            failures.push(format!(
                "[center] {}: expected {:?}, got {:?}",
                entry.name,
                entry.center,
                g.center_atoms(false)
            ));
        }

        for expected in &entry.atoms {
            let Some(atom) = g.atom(expected.id) else {
                failures.push(format!("[atom] {}: missing atom {}", entry.name, expected.id));
                continue;
            };
            let element = expected
                .element
                .as_deref()
                .map(|s| Element::from_symbol(s).unwrap());
            if atom.single_element() != element {
                failures.push(format!(
                    "[element] {} atom {}: expected {:?}, got {:?}",
                    entry.name, expected.id, element, atom.element
                ));
            }
            let charge = [as_list(&atom.charge), as_list(&atom.p_charge)];
            if charge != expected.charge {
                failures.push(format!(
                    "[charge] {} atom {}: expected {:?}, got {:?}",
                    entry.name, expected.id, expected.charge, charge
                ));
            }
        }

        if g.bond_count() != entry.bonds.len() {
            failures.push(format!("[bonds] {}: wrong bond count", entry.name));
        }
        for expected in &entry.bonds {
            let got = g
                .bond(expected.a, expected.b)
                .map(|bond| [bond.order.map(BondOrder::code), bond.p_order.map(BondOrder::code)]);
            if got != Some(expected.order) {
                failures.push(format!(
                    "[bond] {} {}-{}: expected {:?}, got {:?}",
                    entry.name, expected.a, expected.b, expected.order, got
                ));
            }
        }
    }

    for f in &failures {
        eprintln!("FAIL: {f}");
    }
    assert!(failures.is_empty(), "{} decode checks failed", failures.len());
}

#[test]
fn approval_reencode_reproduces_records() {
    let writer = CgrWriter::default();
    for entry in &load() {
        let original = parse_molfile(&entry.molfile).unwrap();
        let g = CgrReader::default().molecule(original.clone()).unwrap();
        let text = format!("{}M  END\n", writer.format_graph(&g).block);
        let written = parse_molfile(&text).unwrap();
        assert_eq!(
            sorted(written.records),
            sorted(original.records),
            "records differ for {}",
            entry.name
        );
        assert_eq!(written.atoms.len(), original.atoms.len());
        assert_eq!(written.bonds.len(), original.bonds.len());
    }
}
