use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::bond::BondOrder;

use super::charge_from_code;
use super::error::CgrError;
use super::record::{Collector, Record};

/// One atom line of a legacy block, before any record is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAtom {
    pub element: String,
    pub mass_diff: i16,
    pub charge: i8,
    pub position: [f64; 3],
    pub mark: String,
    pub map: u32,
}

/// One bond line; `a` and `b` are 1-based positions in the atom list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBond {
    pub a: u32,
    pub b: u32,
    pub order: Option<BondOrder>,
    pub stereo: u8,
}

/// A parsed legacy molecule block with its extension records and the data
/// items that framed it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MolBlock {
    pub atoms: Vec<RawAtom>,
    pub bonds: Vec<RawBond>,
    pub records: Vec<Record>,
    pub meta: BTreeMap<String, Vec<String>>,
    pub colors: BTreeMap<String, Vec<String>>,
}

pub(crate) fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).map_or("", str::trim)
}

pub(crate) fn int<T: std::str::FromStr + Default>(
    line_no: usize,
    line: &str,
    start: usize,
    end: usize,
    what: &str,
) -> Result<T, CgrError> {
    let text = column(line, start, end);
    if text.is_empty() {
        return Ok(T::default());
    }
    text.parse()
        .map_err(|_| CgrError::parse(line_no, format!("invalid {what} {text:?}")))
}

fn float(line_no: usize, line: &str, start: usize, end: usize) -> Result<f64, CgrError> {
    let text = column(line, start, end);
    text.parse()
        .map_err(|_| CgrError::parse(line_no, format!("invalid coordinate {text:?}")))
}

pub(crate) fn legacy_bond_order(code: u8) -> Option<BondOrder> {
    match code {
        0 => None,
        1 => Some(BondOrder::Single),
        2 => Some(BondOrder::Double),
        3 => Some(BondOrder::Triple),
        4 => Some(BondOrder::Aromatic),
        _ => Some(BondOrder::Any),
    }
}

fn parse_atom(line_no: usize, line: &str) -> Result<RawAtom, CgrError> {
    let position = [
        float(line_no, line, 0, 10)?,
        float(line_no, line, 10, 20)?,
        float(line_no, line, 20, 30)?,
    ];
    let element = column(line, 31, 34);
    if element.is_empty() {
        return Err(CgrError::parse(line_no, "missing element symbol"));
    }
    let code: u8 = int(line_no, line, 36, 39, "charge code")?;
    let mark = match column(line, 54, 57) {
        "" => "0",
        m => m,
    };
    Ok(RawAtom {
        element: element.to_string(),
        mass_diff: int(line_no, line, 34, 36, "mass difference")?,
        charge: charge_from_code(code),
        position,
        mark: mark.to_string(),
        map: int(line_no, line, 60, 63, "atom map")?,
    })
}

fn parse_bond(line_no: usize, line: &str, atoms: usize) -> Result<RawBond, CgrError> {
    let a: u32 = int(line_no, line, 0, 3, "bond atom")?;
    let b: u32 = int(line_no, line, 3, 6, "bond atom")?;
    for x in [a, b] {
        if x == 0 || x as usize > atoms {
            return Err(CgrError::parse(line_no, format!("bond to missing atom {x}")));
        }
    }
    if a == b {
        return Err(CgrError::parse(line_no, format!("atom {a} bonded to itself")));
    }
    let code: u8 = int(line_no, line, 6, 9, "bond order")?;
    Ok(RawBond {
        a,
        b,
        order: legacy_bond_order(code),
        stereo: int(line_no, line, 9, 12, "bond stereo")?,
    })
}

/// Applies an `M  CHG` line: absolute charges for atoms whose charge does
/// not fit the atom line column.
fn apply_charges(atoms: &mut [RawAtom], line: &str) {
    let count = column(line, 6, 9).parse::<usize>().unwrap_or(1);
    for i in 0..count {
        let atom = column(line, 10 + 8 * i, 13 + 8 * i).parse::<usize>().ok();
        let charge = column(line, 14 + 8 * i, 17 + 8 * i).parse::<i8>().ok();
        match (atom, charge) {
            (Some(a), Some(c)) if (1..=atoms.len()).contains(&a) => atoms[a - 1].charge = c,
            _ => debug!(line, entry = i, "discarding malformed charge entry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header(u8),
    Counts,
    Atoms,
    Bonds,
    Properties,
    Done,
}

/// Line-fed parser of one V2000 molecule block.
///
/// Feed it the three header lines, the counts line, the atom and bond
/// tables and the property lines; it completes on `M  END`.
#[derive(Debug)]
pub(crate) struct CtabParser {
    state: State,
    atom_count: usize,
    bond_count: usize,
    block: MolBlock,
}

impl Default for CtabParser {
    fn default() -> Self {
        Self {
            state: State::Header(0),
            atom_count: 0,
            bond_count: 0,
            block: MolBlock::default(),
        }
    }
}

impl CtabParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Consumes one line. Returns the finished block after `M  END`.
    pub(crate) fn feed(
        &mut self,
        line_no: usize,
        line: &str,
        collector: &mut Collector,
    ) -> Result<Option<MolBlock>, CgrError> {
        match self.state {
            State::Header(n) => {
                self.state = if n == 2 { State::Counts } else { State::Header(n + 1) };
            }
            State::Counts => {
                if line.contains("V3000") {
                    return Err(CgrError::parse(line_no, "V3000 blocks are not supported"));
                }
                self.atom_count = int(line_no, line, 0, 3, "atom count")?;
                self.bond_count = int(line_no, line, 3, 6, "bond count")?;
                if self.atom_count == 0 {
                    collector.reset();
                    return Err(CgrError::EmptyMolecule);
                }
                self.block.atoms.reserve(self.atom_count);
                self.block.bonds.reserve(self.bond_count);
                self.state = State::Atoms;
            }
            State::Atoms => {
                self.block.atoms.push(parse_atom(line_no, line)?);
                if self.block.atoms.len() == self.atom_count {
                    self.state = if self.bond_count == 0 {
                        State::Properties
                    } else {
                        State::Bonds
                    };
                }
            }
            State::Bonds => {
                let bond = parse_bond(line_no, line, self.atom_count)?;
                self.block.bonds.push(bond);
                if self.block.bonds.len() == self.bond_count {
                    self.state = State::Properties;
                }
            }
            State::Properties => {
                if line.starts_with("M  END") {
                    self.state = State::Done;
                    let mut block = std::mem::take(&mut self.block);
                    block.records = collector.take_collected();
                    trace!(
                        atoms = block.atoms.len(),
                        bonds = block.bonds.len(),
                        records = block.records.len(),
                        "molecule block parsed"
                    );
                    return Ok(Some(block));
                }
                if line.starts_with("M  CHG") {
                    apply_charges(&mut self.block.atoms, line);
                } else {
                    collector.collect(line);
                }
            }
            State::Done => return Err(CgrError::FinalizedFile),
        }
        Ok(None)
    }
}

/// Parses a complete molfile text (header through `M  END`).
pub fn parse_molfile(text: &str) -> Result<MolBlock, CgrError> {
    let mut parser = CtabParser::new();
    let mut collector = Collector::new();
    let mut last = 0;
    for (n, line) in text.lines().enumerate() {
        last = n + 1;
        if let Some(block) = parser.feed(last, line, &mut collector)? {
            return Ok(block);
        }
    }
    Err(CgrError::parse(last, "unexpected end of molecule block"))
}
