use std::collections::BTreeMap;

use tracing::{debug, trace};

/// Type tag of an extension record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    DynBond,
    ExtraBond,
    BondStereo,
    DynBondStereo,
    DynAtom,
    AtomList,
    AtomNotList,
    Isotope,
    AtomHyb,
    DynAtomHyb,
    AtomNeighbors,
    DynAtomNeighbors,
    AtomStereo,
    DynAtomStereo,
}

impl RecordKind {
    pub fn from_name(name: &str) -> Option<RecordKind> {
        Some(match name {
            "dynbond" => RecordKind::DynBond,
            "extrabond" => RecordKind::ExtraBond,
            "bondstereo" => RecordKind::BondStereo,
            "dynbondstereo" => RecordKind::DynBondStereo,
            "dynatom" => RecordKind::DynAtom,
            "atomlist" => RecordKind::AtomList,
            "atomnotlist" => RecordKind::AtomNotList,
            "isotope" => RecordKind::Isotope,
            "atomhyb" => RecordKind::AtomHyb,
            "dynatomhyb" => RecordKind::DynAtomHyb,
            "atomneighbors" => RecordKind::AtomNeighbors,
            "dynatomneighbors" => RecordKind::DynAtomNeighbors,
            "atomstereo" => RecordKind::AtomStereo,
            "dynatomstereo" => RecordKind::DynAtomStereo,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordKind::DynBond => "dynbond",
            RecordKind::ExtraBond => "extrabond",
            RecordKind::BondStereo => "bondstereo",
            RecordKind::DynBondStereo => "dynbondstereo",
            RecordKind::DynAtom => "dynatom",
            RecordKind::AtomList => "atomlist",
            RecordKind::AtomNotList => "atomnotlist",
            RecordKind::Isotope => "isotope",
            RecordKind::AtomHyb => "atomhyb",
            RecordKind::DynAtomHyb => "dynatomhyb",
            RecordKind::AtomNeighbors => "atomneighbors",
            RecordKind::DynAtomNeighbors => "dynatomneighbors",
            RecordKind::AtomStereo => "atomstereo",
            RecordKind::DynAtomStereo => "dynatomstereo",
        }
    }

    /// Number of atoms a record of this kind refers to.
    pub fn arity(self) -> usize {
        match self {
            RecordKind::DynBond
            | RecordKind::ExtraBond
            | RecordKind::BondStereo
            | RecordKind::DynBondStereo => 2,
            _ => 1,
        }
    }
}

/// A decoded extension record: kind, 1-based positional atom numbers
/// within the block, and the raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub atoms: Vec<u32>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RecordKey {
    Group(u32),
    AtomList(u32),
    Isotope(u32),
}

#[derive(Debug, Default)]
struct Pending {
    kind: Option<RecordKind>,
    atoms: Vec<u32>,
    value: Option<String>,
}

fn field(line: &str, start: usize, end: usize) -> Option<&str> {
    let end = end.min(line.len());
    line.get(start..end).map(str::trim)
}

fn number(line: &str, start: usize, end: usize) -> Option<u32> {
    field(line, start, end)?.parse().ok()
}

/// Accumulates extension records of one molecule block, line by line.
///
/// Data groups span several lines (`STY`, `SAL`, `SDT`, `SED`) and are
/// only complete once all of them were seen. Create one per parse unit.
#[derive(Debug, Default)]
pub struct Collector {
    pending: BTreeMap<RecordKey, Pending>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one property line. Unknown or malformed lines are ignored.
    pub fn collect(&mut self, line: &str) {
        let Some(tag) = line.get(..6) else { return };
        match tag {
            "M  ALS" => self.collect_atom_list(line),
            "M  ISO" => self.collect_isotopes(line),
            "M  STY" => {
                let count = number(line, 6, 9).unwrap_or(0) as usize;
                for i in 0..count {
                    let Some(idx) = number(line, 10 + 8 * i, 13 + 8 * i) else { continue };
                    if field(line, 14 + 8 * i, 17 + 8 * i) == Some("DAT") {
                        self.pending.insert(RecordKey::Group(idx), Pending::default());
                    }
                }
            }
            "M  SAL" => {
                let Some(pending) = self.group(line) else { return };
                let count = number(line, 10, 13).unwrap_or(0) as usize;
                pending
                    .atoms
                    .extend((0..count).filter_map(|i| number(line, 14 + 4 * i, 17 + 4 * i)));
                pending.atoms.sort_unstable();
            }
            "M  SDT" => {
                let Some(idx) = number(line, 7, 10) else { return };
                let Some(pending) = self.pending.get_mut(&RecordKey::Group(idx)) else {
                    return;
                };
                let name = line.split_whitespace().last().unwrap_or("").to_lowercase();
                match RecordKind::from_name(&name) {
                    Some(kind) => pending.kind = Some(kind),
                    None => {
                        trace!(group = idx, name = %name, "ignoring foreign data group");
                        self.pending.remove(&RecordKey::Group(idx));
                    }
                }
            }
            "M  SED" => {
                let Some(pending) = self.group(line) else { return };
                let value = line.get(10..).unwrap_or("").trim().replace('/', "");
                pending.value = Some(value.to_lowercase());
            }
            _ => {}
        }
    }

    fn group(&mut self, line: &str) -> Option<&mut Pending> {
        let idx = number(line, 7, 10)?;
        self.pending.get_mut(&RecordKey::Group(idx))
    }

    fn collect_atom_list(&mut self, line: &str) {
        let Some(atom) = number(line, 7, 10) else { return };
        let count = number(line, 10, 13).unwrap_or(0) as usize;
        let kind = if line.get(14..15) == Some("F") {
            RecordKind::AtomList
        } else {
            RecordKind::AtomNotList
        };
        let symbols: Vec<&str> = (0..count)
            .filter_map(|i| field(line, 16 + 4 * i, 20 + 4 * i))
            .filter(|s| !s.is_empty())
            .collect();
        self.pending.insert(
            RecordKey::AtomList(atom),
            Pending {
                kind: Some(kind),
                atoms: vec![atom],
                value: Some(symbols.join(",")),
            },
        );
    }

    fn collect_isotopes(&mut self, line: &str) {
        let count = number(line, 6, 9).unwrap_or(1) as usize;
        for i in 0..count {
            let atom = number(line, 10 + 8 * i, 13 + 8 * i);
            let value = field(line, 14 + 8 * i, 17 + 8 * i);
            let (Some(atom), Some(value)) = (atom, value) else { continue };
            self.pending.insert(
                RecordKey::Isotope(atom),
                Pending {
                    kind: Some(RecordKind::Isotope),
                    atoms: vec![atom],
                    value: Some(value.to_string()),
                },
            );
        }
    }

    /// Returns every complete record whose atom count matches its kind and
    /// clears the accumulator.
    pub fn take_collected(&mut self) -> Vec<Record> {
        let mut records = Vec::new();
        for (key, pending) in std::mem::take(&mut self.pending) {
            match pending {
                Pending {
                    kind: Some(kind),
                    atoms,
                    value: Some(value),
                } if atoms.len() == kind.arity() => records.push(Record { kind, atoms, value }),
                _ => debug!(?key, "dropping incomplete extension record"),
            }
        }
        records
    }

    /// Discards everything collected so far.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(lines: &[&str]) -> Vec<Record> {
        let mut c = Collector::new();
        for line in lines {
            c.collect(line);
        }
        c.take_collected()
    }

    #[test]
    fn data_group_records() {
        let records = collect(&[
            "M  STY  2   1 DAT   2 DAT",
            "M  SAL   1  2   3   1",
            "M  SDT   1 dynbond",
            "M  SDD   1     0.0000    0.0000    DAU   ALL  0       0",
            "M  SED   1 1>2",
            "M  SAL   2  1   4",
            "M  SDT   2 dynatom",
            "M  SED   2 c+1",
        ]);
        assert_eq!(
            records,
            vec![
                Record {
                    kind: RecordKind::DynBond,
                    atoms: vec![1, 3],
                    value: "1>2".into()
                },
                Record {
                    kind: RecordKind::DynAtom,
                    atoms: vec![4],
                    value: "c+1".into()
                },
            ]
        );
    }

    #[test]
    fn wrong_arity_is_dropped() {
        let records = collect(&[
            "M  STY  1   1 DAT",
            "M  SAL   1  1   3",
            "M  SDT   1 dynbond",
            "M  SED   1 1>2",
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn foreign_groups_are_ignored() {
        let records = collect(&[
            "M  STY  1   1 DAT",
            "M  SAL   1  1   3",
            "M  SDT   1 MULTIPLE_GROUP",
            "M  SED   1 whatever",
            "M  SAL   7  1   3",
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn sed_value_is_normalized() {
        let records = collect(&[
            "M  STY  1   1 DAT",
            "M  SAL   1  1   2",
            "M  SDT   1 DYNATOMSTEREO",
            "M  SED   1 /R>S/",
        ]);
        assert_eq!(records[0].kind, RecordKind::DynAtomStereo);
        assert_eq!(records[0].value, "r>s");
    }

    #[test]
    fn atom_lists_and_isotopes() {
        let records = collect(&[
            "M  ALS   2  2 F C   N   ",
            "M  ALS   5  1 T O   ",
            "M  ISO  2   1  13   3  15",
        ]);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].kind, RecordKind::AtomList);
        assert_eq!(records[0].value, "C,N");
        assert_eq!(records[1].kind, RecordKind::AtomNotList);
        assert_eq!(records[1].atoms, vec![5]);
        assert_eq!(records[1].value, "O");
        assert_eq!(records[2].kind, RecordKind::Isotope);
        assert_eq!(records[2].atoms, vec![1]);
        assert_eq!(records[3].value, "15");
    }

    #[test]
    fn reset_discards() {
        let mut c = Collector::new();
        c.collect("M  ISO  1   1  13");
        assert!(!c.is_empty());
        c.reset();
        assert!(c.take_collected().is_empty());
    }
}
