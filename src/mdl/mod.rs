//! MDL-family codec for condensed graphs of reaction.
//!
//! A CGR is stored as an ordinary V2000 molecule block whose dynamic parts
//! live in extension records: generic data groups (`M  STY`/`SAL`/`SDT`/
//! `SED`), atom lists (`M  ALS`) and isotopes (`M  ISO`). Reading goes
//! through [`ctab`] and [`record`] into a [`CgrReader`]; writing goes
//! through a [`CgrWriter`]. The SD and RD file framings wrap both.

pub mod assemble;
pub mod ctab;
pub mod error;
pub mod rdf;
pub mod record;
pub mod sdf;
mod value;
pub mod writer;

pub use assemble::{CgrReader, RawReaction, ReaderOptions};
pub use ctab::{parse_molfile, MolBlock, RawAtom, RawBond};
pub use error::CgrError;
pub use rdf::{read_rxn, to_rxn_string, RdfReader, RdfWriter, RxnParser};
pub use record::{Collector, Record, RecordKind};
pub use sdf::{SdfReader, SdfWriter};
pub use writer::{CgrWriter, FormattedCgr, OutputFormat, WriterOptions};

/// Atom side-channel kinds carried as data items next to a structure.
pub const COLOR_KINDS: [&str; 6] = ["PHTYP", "FFTYP", "PCTYP", "EPTYP", "HBONDCHG", "CNECHG"];

/// Whether a data item name is a colors block, plain or `dyn` prefixed.
pub fn is_color_kind(name: &str) -> bool {
    let plain = name.strip_prefix("dyn").unwrap_or(name);
    COLOR_KINDS.contains(&plain)
}

/// Legacy charge column code to formal charge. Code 4 (doublet radical)
/// and unknown codes read as neutral.
pub(crate) fn charge_from_code(code: u8) -> i8 {
    match code {
        1 => 3,
        2 => 2,
        3 => 1,
        5 => -1,
        6 => -2,
        7 => -3,
        _ => 0,
    }
}

/// Formal charge to legacy charge column code; charges outside -3..=3 write
/// as neutral.
pub(crate) fn charge_to_code(charge: i8) -> u8 {
    match charge {
        3 => 1,
        2 => 2,
        1 => 3,
        -1 => 5,
        -2 => 6,
        -3 => 7,
        _ => 0,
    }
}
