//! Condensed graphs of reaction (CGR).
//!
//! A CGR superimposes the reagents and products of a reaction on one graph:
//! every atom and bond carries a reagent state and a product state. The
//! [`mdl`] module reads and writes CGRs as MDL molfiles, SD and RD files
//! with extension records; the graph type offers reaction-center
//! extraction, decomposition, hydrogen handling and valence checks.

pub mod atom;
pub mod bond;
pub mod center;
pub mod container;
pub mod element;
pub mod hybridization;
pub mod hydrogen;
pub mod mdl;
pub mod mol;
pub mod valence;

pub use atom::{Atom, Colors, DynAtom, Hybridization, Multi, StereoMark};
pub use bond::{Bond, BondOrder, DynBond};
pub use container::{DynamicContainer, ReactionContainer};
pub use element::Element;
pub use mdl::{
    read_rxn, to_rxn_string, CgrError, CgrReader, CgrWriter, FormattedCgr, OutputFormat,
    RdfReader, RdfWriter, ReaderOptions, SdfReader, SdfWriter, WriterOptions,
};
pub use mol::{DynGraph, GraphError, Mol, Molecule};
pub use valence::ValenceIssue;
