use thiserror::Error;

use crate::mol::GraphError;

/// Errors raised while reading or writing MDL-family CGR files.
///
/// Malformed extension records are not errors: they are dropped and the
/// parse continues.
#[derive(Debug, Error)]
pub enum CgrError {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A molecule block declared no atoms.
    #[error("molecule block contains no atoms")]
    EmptyMolecule,

    /// The same atom map number occurs twice among the reactants or among
    /// the products.
    #[error("duplicate atom map number {map} in {role}")]
    DuplicateMap { role: &'static str, map: u32 },

    /// Input was fed after the reaction was already complete.
    #[error("reaction is already finalized")]
    FinalizedFile,

    #[error("failed to parse CGR block: {details} (at line ~{line})")]
    Parse { line: usize, details: String },

    #[error("inconsistent graph: {0}")]
    Graph(#[from] GraphError),
}

impl CgrError {
    pub fn parse(line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            line,
            details: details.into(),
        }
    }
}
