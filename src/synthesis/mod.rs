//! Synthesis drivers.
//!
//! [`synthesize`] is the in-process entry point: it feeds the table to the
//! Reed–Muller driver, hands the residual multiplier tables to the group
//! theoretic driver, optimizes the concatenated cascade and verifies it
//! input by input.

use std::{collections::HashSet, fmt, io};

use crate::{config::Config, math::Word, scheme::Scheme, table::TruthTable};

pub use self::{
    composite::CompositeGenerator,
    gt::GtGenerator,
    memory::GtGeneratorWithMemory,
    partial::{PartialGtGenerator, PartialResult, PartialResultKind},
    rm::{RmGenerator, RmSynthesisResult},
};

mod composite;
mod gt;
mod memory;
mod partial;
mod rm;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input table has a duplicate or out-of-range output.
    InvalidTable(String),
    /// Table is too large for the machine word.
    UnsupportedSize(usize),
    /// A gate or scheme violated its invariant; indicates a bug.
    Precondition(String),
    /// Final verification or an internal consistency check failed;
    /// indicates a bug.
    InternalCheck(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTable(message) => write!(f, "Invalid truth table: {}", message),
            Error::UnsupportedSize(size) => {
                write!(f, "Table of size {} does not fit the machine word", size)
            }
            Error::Precondition(message) => write!(f, "Precondition failure: {}", message),
            Error::InternalCheck(message) => write!(f, "Internal check failure: {}", message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Synthesize a reversible scheme realizing a bijective truth table.
///
/// `log` receives human-readable progress; pass [`io::sink()`] to drop it.
pub fn synthesize(table: &TruthTable, config: &Config, log: &mut dyn io::Write) -> Result<Scheme> {
    CompositeGenerator::new(config).generate(table, log)
}

/// Reject tables with duplicate or missing outputs.
pub(crate) fn check_table_is_permutation(table: &TruthTable) -> Result<()> {
    let size = table.len();

    if size > 0 && size.count_ones() != 1 {
        return Err(Error::InvalidTable(format!(
            "size {} is not a power of two",
            size
        )));
    }

    let mut outputs: HashSet<Word> = HashSet::with_capacity(size);
    for (x, &y) in table.iter().enumerate() {
        if y >= size as Word {
            return Err(Error::InvalidTable(format!(
                "output {} of input {} is out of range",
                y, x
            )));
        }

        if !outputs.insert(y) {
            return Err(Error::InvalidTable(format!("duplicate output {}", y)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_check() {
        assert!(check_table_is_permutation(&vec![0, 1, 3, 2]).is_ok());
        assert!(check_table_is_permutation(&vec![]).is_ok());

        assert!(matches!(
            check_table_is_permutation(&vec![0, 1, 1, 2]),
            Err(Error::InvalidTable(_))
        ));
        assert!(matches!(
            check_table_is_permutation(&vec![0, 1, 2, 4]),
            Err(Error::InvalidTable(_))
        ));
        assert!(matches!(
            check_table_is_permutation(&vec![0, 1, 2]),
            Err(Error::InvalidTable(_))
        ));
    }
}
