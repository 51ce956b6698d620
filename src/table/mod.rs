//! Truth tables.
//!
//! A truth table is the plain value map of a Boolean function: entry x
//! holds the image of x. Bijective tables feed the synthesizers directly;
//! partial functions go through [`extend`] first.

use crate::{
    gate::Gate,
    math::{count_bits, full_mask, N, Word},
};

pub use self::parser::{ParseError, ParsedTable, TruthTableParser};

pub mod extend;
mod parser;

pub type TruthTable = Vec<Word>;

/// Evaluate a gate sequence on every input, producing its table.
pub fn table_from_scheme<'a, I>(scheme: I, n: N) -> TruthTable
where
    I: IntoIterator<Item = &'a Gate> + Copy,
{
    (0..=full_mask(n))
        .map(|x| scheme.into_iter().fold(x, |value, gate| gate.apply(value)))
        .collect()
}

/// Hidden-weighted-bit function: rotate x left by its weight.
pub fn hwb(n: N) -> TruthTable {
    let count: Word = 1 << n;
    let mask = count - 1;

    (0..count)
        .map(|x| {
            let weight = count_bits(x);
            ((x << weight) & mask) | ((x >> (n - weight)) & mask)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_to_table() {
        let scheme = [Gate::cnot(2, 0b01, 0b10)];
        let table = table_from_scheme(&scheme, 2);

        assert_eq!(table, vec![0, 1, 3, 2]);
    }

    #[test]
    fn hwb_is_a_permutation() {
        for n in 1..6 {
            let mut table = hwb(n);
            table.sort_unstable();

            let expected: TruthTable = (0..1 << n).collect();
            assert_eq!(table, expected, "hwb({})", n);
        }
    }

    #[test]
    fn hwb_small_values() {
        // weight(0b01) = 1 rotates one position left
        let table = hwb(2);
        assert_eq!(table, vec![0, 2, 1, 3]);
    }
}
