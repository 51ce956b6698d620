//! Group theoretic driver.
//!
//! Reduces a permutation to the identity by repeatedly synthesizing the
//! best partial result. When the left- and right-multiplied residuals
//! differ, both are prepared and the one promising the better next step
//! wins; its gates grow the scheme on the matching side of the insertion
//! point.

use super::{check_table_is_permutation, PartialGtGenerator, Result};
use crate::{
    config::Config,
    math::{significant_bit_count, N, Word},
    permutation::Permutation,
    scheme::Scheme,
    table::TruthTable,
};

pub struct GtGenerator {
    config: Config,
}

impl GtGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn generate(&self, table: &TruthTable) -> Result<Scheme> {
        check_table_is_permutation(table)?;

        let (n, permutation) = permutation_of_table(table);

        let mut scheme = Scheme::new();

        if permutation.len() > 0 {
            let mut insert_pos: N = 0;

            let mut partial = PartialGtGenerator::new(&self.config);
            partial.set_permutation(permutation, n);
            partial.prepare_for_generation();

            let mut current = Some(partial);
            while let Some(generator) = current {
                current = self.reduce_permutation(generator, n, &mut scheme, &mut insert_pos)?;
            }
        }

        Ok(scheme)
    }

    fn reduce_permutation(
        &self,
        generator: PartialGtGenerator,
        n: N,
        scheme: &mut Scheme,
        insert_pos: &mut N,
    ) -> Result<Option<PartialGtGenerator>> {
        if generator.left_and_right_multiplication_differs() {
            // prepare both residuals and keep the one whose next partial
            // result ranks better
            let mut left_generator = PartialGtGenerator::new(&self.config);
            left_generator.set_permutation(generator.residual_permutation(true), n);
            left_generator.prepare_for_generation();

            let mut right_generator = PartialGtGenerator::new(&self.config);
            right_generator.set_permutation(generator.residual_permutation(false), n);
            right_generator.prepare_for_generation();

            let left_is_better = match (
                left_generator.partial_result(),
                right_generator.partial_result(),
            ) {
                (Some(left), Some(right)) => left.is_better_than(right),
                (left, _) => left.is_some(),
            };

            if left_is_better {
                implement_partial_result(&generator, true, scheme, insert_pos)?;
                Ok(Some(left_generator))
            } else {
                implement_partial_result(&generator, false, scheme, insert_pos)?;
                Ok(Some(right_generator))
            }
        } else {
            implement_partial_result(&generator, true, scheme, insert_pos)?;

            let residual = generator.residual_permutation(true);
            if residual.is_empty() {
                Ok(None)
            } else {
                let mut next = PartialGtGenerator::new(&self.config);
                next.set_permutation(residual, n);
                next.prepare_for_generation();

                Ok(Some(next))
            }
        }
    }
}

/// Gates of a left-multiplied partial result go after the insertion
/// point, gates of a right-multiplied one before it.
fn implement_partial_result(
    generator: &PartialGtGenerator,
    left_multiplication: bool,
    scheme: &mut Scheme,
    insert_pos: &mut N,
) -> Result<()> {
    let elements = generator.implement_partial_result()?;
    debug_assert!(!elements.is_empty());

    let count = elements.len();
    for element in elements.into_iter().rev() {
        scheme.insert(*insert_pos, element);
    }

    if left_multiplication {
        *insert_pos += count;
    }

    Ok(())
}

/// Derive the line count from the largest element of the permutation; a
/// parity completion past the table boundary widens the circuit by one.
fn permutation_of_table(table: &TruthTable) -> (N, Permutation) {
    let permutation = Permutation::from_table(table);

    let mut max_value: Word = 0;
    for cycle in &permutation {
        for &element in cycle.elements() {
            max_value |= element;
        }
    }

    (significant_bit_count(max_value), permutation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(table: TruthTable) -> Scheme {
        GtGenerator::new(&Config::default()).generate(&table).unwrap()
    }

    #[test]
    fn identity_is_empty() {
        let scheme = generate((0..8).collect());
        assert!(scheme.is_empty());
    }

    #[test]
    fn realizes_small_tables() {
        let tables: Vec<TruthTable> = vec![
            vec![1, 0],
            vec![0, 1, 3, 2],
            vec![1, 2, 0, 3],
            vec![0, 1, 2, 3, 4, 5, 7, 6],
            vec![3, 1, 0, 2, 7, 5, 4, 6],
        ];

        for table in tables {
            let scheme = generate(table.clone());
            assert!(scheme.realizes(&table), "table {:?}", table);
        }
    }

    #[test]
    fn swap_pairs_table() {
        let table = vec![1, 0, 3, 2, 5, 4, 7, 6];
        let scheme = generate(table.clone());

        assert!(scheme.realizes(&table));
        // the whole table is one full boolean edge
        assert_eq!(scheme.len(), 1);
    }

    #[test]
    fn odd_permutation_widens_circuit() {
        // swap 5 <-> 13 on 4 lines is odd: parity completion adds points
        // past the table, so the scheme spans 5 lines but must still
        // realize the original table on the low inputs
        let mut table: TruthTable = (0..16).collect();
        table[5] = 13;
        table[13] = 5;

        let scheme = generate(table.clone());

        assert!(!scheme.is_empty());
        for (x, &y) in table.iter().enumerate() {
            assert_eq!(scheme.apply(x as Word), y);
        }
    }
}
