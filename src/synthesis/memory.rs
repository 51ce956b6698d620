//! Synthesis with ancillary output lines.
//!
//! For an arbitrary (not necessarily bijective) m-output table on n
//! inputs, every output coordinate is realized independently on its own
//! ancillary line: the on-set of the coordinate function is carved into
//! boolean edges, each becoming one gate targeting line n + coord.

use super::Result;
use crate::{
    config::Config,
    edge::EdgeSearcher,
    gate::Gate,
    math::{full_mask, significant_bit_count, N, Word},
    optimize::PostProcessor,
    scheme::Scheme,
    table::TruthTable,
};

pub struct GtGeneratorWithMemory {
    config: Config,
}

impl GtGeneratorWithMemory {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Synthesize the table on n + m lines, one coordinate at a time;
    /// every coordinate sub-scheme is optimized before concatenation.
    pub fn generate(&self, table: &TruthTable) -> Result<Scheme> {
        let (n, m) = detect_bit_count(table);

        let mut scheme = Scheme::new();

        for coord in 0..m {
            let mask = 1 << coord;

            let inputs: Vec<Word> = table
                .iter()
                .enumerate()
                .filter(|(_, &y)| y & mask != 0)
                .map(|(x, _)| x as Word)
                .collect();

            self.generate_coordinate_function(&mut scheme, n, m, coord, inputs)?;
        }

        Ok(scheme)
    }

    fn generate_coordinate_function(
        &self,
        scheme: &mut Scheme,
        n: N,
        m: N,
        coord: N,
        inputs: Vec<Word>,
    ) -> Result<()> {
        use std::collections::BTreeSet;

        let mut inputs: BTreeSet<Word> = inputs.into_iter().collect();
        let mut sub_scheme = Scheme::new();

        while !inputs.is_empty() {
            let mut searcher = EdgeSearcher::from_words(inputs.iter().copied(), n);
            searcher.set_explicit_edge(self.config.memory_explicit_edges);

            let edge = searcher.find_edge();

            if edge.is_valid() && edge.capacity() > 1 {
                // toggle covered words in or out of the residual on-set
                for x in EdgeSearcher::edge_set(&edge) {
                    if !inputs.remove(&x) {
                        inputs.insert(x);
                    }
                }

                let target_mask = 1 << (n + coord);
                let control_mask = edge.base_mask();
                let inversion_mask = edge.base_value() ^ control_mask;

                sub_scheme.push_back(Gate::new(n + m, target_mask, control_mask, inversion_mask));
            } else {
                // no usable edge: one full-control gate per input
                for &x in &inputs {
                    let target_mask = 1 << (n + coord);
                    let control_mask = full_mask(n);
                    let inversion_mask = x ^ control_mask;

                    sub_scheme.push_back(Gate::new(
                        n + m,
                        target_mask,
                        control_mask,
                        inversion_mask,
                    ));
                }

                break;
            }
        }

        let sub_scheme = PostProcessor::new(&self.config).optimize(&sub_scheme)?;
        scheme.extend(sub_scheme.iter().copied());

        Ok(())
    }

    /// True iff the scheme writes `table[x]` to the output lines for every
    /// input with cleared ancillae.
    pub fn check_scheme_validity(scheme: &Scheme, n: N, m: N, table: &TruthTable) -> bool {
        let output_mask = full_mask(m);

        table.iter().enumerate().all(|(x, &y)| {
            let image = scheme.apply(x as Word);
            (image >> n) & output_mask == y
        })
    }
}

/// Input width from the table length, output width from its largest value.
pub fn detect_bit_count(table: &TruthTable) -> (N, N) {
    let size = table.len().saturating_sub(1);
    let n = significant_bit_count(size);

    let max_output = table.iter().copied().max().unwrap_or(0);
    let m = significant_bit_count(max_output);

    (n, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(table: TruthTable) -> (Scheme, N, N) {
        let (n, m) = detect_bit_count(&table);
        let scheme = GtGeneratorWithMemory::new(&Config::default())
            .generate(&table)
            .unwrap();

        (scheme, n, m)
    }

    #[test]
    fn and_function() {
        // y = x0 & x1
        let table = vec![0, 0, 0, 1];
        let (scheme, n, m) = generate(table.clone());

        assert_eq!((n, m), (2, 1));
        assert!(GtGeneratorWithMemory::check_scheme_validity(
            &scheme, n, m, &table
        ));
    }

    #[test]
    fn xor_function() {
        // y = x0 ^ x1 has an on-set of two opposite words
        let table = vec![0, 1, 1, 0];
        let (scheme, n, m) = generate(table.clone());

        assert!(GtGeneratorWithMemory::check_scheme_validity(
            &scheme, n, m, &table
        ));
    }

    #[test]
    fn two_output_function() {
        // y0 = majority, y1 = parity on 3 inputs
        let table: TruthTable = (0..8)
            .map(|x: Word| {
                let bits = [x & 1, (x >> 1) & 1, (x >> 2) & 1];
                let majority = if bits.iter().sum::<Word>() >= 2 { 1 } else { 0 };
                let parity = bits.iter().sum::<Word>() & 1;

                majority | (parity << 1)
            })
            .collect();

        let (scheme, n, m) = generate(table.clone());

        assert_eq!((n, m), (3, 2));
        assert!(GtGeneratorWithMemory::check_scheme_validity(
            &scheme, n, m, &table
        ));
    }

    #[test]
    fn non_bijective_wide_table() {
        let table = vec![3, 3, 1, 0];
        let (scheme, n, m) = generate(table.clone());

        assert_eq!((n, m), (2, 2));
        assert!(GtGeneratorWithMemory::check_scheme_validity(
            &scheme, n, m, &table
        ));
    }
}
