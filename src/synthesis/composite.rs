//! Reed–Muller + group theory composition.

use std::io;

use super::{Error, GtGenerator, Result, RmGenerator};
use crate::{
    config::{Config, PushPolicy},
    math::{significant_bit_count, N},
    optimize::PostProcessor,
    scheme::{quantum_cost, Scheme},
    table::TruthTable,
};

pub struct CompositeGenerator {
    config: Config,
}

impl CompositeGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn generate(&self, table: &TruthTable, log: &mut dyn io::Write) -> Result<Scheme> {
        super::check_table_is_permutation(table)?;

        let size = table.len();
        if size == 0 {
            return Ok(Scheme::new());
        }

        if significant_bit_count(size - 1) >= crate::math::Word::BITS as N {
            return Err(Error::UnsupportedSize(size));
        }

        let n = significant_bit_count(size.saturating_sub(1));
        let _ = writeln!(log, "n = {}", n);

        let threshold = self.rm_weight_threshold(n);
        let _ = writeln!(log, "RM generator index weight threshold: {}", threshold);

        let mut rm_generator = RmGenerator::new(Some(threshold), self.config.push_policy);
        let rm_result = rm_generator.generate(table)?;

        let _ = writeln!(log, "RM scheme complexity: {}", rm_result.scheme.len());

        let gt_generator = GtGenerator::new(&self.config);
        let gt_left_scheme = gt_generator.generate(&rm_result.left_mult_table)?;
        let gt_right_scheme = gt_generator.generate(&rm_result.right_mult_table)?;

        let _ = writeln!(log, "GT left scheme complexity: {}", gt_left_scheme.len());
        let _ = writeln!(log, "GT right scheme complexity: {}", gt_right_scheme.len());

        // under the default push policy both residual tables hold every
        // correction, so only the shorter scheme joins the cascade
        let mut scheme = rm_result.scheme;

        if self.config.push_policy == PushPolicy::Default {
            if gt_left_scheme.len() < gt_right_scheme.len() {
                for gate in gt_left_scheme.iter().rev() {
                    scheme.push_front(*gate);
                }
            } else {
                scheme.extend(gt_right_scheme.iter().copied());
            }
        } else {
            for gate in gt_left_scheme.iter().rev() {
                scheme.push_front(*gate);
            }
            scheme.extend(gt_right_scheme.iter().copied());
        }

        let _ = writeln!(log, "Complexity before optimization: {}", scheme.len());
        let _ = writeln!(
            log,
            "Quantum cost before optimization: {}",
            quantum_cost(&scheme)
        );

        let scheme = PostProcessor::new(&self.config).optimize(&scheme)?;

        if !scheme.realizes(table) {
            return Err(Error::InternalCheck(
                "generated scheme does not realize the input table".to_string(),
            ));
        }

        let _ = writeln!(log, "Complexity after optimization: {}", scheme.len());
        let _ = writeln!(
            log,
            "Quantum cost after optimization: {}",
            quantum_cost(&scheme)
        );

        Ok(scheme)
    }

    /// Heavy rows go to the GT driver once their weight reaches
    /// min(n, ⌈log2(2 · pack_size)⌉), unless configured explicitly.
    fn rm_weight_threshold(&self, n: N) -> N {
        match self.config.rm_weight_threshold {
            Some(threshold) => threshold,
            None => {
                let vector_count = 2 * self.config.pack_size;
                let threshold = significant_bit_count(vector_count.saturating_sub(1));

                threshold.min(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Word;

    fn synthesize(table: TruthTable) -> Scheme {
        CompositeGenerator::new(&Config::default())
            .generate(&table, &mut io::sink())
            .unwrap()
    }

    #[test]
    fn empty_table() {
        let scheme = synthesize(vec![]);
        assert!(scheme.is_empty());
    }

    #[test]
    fn identity_table() {
        let scheme = synthesize((0..16).collect());
        assert!(scheme.is_empty());
    }

    #[test]
    fn not_gate() {
        let scheme = synthesize(vec![1, 0]);

        assert_eq!(scheme.len(), 1);

        let gate = scheme[0];
        assert_eq!(gate.target_mask(), 1);
        assert_eq!(gate.control_mask(), 0);
        assert_eq!(gate.inversion_mask(), 0);
    }

    #[test]
    fn cnot_gate() {
        // T[2] = 3: bit 0 toggles under control of bit 1
        let scheme = synthesize(vec![0, 1, 3, 2]);

        assert_eq!(scheme.len(), 1);

        let gate = scheme[0];
        assert_eq!(gate.target_mask(), 1);
        assert_eq!(gate.control_mask(), 2);
        assert_eq!(gate.inversion_mask(), 0);
    }

    #[test]
    fn toffoli_gate() {
        // T[6] = 7: bit 0 toggles under control of bits 1 and 2
        let scheme = synthesize(vec![0, 1, 2, 3, 4, 5, 7, 6]);

        assert_eq!(scheme.len(), 1);

        let gate = scheme[0];
        assert_eq!(gate.target_mask(), 1);
        assert_eq!(gate.control_mask(), 6);
        assert_eq!(gate.inversion_mask(), 0);
    }

    #[test]
    fn invalid_table_is_rejected() {
        let generator = CompositeGenerator::new(&Config::default());
        let result = generator.generate(&vec![0, 0, 1, 2], &mut io::sink());

        assert!(matches!(result, Err(Error::InvalidTable(_))));
    }

    #[test]
    fn random_looking_tables_verify() {
        let tables: Vec<TruthTable> = vec![
            vec![3, 1, 0, 2],
            vec![3, 1, 0, 2, 7, 5, 4, 6],
            vec![7, 0, 5, 2, 1, 6, 3, 4],
            vec![2, 9, 4, 11, 6, 13, 0, 15, 8, 1, 10, 3, 12, 5, 14, 7],
        ];

        for table in tables {
            let scheme = synthesize(table.clone());
            for (x, &y) in table.iter().enumerate() {
                assert_eq!(scheme.apply(x as Word), y, "table {:?}", table);
            }
        }
    }
}
