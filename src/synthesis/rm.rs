//! Reed–Muller spectral driver.
//!
//! The driver keeps two synthesis states, one for the input table and one
//! for its inverse, and walks the spectrum rows in index order. Light rows
//! are realized by gates on whichever side yields the cheaper residual
//! spectrum; rows whose index weight reaches the threshold ("alien" rows)
//! are instead fixed by a single transposition pushed into one of the two
//! residual multiplier tables for the group theoretic driver to finish.

use super::{Error, Result};
use crate::{
    config::PushPolicy,
    gate::Gate,
    math::{count_bits, highest_bit_mask, significant_bit_count, N, Word},
    permutation::Transposition,
    scheme::Scheme,
    spectra::{self, RmSpectrum},
    table::TruthTable,
};

pub struct RmSynthesisResult {
    pub scheme: Scheme,
    pub left_mult_table: TruthTable,
    pub right_mult_table: TruthTable,
}

#[derive(Default)]
struct SynthesisState {
    table: TruthTable,
    spectrum: RmSpectrum,
    spectrum_cost: N,
    elements: Vec<Gate>,
}

pub struct RmGenerator {
    weight_threshold: N,
    push_policy: PushPolicy,

    direct: SynthesisState,
    inverse: SynthesisState,
}

impl RmGenerator {
    /// Rows with index weight at or above `threshold` are not processed
    /// spectrally; `None` disables the alien path entirely.
    pub fn new(threshold: Option<N>, push_policy: PushPolicy) -> Self {
        Self {
            weight_threshold: threshold.unwrap_or(N::MAX),
            push_policy,
            direct: SynthesisState::default(),
            inverse: SynthesisState::default(),
        }
    }

    pub fn push_policy(&self) -> PushPolicy {
        self.push_policy
    }

    pub fn generate(&mut self, input_table: &TruthTable) -> Result<RmSynthesisResult> {
        let size = input_table.len();
        let n = significant_bit_count(size.saturating_sub(1));

        let mut result = RmSynthesisResult {
            scheme: Scheme::new(),
            left_mult_table: (0..size as Word).collect(),
            right_mult_table: (0..size as Word).collect(),
        };

        self.direct.table = input_table.clone();
        self.direct.spectrum = spectra::calculate_spectrum(&self.direct.table);

        self.inverse.table = invert_table(&self.direct.table);
        self.inverse.spectrum = spectra::calculate_spectrum(&self.inverse.table);

        let mut insert_pos = 0;

        for index in 0..size {
            let row = self.direct.spectrum[index];
            if spectra::is_row_ident(row, index) {
                continue;
            }

            if count_bits(index) >= self.weight_threshold {
                let RmSynthesisResult {
                    ref scheme,
                    ref mut left_mult_table,
                    ref mut right_mult_table,
                } = result;

                self.process_alien_row(index, scheme, insert_pos, left_mult_table, right_mult_table)?;
                continue;
            }

            Self::calculate_partial_result(&mut self.direct, n, index)?;
            Self::calculate_partial_result(&mut self.inverse, n, index)?;

            insert_pos = self.implement_partial_result(&mut result.scheme, insert_pos);
        }

        Ok(result)
    }

    /// Fix a heavy row by one transposition, pushed to the residual
    /// multiplier table chosen by the policy.
    fn process_alien_row(
        &mut self,
        index: N,
        scheme: &Scheme,
        insert_pos: N,
        left_mult_table: &mut TruthTable,
        right_mult_table: &mut TruthTable,
    ) -> Result<()> {
        let x = index as Word;
        let y = self.direct.table[index];

        // z with T[z] == x; earlier rows are ident so z lies past index
        let z = self.direct.table[index + 1..]
            .iter()
            .position(|&value| value == x)
            .map(|offset| (index + 1 + offset) as Word)
            .ok_or_else(|| {
                Error::InternalCheck(format!("direct table is not bijective at row {}", index))
            })?;

        self.apply_push_policy(x, y, z, scheme, insert_pos, left_mult_table, right_mult_table);

        self.direct.table[index] = x;
        self.direct.table[z as usize] = y;
        self.direct.spectrum = spectra::calculate_spectrum(&self.direct.table);

        self.inverse.table[index] = x;
        self.inverse.table[y as usize] = z;
        self.inverse.spectrum = spectra::calculate_spectrum(&self.inverse.table);

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_push_policy(
        &mut self,
        x: Word,
        y: Word,
        z: Word,
        scheme: &Scheme,
        insert_pos: N,
        left_mult_table: &mut TruthTable,
        right_mult_table: &mut TruthTable,
    ) {
        // pushing left conjugates (x, z) through the gates left of the hole
        let conjugate_left = |value: Word| {
            scheme
                .iter()
                .take(insert_pos)
                .rev()
                .fold(value, |v, gate| gate.apply(v))
        };

        let left_transp = Transposition::new(conjugate_left(x), conjugate_left(z));

        // pushing right conjugates (x, y) through the gates right of it
        let conjugate_right = |value: Word| {
            scheme
                .iter()
                .skip(insert_pos)
                .fold(value, |v, gate| gate.apply(v))
        };

        let right_transp = Transposition::new(conjugate_right(x), conjugate_right(y));

        match self.push_policy {
            PushPolicy::ForceLeft => push_left(&left_transp, left_mult_table),
            PushPolicy::ForceRight => push_right(&right_transp, right_mult_table),
            PushPolicy::AutoHammingDistance => {
                if left_transp.dist() < right_transp.dist() {
                    push_left(&left_transp, left_mult_table);
                } else {
                    push_right(&right_transp, right_mult_table);
                }
            }
            PushPolicy::AutoRmCostReduction => {
                let cost = |table: &TruthTable| {
                    spectra::calculate_cost(&spectra::calculate_spectrum(table))
                };

                let left_before = cost(left_mult_table) as isize;
                let right_before = cost(right_mult_table) as isize;

                push_left(&left_transp, left_mult_table);
                push_right(&right_transp, right_mult_table);

                let left_after = cost(left_mult_table) as isize;
                let right_after = cost(right_mult_table) as isize;

                if left_after - left_before < right_after - right_before {
                    // keep left, undo right
                    push_right(&right_transp, right_mult_table);
                } else {
                    // keep right, undo left
                    push_left(&left_transp, left_mult_table);
                }
            }
            PushPolicy::Default => {
                push_left(&left_transp, left_mult_table);
                push_right(&right_transp, right_mult_table);
            }
        }
    }

    fn calculate_partial_result(state: &mut SynthesisState, n: N, index: N) -> Result<()> {
        state.elements.clear();

        if index == 0 {
            Self::process_first_row(state, n);
        } else if spectra::is_variable_row(index) {
            Self::process_variable_row(state, n, index);
        } else {
            Self::process_non_variable_row(state, n, index)?;
        }

        state.spectrum_cost = spectra::calculate_cost(&state.spectrum);
        Ok(())
    }

    fn process_first_row(state: &mut SynthesisState, n: N) {
        let row = state.spectrum[0];

        let mut mask: Word = 1;
        while mask <= row {
            if row & mask != 0 {
                state.elements.push(Gate::not(n, mask));
                apply_transformation(&mut state.table, mask, 0);
            }

            mask <<= 1;
        }

        state.spectrum[0] = 0;
    }

    fn process_variable_row(state: &mut SynthesisState, n: N, index: N) {
        let row = state.spectrum[index];
        let index_mask = index as Word;

        if row & index_mask == 0 {
            // no bit on the row's own line: borrow the highest set bit
            let mask = highest_bit_mask(row);
            debug_assert!(mask != 0 && mask != index_mask);

            state.elements.push(Gate::cnot(n, index_mask, mask));

            apply_transformation(&mut state.table, index_mask, mask);
            apply_transformation(&mut state.spectrum, index_mask, mask);
        }

        let mut mask: Word = 1;
        while mask <= row {
            if mask != index_mask && row & mask != 0 {
                state.elements.push(Gate::cnot(n, mask, index_mask));

                apply_transformation(&mut state.table, mask, index_mask);
                apply_transformation(&mut state.spectrum, mask, index_mask);
            }

            mask <<= 1;
        }
    }

    fn process_non_variable_row(state: &mut SynthesisState, n: N, index: N) -> Result<()> {
        let row = state.spectrum[index];
        let index_mask = index as Word;

        // control bit: highest bit set in the row but not in the index
        let mut control_mask = 1 << (n - 1);
        while control_mask != 0 {
            if row & control_mask != 0 && index_mask & control_mask == 0 {
                break;
            }

            control_mask >>= 1;
        }

        if control_mask == 0 {
            return Err(Error::InternalCheck(format!(
                "failed to process non-variable spectrum row {}",
                index
            )));
        }

        let mut corrections = Vec::new();

        let has_other_bits = row & !control_mask != 0;
        if has_other_bits {
            let mut mask: Word = 1;
            while mask <= row {
                if mask != control_mask && row & mask != 0 {
                    let element = Gate::cnot(n, mask, control_mask);
                    corrections.push(element);

                    state.elements.push(element);
                    apply_transformation(&mut state.table, mask, control_mask);
                }

                mask <<= 1;
            }
        }

        // core element
        state.elements.push(Gate::cnot(n, control_mask, index_mask));
        apply_transformation(&mut state.table, control_mask, index_mask);

        if has_other_bits && control_mask < index_mask {
            // re-apply corrections to keep earlier rows canonical
            for element in corrections {
                state.elements.push(element);
                apply_transformation(
                    &mut state.table,
                    element.target_mask(),
                    element.control_mask(),
                );
            }
        }

        // the core element makes recomputing the spectrum cheaper than
        // patching it
        state.spectrum = spectra::calculate_spectrum(&state.table);
        Ok(())
    }

    fn is_inverse_better(&self) -> bool {
        if self.inverse.spectrum_cost != self.direct.spectrum_cost {
            return self.inverse.spectrum_cost < self.direct.spectrum_cost;
        }

        // same row of both spectra means an equal core element; only the
        // CNOT counts can differ
        self.inverse.elements.len() < self.direct.elements.len()
    }

    fn implement_partial_result(&mut self, scheme: &mut Scheme, insert_pos: N) -> N {
        let mut insert_pos = insert_pos;

        if self.is_inverse_better() {
            for &element in self.inverse.elements.iter().rev() {
                scheme.insert(insert_pos, element);
            }
            insert_pos += self.inverse.elements.len();

            self.direct.table = invert_table(&self.inverse.table);
            self.direct.spectrum = spectra::calculate_spectrum(&self.direct.table);
        } else {
            for &element in self.direct.elements.iter() {
                scheme.insert(insert_pos, element);
            }

            self.inverse.table = invert_table(&self.direct.table);
            self.inverse.spectrum = spectra::calculate_spectrum(&self.inverse.table);
        }

        insert_pos
    }
}

/// Exchange the two table *values* equal to the endpoints: L' = t ∘ L.
fn push_left(transp: &Transposition, table: &mut TruthTable) {
    let x = transp.x();
    let y = transp.y();

    let x_index = table.iter().position(|&value| value == x);
    let y_index = table.iter().position(|&value| value == y);

    if let (Some(x_index), Some(y_index)) = (x_index, y_index) {
        table.swap(x_index, y_index);
    } else {
        debug_assert!(false, "transposition endpoints missing from left table");
    }
}

/// Exchange the table *entries* at the endpoints: R' = R ∘ t.
fn push_right(transp: &Transposition, table: &mut TruthTable) {
    table.swap(transp.x() as usize, transp.y() as usize);
}

fn invert_table(table: &TruthTable) -> TruthTable {
    let mut inverse = vec![0; table.len()];
    for (index, &value) in table.iter().enumerate() {
        inverse[value as usize] = index as Word;
    }

    inverse
}

/// Toggle `target_mask` in every table value matching `control_mask`.
fn apply_transformation(table: &mut [Word], target_mask: Word, control_mask: Word) {
    debug_assert!(count_bits(target_mask) == 1 && control_mask & target_mask == 0);

    for value in table.iter_mut() {
        if *value & control_mask == control_mask {
            *value ^= target_mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run(table: TruthTable, threshold: Option<N>) -> RmSynthesisResult {
        let config = Config::default();
        let mut generator = RmGenerator::new(threshold, config.push_policy);
        generator.generate(&table).unwrap()
    }

    fn is_identity(table: &TruthTable) -> bool {
        table.iter().enumerate().all(|(x, &y)| y == x as Word)
    }

    #[test]
    fn identity_gives_empty_scheme() {
        let result = run((0..8).collect(), None);

        assert!(result.scheme.is_empty());
        assert!(is_identity(&result.left_mult_table));
        assert!(is_identity(&result.right_mult_table));
    }

    #[test]
    fn cnot_is_one_gate() {
        let result = run(vec![0, 1, 3, 2], None);

        assert_eq!(result.scheme.len(), 1);
        assert!(result.scheme.realizes(&vec![0, 1, 3, 2]));
        assert!(is_identity(&result.left_mult_table));
        assert!(is_identity(&result.right_mult_table));
    }

    #[test]
    fn toffoli_without_threshold() {
        let table = vec![0, 1, 2, 3, 4, 5, 7, 6];
        let result = run(table.clone(), None);

        assert!(result.scheme.realizes(&table));
        assert!(is_identity(&result.left_mult_table));
        assert!(is_identity(&result.right_mult_table));
    }

    #[test]
    fn full_synthesis_without_alien_rows() {
        let table: TruthTable = vec![3, 1, 0, 2, 7, 5, 4, 6];
        let result = run(table.clone(), None);

        assert!(result.scheme.realizes(&table));
        assert!(is_identity(&result.left_mult_table));
        assert!(is_identity(&result.right_mult_table));
    }

    #[test]
    fn alien_rows_go_to_residual_tables() {
        let table: TruthTable = vec![3, 1, 0, 2, 7, 5, 4, 6];
        let result = run(table.clone(), Some(2));

        // under the default policy every alien transposition lands in both
        // residual tables, so each side alone restores the function
        let size = table.len() as Word;
        for x in 0..size {
            let through_left = result.scheme.apply(result.left_mult_table[x as usize]);
            assert_eq!(through_left, table[x as usize]);

            let through_right = result.right_mult_table[result.scheme.apply(x) as usize];
            assert_eq!(through_right, table[x as usize]);
        }
    }
}
