//! Partial-result selection for the group theoretic driver.
//!
//! One step of GT synthesis picks a batch of transpositions the driver
//! knows how to realize cheaply — a boolean edge, a pack of independent
//! transpositions, a pair sharing a difference, or any two pairs — and
//! emits the gates for it. The residual permutation (the product with the
//! batch) goes back to the driver for the next step.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{Error, Result};
use crate::{
    config::Config,
    edge::{BooleanEdge, EdgeSearcher},
    gate::Gate,
    math::{bits_iter::BitsIter, count_bits, full_mask, lowest_bit_pos, N, Word},
    permutation::{Permutation, Transposition},
    scheme::conjugate,
};

/// What one synthesis step realizes.
#[derive(Clone, Debug, PartialEq)]
pub enum PartialResultKind {
    /// Any two transpositions taken from the leading cycles.
    CommonPair {
        left_diff: Word,
        right_diff: Word,
        distance: Word,
    },
    /// Two transpositions sharing a difference.
    SameDiffPair { diff: Word },
    /// Independent transpositions, power-of-two many.
    Pack { size: N },
    /// Exact boolean edge of capacity ≥ 4.
    Edge { capacity: Word },
    /// Boolean edge covering the whole cube.
    FullEdge { capacity: Word },
}

impl PartialResultKind {
    fn rank(&self) -> N {
        match self {
            PartialResultKind::CommonPair { .. } => 1,
            PartialResultKind::SameDiffPair { .. } => 2,
            PartialResultKind::Pack { .. } => 3,
            PartialResultKind::Edge { .. } => 4,
            PartialResultKind::FullEdge { .. } => 5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PartialResult {
    pub kind: PartialResultKind,
    pub transpositions: Vec<Transposition>,
    pub edge: Option<BooleanEdge>,
    pub distances_sum: N,
}

impl PartialResult {
    /// Ranking between candidate results; used to choose between the
    /// left- and right-multiplied residuals.
    pub fn is_better_than(&self, another: &PartialResult) -> bool {
        use PartialResultKind::*;

        if self.kind.rank() != another.kind.rank() {
            return self.kind.rank() > another.kind.rank();
        }

        match (&self.kind, &another.kind) {
            (FullEdge { capacity: left }, FullEdge { capacity: right })
            | (Edge { capacity: left }, Edge { capacity: right }) => {
                if left == right {
                    self.distances_sum <= another.distances_sum
                } else {
                    left > right
                }
            }
            (SameDiffPair { diff: left }, SameDiffPair { diff: right }) => {
                let left_weight = count_bits(*left);
                let right_weight = count_bits(*right);

                if left_weight == right_weight {
                    self.distances_sum <= another.distances_sum
                } else {
                    left_weight < right_weight
                }
            }
            (Pack { size: left }, Pack { size: right }) => left >= right,
            (
                CommonPair {
                    left_diff,
                    right_diff,
                    distance,
                },
                CommonPair {
                    left_diff: another_left,
                    right_diff: another_right,
                    distance: another_distance,
                },
            ) => {
                let left_sum = count_bits(*left_diff) + count_bits(*right_diff) + count_bits(*distance);
                let right_sum = count_bits(*another_left)
                    + count_bits(*another_right)
                    + count_bits(*another_distance);

                if left_sum == right_sum {
                    self.distances_sum <= another.distances_sum
                } else {
                    left_sum < right_sum
                }
            }
            _ => unreachable!("mismatched partial result kinds of equal rank"),
        }
    }

    fn edge_covered_count(&self) -> Word {
        self.edge.map(|edge| edge.covered_count()).unwrap_or(0)
    }
}

/// Selects and synthesizes one partial result from a permutation.
pub struct PartialGtGenerator {
    permutation: Permutation,
    n: N,

    max_pack_size: N,
    pack_reverse_order: bool,
    compare_results_on_edge_search: bool,
    explicit_edges: bool,

    partial_result: Option<PartialResult>,
}

impl PartialGtGenerator {
    pub fn new(config: &Config) -> Self {
        // pack synthesis needs a power-of-two vector count
        let mut max_pack_size = 1;
        while max_pack_size * 2 <= config.pack_size {
            max_pack_size *= 2;
        }

        Self {
            permutation: Permutation::new(),
            n: 0,
            max_pack_size,
            pack_reverse_order: config.pack_reverse_order,
            compare_results_on_edge_search: config.compare_results_on_edge_search,
            explicit_edges: config.gt_explicit_edges,
            partial_result: None,
        }
    }

    pub fn set_permutation(&mut self, permutation: Permutation, input_count: N) {
        self.permutation = permutation;
        self.n = input_count;
    }

    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    pub fn partial_result(&self) -> Option<&PartialResult> {
        self.partial_result.as_ref()
    }

    /// Left and right multiplication produce different residuals once some
    /// cycle is longer than a transposition and the support is nontrivial.
    pub fn left_and_right_multiplication_differs(&self) -> bool {
        let has_long_cycle = self.permutation.iter().any(|cycle| cycle.len() > 2);
        has_long_cycle && self.permutation.element_count() > 3
    }

    /// Residual permutation after applying the chosen batch on the given
    /// side.
    pub fn residual_permutation(&self, left_multiplication: bool) -> Permutation {
        let transpositions = self
            .partial_result
            .as_ref()
            .map(|result| result.transpositions.as_slice())
            .unwrap_or(&[]);

        self.permutation
            .multiply_by_transpositions(transpositions, left_multiplication)
    }

    /// Select the best partial result for the current permutation.
    pub fn prepare_for_generation(&mut self) {
        let mut frequency_map: HashMap<Word, N> = HashMap::new();
        for cycle in &self.permutation {
            cycle.prepare_for_disjoint(&mut frequency_map);
        }

        let keys = sorted_diff_keys(&frequency_map);

        let mut best: Option<PartialResult> = None;

        for &diff in &keys {
            let mut transpositions = Vec::new();
            for cycle in &self.permutation {
                cycle.disjoint_by_diff(diff, &mut transpositions);
            }

            if transpositions.len() < 2 {
                continue;
            }

            let result = self.get_partial_result(transpositions, diff, &best);

            if let Some(result) = result {
                let accept = match &best {
                    None => true,
                    Some(best) => {
                        (self.compare_results_on_edge_search && !best.is_better_than(&result))
                            || result.edge_covered_count() > best.edge_covered_count()
                    }
                };

                if accept {
                    best = Some(result);
                }
            }
        }

        let best_is_edge = matches!(
            best.as_ref().map(|b| &b.kind),
            Some(PartialResultKind::Edge { .. }) | Some(PartialResultKind::FullEdge { .. })
        );

        if !best_is_edge {
            let pack = self.transpositions_pack(&keys);
            if !pack.is_empty() {
                best = Some(PartialResult {
                    kind: PartialResultKind::Pack { size: pack.len() },
                    transpositions: pack,
                    edge: None,
                    distances_sum: 0,
                });
            }
        }

        let best = best.unwrap_or_else(|| {
            let transpositions = self.common_pair();
            debug_assert!(transpositions.len() == 2);

            let first = &transpositions[0];
            let second = &transpositions[1];

            let left_diff = first.diff();
            let right_diff = second.diff();
            let distance = (first.x() & !left_diff) ^ (second.x() & !right_diff);

            PartialResult {
                kind: PartialResultKind::CommonPair {
                    left_diff,
                    right_diff,
                    distance,
                },
                transpositions,
                edge: None,
                distances_sum: 0,
            }
        });

        self.partial_result = Some(PartialResult {
            distances_sum: self.permutation.distances_sum(),
            ..best
        });
    }

    fn get_partial_result(
        &self,
        transpositions: Vec<Transposition>,
        diff: Word,
        best: &Option<PartialResult>,
    ) -> Option<PartialResult> {
        let mut searcher = EdgeSearcher::from_transpositions(&transpositions, self.n, diff);
        searcher.set_explicit_edge(self.explicit_edges);

        let edge = searcher.find_edge();

        let best_edge_capacity = match best.as_ref().map(|b| &b.kind) {
            Some(PartialResultKind::Edge { capacity })
            | Some(PartialResultKind::FullEdge { capacity }) => *capacity,
            _ => 0,
        };

        if edge.is_valid() && edge.capacity() > 2 {
            if edge.capacity() < best_edge_capacity {
                return None;
            }

            // the subset covers the whole edge; pairs the original set
            // missed become fresh work in the residual
            let subset = searcher.edge_subset(&edge);

            let mut subset_searcher = EdgeSearcher::from_transpositions(&subset, self.n, diff);
            let subset_edge = subset_searcher.find_edge();

            let kind = if edge.is_full() {
                PartialResultKind::FullEdge {
                    capacity: subset_edge.capacity(),
                }
            } else {
                PartialResultKind::Edge {
                    capacity: subset_edge.capacity(),
                }
            };

            Some(PartialResult {
                kind,
                transpositions: subset,
                edge: Some(subset_edge),
                distances_sum: 0,
            })
        } else if best.is_none() {
            Some(PartialResult {
                kind: PartialResultKind::SameDiffPair { diff },
                transpositions: find_best_candidates(transpositions),
                edge: None,
                distances_sum: 0,
            })
        } else {
            None
        }
    }

    /// Collect up to the pack cap of independent transpositions, walking
    /// difference keys in sorted order and keeping the batch disjoint.
    fn transpositions_pack(&self, keys: &[Word]) -> Vec<Transposition> {
        let mut visited: HashSet<Word> = HashSet::new();
        let mut result: Vec<Transposition> = Vec::new();

        let mut perm_copy = self.permutation.clone();

        for &diff in keys {
            let mut temp = Vec::new();
            for cycle in &perm_copy {
                cycle.disjoint_by_diff(diff, &mut temp);
            }

            temp.retain(|t| !visited.contains(&t.x()) && !visited.contains(&t.y()));
            if temp.is_empty() {
                break;
            }

            // multiplication side is irrelevant for independent batches
            perm_copy = perm_copy.multiply_by_transpositions(&temp, true);

            for &t in &temp {
                if self.pack_reverse_order {
                    result.insert(0, t);
                } else {
                    result.push(t);
                }

                visited.insert(t.x());
                visited.insert(t.y());
            }

            if result.len() >= self.max_pack_size {
                break;
            }
        }

        if result.len() > self.max_pack_size {
            result.truncate(self.max_pack_size);
        } else {
            self.grow_transpositions_pack(&mut result, &mut perm_copy, &mut visited);

            // round the batch down to a power of two
            let mut max_size = self.max_pack_size;
            while max_size > result.len() {
                max_size >>= 1;
            }

            result.truncate(max_size);
        }

        result
    }

    /// Top the pack up with leading pairs of the residual cycles.
    fn grow_transpositions_pack(
        &self,
        result: &mut Vec<Transposition>,
        perm_copy: &mut Permutation,
        visited: &mut HashSet<Word>,
    ) {
        let max_size = self.max_pack_size - result.len();
        if max_size == 0 {
            return;
        }

        let mut temp = Vec::new();

        for cycle in perm_copy.iter() {
            let mut buffer = [0 as Word; 2];
            let mut pos = 0;

            for &element in cycle.elements() {
                if !visited.contains(&element) {
                    buffer[pos] = element;
                    pos += 1;
                    visited.insert(element);
                }

                if pos == 2 {
                    break;
                }
            }

            if pos == 2 {
                temp.push(Transposition::new(buffer[0], buffer[1]));
            }
        }

        if temp.is_empty() {
            return;
        }

        temp.truncate(max_size);

        if self.pack_reverse_order {
            for &t in temp.iter() {
                result.insert(0, t);
            }
        } else {
            result.extend(temp.iter().copied());
        }

        if result.len() < self.max_pack_size {
            *perm_copy = perm_copy.multiply_by_transpositions(&temp, true);
            self.grow_transpositions_pack(result, perm_copy, visited);
        }
    }

    /// Fallback: two transpositions from the leading cycles, or a probe
    /// pair next to a 3-cycle.
    fn common_pair(&self) -> Vec<Transposition> {
        let mut transpositions = Vec::with_capacity(2);

        if self.permutation.len() > 1 {
            let first = self.permutation.cycle(0);
            let second = self.permutation.cycle(1);

            transpositions.push(Transposition::new(first[0], first[1]));
            transpositions.push(Transposition::new(second[0], second[1]));
        } else {
            let cycle = self.permutation.cycle(0);

            if cycle.len() >= 4 {
                transpositions.push(Transposition::new(cycle[0], cycle[1]));
                transpositions.push(Transposition::new(cycle[2], cycle[3]));
            } else {
                let x = cycle[0];
                let y = cycle[1];

                transpositions.push(Transposition::new(x, y));

                let mut mask: Word = 1;
                loop {
                    let a = x ^ mask;
                    let b = y ^ mask;

                    if !cycle.contains(a) && !cycle.contains(b) {
                        transpositions.push(Transposition::new(a, b));
                        break;
                    }

                    mask <<= 1;
                }
            }
        }

        transpositions
    }

    /// Emit the gates realizing the chosen partial result.
    pub fn implement_partial_result(&self) -> Result<VecDeque<Gate>> {
        let result = self
            .partial_result
            .as_ref()
            .ok_or_else(|| Error::Precondition("partial result was not prepared".to_string()))?;

        debug_assert!(!result.transpositions.is_empty());

        match &result.kind {
            PartialResultKind::FullEdge { .. } | PartialResultKind::Edge { .. } => {
                Ok(self.implement_edge(result))
            }
            PartialResultKind::Pack { .. } => {
                self.implement_independent_transpositions(&result.transpositions)
            }
            PartialResultKind::SameDiffPair { .. } | PartialResultKind::CommonPair { .. } => {
                Ok(self.implement_pair(&result.transpositions))
            }
        }
    }

    /// One gate per bit of the shared difference, controlled by the edge
    /// base with the complementary inversion.
    fn implement_edge(&self, result: &PartialResult) -> VecDeque<Gate> {
        let diff = result.transpositions[0].diff();
        let edge = result.edge.as_ref().unwrap_or_else(|| unreachable!());

        let base_value = edge.base_value();
        let base_mask = edge.base_mask();

        BitsIter::from(diff)
            .map(|mask| Gate::new(self.n, mask, base_mask, !base_value & base_mask))
            .collect()
    }

    fn implement_pair(&self, transpositions: &[Transposition]) -> VecDeque<Gate> {
        debug_assert_eq!(transpositions.len(), 2);

        let mut elements = self.implement_single_transposition(&transpositions[0]);
        elements.extend(self.implement_single_transposition(&transpositions[1]));

        elements
    }

    /// One maximum-inversion gate on the target bit of the difference,
    /// conjugated by CNOTs matching the remaining difference bits.
    fn implement_single_transposition(&self, transp: &Transposition) -> VecDeque<Gate> {
        let x = transp.x();
        let y = transp.y();
        let full = full_mask(self.n);

        let mut diff = x ^ y;
        let pos = lowest_bit_pos(diff).unwrap_or_else(|| unreachable!());

        let target_mask: Word = 1 << pos;
        diff ^= target_mask;

        // base is the endpoint with 0 on the target line
        let base = if x & target_mask != 0 { y } else { x };
        let inversion_mask = !(base ^ target_mask) & full;

        let core = Gate::new(self.n, target_mask, full ^ target_mask, inversion_mask);
        let mut elements = VecDeque::from(vec![core]);

        if diff != 0 {
            let conjugations: VecDeque<Gate> = BitsIter::from(diff)
                .map(|mask| Gate::cnot(self.n, mask, target_mask))
                .collect();

            elements = conjugate(elements, &conjugations, true);
        }

        elements
    }

    /// Realize 2k independent swaps as one k-CNOT conjugated by the CNOTs
    /// that bring the swap matrix to canonical form.
    fn implement_independent_transpositions(
        &self,
        transpositions: &[Transposition],
    ) -> Result<VecDeque<Gate>> {
        let k = transpositions.len() * 2;
        debug_assert!(count_bits(k) == 1, "vector count should be a power of two");

        let base_vector_count = k.trailing_zeros() as N;

        let mut matrix: Vec<Word> = Vec::with_capacity(k);
        for t in transpositions {
            matrix.push(t.x());
            matrix.push(t.y());
        }

        let transposed = transpose_matrix(&matrix, self.n);

        let mut elements = VecDeque::new();
        let mut inversion_mask: Word = 0;

        let mut mix = MatrixMix::default();
        elements.extend(self.remove_columns_copies(
            &transposed,
            k,
            &mut mix,
            &mut inversion_mask,
        ));

        let matrix_width = mix.columns.len();
        let mut mix = reorder_matrix_columns(&mix, k);

        elements.extend(self.transform_matrix_to_canonical_form(
            &mut mix,
            matrix_width,
            &mut inversion_mask,
        )?);

        // conjugate the core element by everything emitted so far
        let mut control_mask = full_mask(self.n);
        for index in 0..base_vector_count {
            control_mask ^= 1 << mix.column_index_map[&index];
        }

        let core = Gate::new(self.n, 1 << mix.column_index_map[&0], control_mask, inversion_mask);

        Ok(conjugate(VecDeque::from(vec![core]), &elements, false))
    }

    /// Drop duplicate, complementary and constant columns, expressing
    /// them through the kept ones with CNOT fan-outs.
    fn remove_columns_copies(
        &self,
        transposed: &[Word],
        k: N,
        output: &mut MatrixMix,
        inversion_mask: &mut Word,
    ) -> VecDeque<Gate> {
        let column_count = transposed.len();

        let mut column_to_indices: HashMap<Word, Vec<N>> = HashMap::new();
        for (index, &column) in transposed.iter().enumerate() {
            column_to_indices.entry(column).or_default().push(index);
        }

        let mut elements = VecDeque::new();
        let mut visited: HashSet<Word> = HashSet::new();

        let mask = full_mask(k);

        // walk columns in first-occurrence order for determinism
        for index in 0..column_count {
            let column = transposed[index];
            if visited.contains(&column) {
                continue;
            }

            if column == mask {
                // constant-one line: stays a positive control
                visited.insert(column);
                continue;
            }

            let indices = &column_to_indices[&column];

            if column == 0 {
                // constant-zero line: negative control
                for &i in indices {
                    *inversion_mask |= 1 << i;
                }

                visited.insert(column);
                continue;
            }

            let complementary = !column & mask;
            if let Some(complementary_indices) = column_to_indices.get(&complementary) {
                visited.insert(complementary);

                for &i in &indices[1..] {
                    elements.push_back(Gate::cnot(self.n, 1 << i, 1 << complementary_indices[0]));
                }

                for &i in complementary_indices {
                    elements.push_back(Gate::cnot(self.n, 1 << i, 1 << indices[0]));
                }
            } else {
                for &i in &indices[1..] {
                    elements.push_back(Gate::cnot(self.n, 1 << i, 1 << indices[0]));
                    *inversion_mask |= 1 << i;
                }
            }

            output.columns.push(column);
            output
                .column_index_map
                .insert(output.columns.len() - 1, indices[0]);

            visited.insert(column);
        }

        elements
    }

    /// Row-by-row CNOT elimination bringing row i of the mixed matrix to
    /// the value i.
    fn transform_matrix_to_canonical_form(
        &self,
        mix: &mut MatrixMix,
        matrix_width: N,
        inversion_mask: &mut Word,
    ) -> Result<VecDeque<Gate>> {
        let mut elements = VecDeque::new();
        let mut matrix_width = matrix_width;

        let k = mix.matrix.len();
        debug_assert!(count_bits(k) == 1);

        let base_vector_count = k.trailing_zeros() as N;
        if base_vector_count > matrix_width {
            return Err(Error::InternalCheck(
                "independent transpositions span too few columns".to_string(),
            ));
        }

        if base_vector_count == matrix_width {
            // no scratch column; claim an inversion line or a free line
            let first_inversion_pos = match lowest_bit_pos(*inversion_mask) {
                Some(pos) => {
                    *inversion_mask ^= 1 << pos;
                    pos
                }
                None => {
                    let used: HashSet<N> = mix.column_index_map.values().copied().collect();
                    let pos = (0..self.n).find(|index| !used.contains(index)).ok_or_else(|| {
                        Error::InternalCheck(
                            "no scratch line available for pack synthesis".to_string(),
                        )
                    })?;

                    elements.push_back(Gate::not(self.n, 1 << pos));
                    pos
                }
            };

            mix.column_index_map.insert(matrix_width, first_inversion_pos);
            matrix_width += 1;
        }

        let base_mask = full_mask(base_vector_count);

        let mut index = 0;
        while index < k {
            let (x_index, y_index) = find_best_row_in_matrix(&mix.matrix, index as Word, base_mask)?;
            debug_assert_eq!(x_index, y_index ^ 1);

            elements.extend(self.transform_row_to_canonical_form(
                mix,
                x_index,
                base_vector_count,
                index as Word,
            ));

            elements.extend(self.transform_row_to_canonical_form(
                mix,
                y_index,
                base_vector_count,
                (index + 1) as Word,
            ));

            index += 2;
        }

        for column in base_vector_count..matrix_width {
            let real_index = mix.column_index_map[&column];
            *inversion_mask |= 1 << real_index;
        }

        Ok(elements)
    }

    fn transform_row_to_canonical_form(
        &self,
        mix: &mut MatrixMix,
        row_index: N,
        base_vector_count: N,
        canonical_form: Word,
    ) -> VecDeque<Gate> {
        let base_mask = full_mask(base_vector_count);

        let row = mix.matrix[row_index];
        let base_diff = (canonical_form ^ row) & base_mask;
        let outer_diff = row & !base_mask;

        if base_diff == 0 && outer_diff == 0 {
            return VecDeque::new();
        }

        let mut elements = VecDeque::new();

        // a non-zero element outside the basis columns serves as the pivot
        let first_non_zero_pos = match lowest_bit_pos(outer_diff) {
            Some(pos) => pos,
            None => {
                // make one from the first non-basis column
                let pos = base_vector_count;

                let target_mask = 1 << pos;
                let control_mask = row & base_mask;

                elements.push_back(Gate::cnot(
                    self.n,
                    mix.real_mask(target_mask),
                    mix.real_mask(control_mask),
                ));
                mix.apply_modification(control_mask, target_mask);

                pos
            }
        };

        // align every differing bit through the pivot
        let mut diff = base_diff ^ outer_diff;
        if diff & (1 << first_non_zero_pos) != 0 {
            diff ^= 1 << first_non_zero_pos;
        }

        for mask in BitsIter::from(diff) {
            let control_mask = 1 << first_non_zero_pos;

            elements.push_back(Gate::cnot(
                self.n,
                mix.real_mask(mask),
                mix.real_mask(control_mask),
            ));
            mix.apply_modification(control_mask, mask);
        }

        // clear the pivot, leaving the canonical form
        {
            let target_mask = 1 << first_non_zero_pos;
            let control_mask = canonical_form;

            elements.push_back(Gate::cnot(
                self.n,
                mix.real_mask(target_mask),
                mix.real_mask(control_mask),
            ));
            mix.apply_modification(control_mask, target_mask);
        }

        debug_assert_eq!(mix.matrix[row_index], canonical_form);
        elements
    }
}

#[derive(Default)]
struct MatrixMix {
    /// Rows in the reduced coordinate system.
    matrix: Vec<Word>,
    /// Kept column values.
    columns: Vec<Word>,
    /// Reduced column index → original line index.
    column_index_map: HashMap<N, N>,
}

impl MatrixMix {
    /// Translate a mask over reduced columns into a mask over real lines.
    fn real_mask(&self, input_mask: Word) -> Word {
        let mut real_mask = 0;

        let mut mask: Word = 1;
        let mut index = 0;
        while mask <= input_mask {
            if input_mask & mask != 0 {
                real_mask |= 1 << self.column_index_map[&index];
            }

            mask <<= 1;
            index += 1;
        }

        real_mask
    }

    fn apply_modification(&mut self, control_mask: Word, target_mask: Word) {
        debug_assert_eq!(count_bits(target_mask), 1);

        for row in self.matrix.iter_mut() {
            if *row & control_mask == control_mask {
                *row ^= target_mask;
            }
        }
    }
}

fn transpose_matrix(matrix: &[Word], m: N) -> Vec<Word> {
    let mut transposed = Vec::with_capacity(m);

    let mut mask: Word = 1;
    for _ in 0..m {
        let mut column: Word = 0;
        let mut pos: Word = 1;

        for &row in matrix {
            if row & mask != 0 {
                column |= pos;
            }

            pos <<= 1;
        }

        transposed.push(column);
        mask <<= 1;
    }

    transposed
}

/// Columns with weight closest to k/2 first; ties keep their order.
fn reorder_matrix_columns(mix: &MatrixMix, k: N) -> MatrixMix {
    let m = mix.columns.len();

    let mut keys: Vec<(N, N)> = mix
        .columns
        .iter()
        .enumerate()
        .map(|(index, &column)| {
            let weight = count_bits(column);
            let dist = (k / 2).max(weight) - (k / 2).min(weight);
            (index, dist)
        })
        .collect();

    keys.sort_by_key(|&(_, dist)| dist);

    let mut output = MatrixMix::default();
    output.columns.reserve(m);

    for (new_index, &(old_index, _)) in keys.iter().enumerate() {
        output.columns.push(mix.columns[old_index]);
        output
            .column_index_map
            .insert(new_index, mix.column_index_map[&old_index]);
    }

    output.matrix = transpose_matrix(&output.columns, k);
    output
}

/// Pick the matrix row pair closest to its canonical pattern.
fn find_best_row_in_matrix(matrix: &[Word], pattern: Word, mask: Word) -> Result<(N, N)> {
    let row_count = matrix.len();
    debug_assert_eq!(row_count & 1, 0);

    let mut best: Option<(N, N)> = None;
    let mut min_dist = N::MAX;
    let mut x_best = Word::MAX;

    let mut index = 0;
    while index < row_count {
        let mut x_ind = index;
        let mut y_ind = index + 1;

        index += 2;

        if matrix[x_ind] < pattern {
            // rows already in canonical form
            continue;
        }

        let mut x = (matrix[x_ind] ^ pattern) & mask;
        let mut y = (matrix[y_ind] ^ pattern) & mask;

        let x_weight = count_bits(x);
        let y_weight = count_bits(y);

        let dist = x_weight + y_weight;
        if dist > min_dist {
            continue;
        }

        if y_weight < x_weight || (x & 1 == 1 && y & 1 == 0) {
            std::mem::swap(&mut x, &mut y);
            std::mem::swap(&mut x_ind, &mut y_ind);
        }

        if dist < min_dist || x_best > x {
            min_dist = dist;
            x_best = x;
            best = Some((x_ind, y_ind));
        }
    }

    best.ok_or_else(|| Error::InternalCheck("no matrix row pair left to canonicalize".to_string()))
}

/// Difference keys ordered by descending frequency, then ascending weight,
/// then ascending value.
fn sorted_diff_keys(frequency_map: &HashMap<Word, N>) -> Vec<Word> {
    let mut keys: Vec<Word> = frequency_map.keys().copied().collect();

    keys.sort_by(|&left, &right| {
        frequency_map[&right]
            .cmp(&frequency_map[&left])
            .then(count_bits(left).cmp(&count_bits(right)))
            .then(left.cmp(&right))
    });

    keys
}

/// Pick the two candidates whose endpoints are closest in Hamming
/// distance, preferring the light ones.
fn find_best_candidates(mut candidates: Vec<Transposition>) -> Vec<Transposition> {
    sort_candidates(&mut candidates);

    debug_assert!(candidates.len() > 1);

    let (first_partner, first_dist) = find_best_candidate_partner(&candidates, &candidates[0]);
    let (second_partner, second_dist) = find_best_candidate_partner(&candidates, &candidates[1]);

    if first_dist <= second_dist {
        vec![candidates[0], first_partner]
    } else {
        vec![candidates[1], second_partner]
    }
}

fn sort_candidates(candidates: &mut [Transposition]) {
    candidates.sort_by_key(|t| count_bits(t.x().min(t.y())));
}

fn find_best_candidate_partner(
    candidates: &[Transposition],
    target: &Transposition,
) -> (Transposition, N) {
    let mut second: Option<Transposition> = None;
    let mut min_dist = N::MAX;

    for candidate in candidates {
        if candidate == target {
            continue;
        }

        let dist = [
            target.x() ^ candidate.x(),
            target.x() ^ candidate.y(),
            target.y() ^ candidate.x(),
            target.y() ^ candidate.y(),
        ]
        .iter()
        .map(|&d| count_bits(d))
        .min()
        .unwrap_or(N::MAX);

        if dist < min_dist {
            min_dist = dist;
            second = Some(*candidate);
        }
    }

    debug_assert!(second.is_some());
    (second.unwrap_or(*target), min_dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator_for(table: Vec<Word>, n: N) -> PartialGtGenerator {
        let mut generator = PartialGtGenerator::new(&Config::default());
        generator.set_permutation(Permutation::from_table(&table), n);
        generator.prepare_for_generation();
        generator
    }

    fn eval(elements: &VecDeque<Gate>, x: Word) -> Word {
        elements.iter().fold(x, |x, gate| gate.apply(x))
    }

    #[test]
    fn full_edge_on_whole_cube() {
        // swap pairs (x, x ^ 1) for every x: one full edge of difference 1
        let table = vec![1, 0, 3, 2, 5, 4, 7, 6];
        let generator = generator_for(table.clone(), 3);

        let result = generator.partial_result().unwrap();
        assert!(matches!(result.kind, PartialResultKind::FullEdge { .. }));

        let elements = generator.implement_partial_result().unwrap();
        assert_eq!(elements.len(), 1);

        for (x, &y) in table.iter().enumerate() {
            assert_eq!(eval(&elements, x as Word), y);
        }
    }

    #[test]
    fn exact_edge_on_half_cube() {
        // swap (x, x ^ 1) on the upper half of the cube
        let table = vec![0, 1, 2, 3, 5, 4, 7, 6];
        let generator = generator_for(table.clone(), 3);

        let result = generator.partial_result().unwrap();
        assert!(matches!(result.kind, PartialResultKind::Edge { .. }));

        let elements = generator.implement_partial_result().unwrap();
        for (x, &y) in table.iter().enumerate() {
            assert_eq!(eval(&elements, x as Word), y);
        }
    }

    #[test]
    fn single_transposition_gates() {
        let generator = {
            let mut generator = PartialGtGenerator::new(&Config::default());
            generator.set_permutation(Permutation::new(), 4);
            generator
        };

        let transp = Transposition::new(5, 13);
        let elements = generator.implement_single_transposition(&transp);

        for x in 0..16 {
            let expected = transp.output(x);
            assert_eq!(eval(&elements, x), expected);
        }
    }

    #[test]
    fn pair_implementation_swaps_exactly() {
        let generator = {
            let mut generator = PartialGtGenerator::new(&Config::default());
            generator.set_permutation(Permutation::new(), 3);
            generator
        };

        let pair = [Transposition::new(1, 2), Transposition::new(5, 6)];
        let elements = generator.implement_pair(&pair);

        for x in 0..8 {
            let expected = pair[1].output(pair[0].output(x));
            assert_eq!(eval(&elements, x), expected);
        }
    }

    #[test]
    fn pack_realizes_exactly_its_swaps() {
        let mut config = Config::default();
        config.pack_size = 4;

        let mut generator = PartialGtGenerator::new(&config);

        // four independent swaps on 4 lines
        let transpositions = vec![
            Transposition::new(0b0000, 0b0011),
            Transposition::new(0b0101, 0b0110),
            Transposition::new(0b1001, 0b1010),
            Transposition::new(0b1100, 0b1111),
        ];

        generator.set_permutation(Permutation::new(), 4);

        let elements = generator
            .implement_independent_transpositions(&transpositions)
            .unwrap();

        for x in 0..16 as Word {
            let expected = transpositions
                .iter()
                .fold(x, |value, t| t.output(value));

            assert_eq!(eval(&elements, x), expected, "input {:#06b}", x);
        }
    }

    #[test]
    fn common_pair_on_three_cycle() {
        // 3-cycle (0 1 2): common pair comes with a probe transposition
        let table = vec![1, 2, 0, 3];
        let generator = generator_for(table, 2);

        let result = generator.partial_result().unwrap();

        // the best result for a 3-cycle is never empty
        assert!(!result.transpositions.is_empty());
    }

    #[test]
    fn ranking_prefers_edges() {
        let edge = PartialResult {
            kind: PartialResultKind::Edge { capacity: 4 },
            transpositions: vec![],
            edge: None,
            distances_sum: 10,
        };

        let pack = PartialResult {
            kind: PartialResultKind::Pack { size: 8 },
            transpositions: vec![],
            edge: None,
            distances_sum: 2,
        };

        assert!(edge.is_better_than(&pack));
        assert!(!pack.is_better_than(&edge));

        let full = PartialResult {
            kind: PartialResultKind::FullEdge { capacity: 4 },
            transpositions: vec![],
            edge: None,
            distances_sum: 10,
        };

        assert!(full.is_better_than(&edge));
    }
}
