//! Quantum-cost metric.
//!
//! The cost of a gate depends on its control count and on how many free
//! lines the circuit leaves for its decomposition; negative controls shift
//! some table entries. Adjacent pairs forming a Peres gate are accounted
//! at the sub-additive pair cost.

use crate::{
    gate::Gate,
    math::{count_bits, N},
    scheme::Scheme,
};

/// Quantum cost of a whole cascade, with Peres-pair recognition.
pub fn quantum_cost(scheme: &Scheme) -> N {
    let mut cost = 0;

    let mut prev: Option<&Gate> = None;
    for gate in scheme.iter() {
        if let Some(previous) = prev.take() {
            if let Some(peres_cost) = is_peres_pair(previous, gate) {
                cost -= gate_cost(previous);
                cost += peres_cost;
                continue;
            }
        }

        cost += gate_cost(gate);
        prev = Some(gate);
    }

    cost
}

/// Quantum cost of a single gate.
pub fn gate_cost(gate: &Gate) -> N {
    let n = gate.input_count();

    let control_mask = gate.control_mask();
    let count = count_bits(control_mask) + 1;

    let mut cost = match count {
        1 | 2 => 1,
        3 => 5,
        4 => 13,
        5 => {
            if count + 2 <= n {
                26
            } else {
                29
            }
        }
        6 => pick_by_free_lines(count, n, 38, 52, 61),
        7 => pick_by_free_lines(count, n, 50, 80, 125),
        8 => pick_by_free_lines(count, n, 62, 100, 253),
        _ => pick_by_free_lines(count, n, 12 * count - 34, 24 * count - 88, (1 << count) - 3),
    };

    let inversion_mask = gate.inversion_mask();
    if inversion_mask != 0 {
        if count == 2 {
            cost = 3;
        } else if count == 3 {
            if control_mask == inversion_mask {
                cost += 2;
            } else {
                cost = 6;
            }
        } else if control_mask == inversion_mask {
            cost += 2;
        }
    }

    cost
}

fn pick_by_free_lines(count: N, n: N, two_free: N, one_free: N, none: N) -> N {
    if 2 * count - 3 <= n {
        two_free
    } else if count + 1 <= n {
        one_free
    } else {
        none
    }
}

/// Recognize a CNOT / CCNOT pair forming a Peres gate; returns its cost.
pub fn is_peres_pair(left: &Gate, right: &Gate) -> Option<N> {
    let mut left_control = left.control_mask();
    let mut left_inversion = left.inversion_mask();

    let mut right_control = right.control_mask();
    let mut right_inversion = right.inversion_mask();

    let left_count = count_bits(left_control);
    if left_count > 2 || left_count == 0 {
        return None;
    }

    let right_count = count_bits(right_control);
    if right_count > 2 || right_count == 0 || left_count == right_count {
        return None;
    }

    if left_control != right.target_mask() | right_control
        && right_control != left.target_mask() | left_control
    {
        return None;
    }

    if left_inversion == 0 && right_inversion == 0 {
        return Some(4);
    }

    // put the two-control side on the left
    if left_count < right_count {
        std::mem::swap(&mut left_control, &mut right_control);
        std::mem::swap(&mut left_inversion, &mut right_inversion);
    }

    let cost = if right_inversion == 0 {
        if left_inversion == left_control {
            7
        } else {
            6
        }
    } else if left_inversion == left_control {
        9
    } else {
        8
    };

    Some(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_gate_costs() {
        assert_eq!(gate_cost(&Gate::not(3, 0b001)), 1);
        assert_eq!(gate_cost(&Gate::cnot(3, 0b100, 0b001)), 1);
        assert_eq!(gate_cost(&Gate::cnot(3, 0b100, 0b011)), 5);
        assert_eq!(gate_cost(&Gate::cnot(4, 0b1000, 0b0111)), 13);

        // 4 controls: 29 without free lines, 26 with two of them
        assert_eq!(gate_cost(&Gate::cnot(5, 0b10000, 0b01111)), 29);
        assert_eq!(gate_cost(&Gate::cnot(7, 0b10000, 0b01111)), 26);
    }

    #[test]
    fn negative_control_costs() {
        assert_eq!(gate_cost(&Gate::new(2, 0b10, 0b01, 0b01)), 3);
        assert_eq!(gate_cost(&Gate::new(3, 0b100, 0b011, 0b011)), 7);
        assert_eq!(gate_cost(&Gate::new(3, 0b100, 0b011, 0b001)), 6);
    }

    #[test]
    fn peres_recognition() {
        let ccnot = Gate::cnot(3, 0b100, 0b011);
        let cnot = Gate::cnot(3, 0b010, 0b001);

        assert_eq!(is_peres_pair(&ccnot, &cnot), Some(4));
        assert_eq!(is_peres_pair(&cnot, &ccnot), Some(4));

        let unrelated = Gate::cnot(3, 0b001, 0b010);
        assert_eq!(is_peres_pair(&ccnot, &unrelated), None);
    }

    #[test]
    fn scheme_cost_counts_peres_once() {
        let ccnot = Gate::cnot(3, 0b100, 0b011);
        let cnot = Gate::cnot(3, 0b010, 0b001);

        let pair: Scheme = vec![ccnot, cnot].into();
        assert_eq!(quantum_cost(&pair), 4);

        let single: Scheme = vec![ccnot].into();
        assert_eq!(quantum_cost(&single), 5);
    }
}
