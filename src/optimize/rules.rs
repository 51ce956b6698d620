//! Local rewrite rules.
//!
//! Every rule pairs a selection predicate over two gates with a swap
//! function producing replacement lists for both positions once the gates
//! stand next to each other. The closed set of rules is dispatched
//! statically.

use enum_dispatch::enum_dispatch;

use crate::{
    gate::Gate,
    math::{count_bits, Word},
    scheme::is_peres_pair,
};

#[enum_dispatch]
pub trait RewriteRule {
    /// Whether the pair, brought adjacent in this order, can be rewritten.
    fn matches(&self, left: &Gate, right: &Gate) -> bool;

    /// Replacement lists for the left and the right position.
    fn rewrite(&self, left: &Gate, right: &Gate) -> (Vec<Gate>, Vec<Gate>);
}

#[enum_dispatch(RewriteRule)]
#[derive(Clone, Copy, Debug)]
pub enum Rule {
    Duplicate,
    Merge,
    ReduceConnections,
    Transfer,
    Peres,
}

/// Identical gates cancel.
#[derive(Clone, Copy, Debug, Default)]
pub struct Duplicate;

impl RewriteRule for Duplicate {
    fn matches(&self, left: &Gate, right: &Gate) -> bool {
        left == right
    }

    fn rewrite(&self, left: &Gate, right: &Gate) -> (Vec<Gate>, Vec<Gate>) {
        debug_assert!(self.matches(left, right));
        (Vec::new(), Vec::new())
    }
}

/// Gates with the same target merge into one when they differ in exactly
/// one control or inversion bit:
///
/// ```text
/// (01)(11) -> (*1)      same controls, one inversion differs
/// (0*)(01) -> (00)      same inversions, one control differs
/// (1*)(10) -> (11)      the same bit differs in both
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Merge {
    pub allow_inversions: bool,
}

impl Merge {
    fn diffs(left: &Gate, right: &Gate) -> (Word, Word) {
        (
            left.control_mask() ^ right.control_mask(),
            left.inversion_mask() ^ right.inversion_mask(),
        )
    }
}

impl RewriteRule for Merge {
    fn matches(&self, left: &Gate, right: &Gate) -> bool {
        if left.target_mask() != right.target_mask() {
            return false;
        }

        let (controls_diff, inversions_diff) = Self::diffs(left, right);

        if self.allow_inversions
            && left.control_mask() == right.control_mask()
            && count_bits(inversions_diff) == 1
        {
            return true;
        }

        if left.inversion_mask() == right.inversion_mask() && count_bits(controls_diff) == 1 {
            return true;
        }

        controls_diff == inversions_diff && count_bits(controls_diff) == 1
    }

    fn rewrite(&self, left: &Gate, right: &Gate) -> (Vec<Gate>, Vec<Gate>) {
        debug_assert!(self.matches(left, right));

        let (controls_diff, inversions_diff) = Self::diffs(left, right);
        let mut element = *left;

        if left.control_mask() == right.control_mask() && count_bits(inversions_diff) == 1 {
            // (01)(11) -> (*1): the differing line drops out
            element.set_control_mask(left.control_mask() & !inversions_diff);
            element.set_inversion_mask(left.inversion_mask() & !inversions_diff);
        } else if left.inversion_mask() == right.inversion_mask()
            && count_bits(controls_diff) == 1
        {
            // (0*)(01) -> (00): the free line becomes an inverted control
            element.set_control_mask(left.control_mask() | controls_diff);
            element.set_inversion_mask(left.inversion_mask() | controls_diff);
        } else {
            // (1*)(10) -> (11): the free line becomes a positive control
            element.set_control_mask(left.control_mask() | controls_diff);
            element.set_inversion_mask(left.inversion_mask() & !inversions_diff);
        }

        (vec![element], Vec::new())
    }
}

/// `(01)(10) -> (*1)(1*)`: two gates equal up to two complementary
/// inversion bits each lose one control line.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReduceConnections;

impl RewriteRule for ReduceConnections {
    fn matches(&self, left: &Gate, right: &Gate) -> bool {
        if left.target_mask() != right.target_mask()
            || left.control_mask() != right.control_mask()
        {
            return false;
        }

        let diff = left.inversion_mask() ^ right.inversion_mask();
        let control_value = left.inversion_mask() & diff;

        count_bits(diff) == 2 && count_bits(control_value) == 1
    }

    fn rewrite(&self, left: &Gate, right: &Gate) -> (Vec<Gate>, Vec<Gate>) {
        debug_assert!(self.matches(left, right));

        let diff = left.inversion_mask() ^ right.inversion_mask();

        let mut new_left = *left;
        let clear_mask = diff & left.inversion_mask();
        new_left.set_control_mask(left.control_mask() & !clear_mask);
        new_left.set_inversion_mask(left.inversion_mask() & !clear_mask);

        let mut new_right = *right;
        let clear_mask = diff & right.inversion_mask();
        new_right.set_control_mask(right.control_mask() & !clear_mask);
        new_right.set_inversion_mask(right.inversion_mask() & !clear_mask);

        // both rewritten gates take the left position
        (vec![new_left, new_right], Vec::new())
    }
}

/// Transfer of a gate past a gate whose controls contain its target:
/// `[A, B] -> [B, mixed, A]` with the mixed gate collecting the joint
/// controls outside the transferred target line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Transfer;

impl RewriteRule for Transfer {
    fn matches(&self, left: &Gate, right: &Gate) -> bool {
        let blocked = match left.swappability(right, true) {
            None => true,
            Some(crate::gate::SwapMode::InvertSelf) => true,
            _ => false,
        };

        blocked
            && (right.control_mask() & left.target_mask() != 0)
                ^ (left.control_mask() & right.target_mask() != 0)
    }

    fn rewrite(&self, left: &Gate, right: &Gate) -> (Vec<Gate>, Vec<Gate>) {
        debug_assert!(self.matches(left, right));

        // orient so that the transferred target lies in the other controls
        let swapped = left.control_mask() & right.target_mask() != 0;
        let (a, b) = if swapped { (right, left) } else { (left, right) };

        let mut mixed = *b;
        mixed.set_control_mask(!a.target_mask() & (a.control_mask() | b.control_mask()));
        mixed.set_inversion_mask(!a.target_mask() & (a.inversion_mask() | b.inversion_mask()));

        let pair = vec![*b, mixed];
        let single = vec![*a];

        if swapped {
            (single, pair)
        } else {
            (pair, single)
        }
    }
}

/// CNOT / CCNOT pair forming a Peres gate: kept as is, recognized only
/// for quantum-cost accounting.
#[derive(Clone, Copy, Debug, Default)]
pub struct Peres;

impl RewriteRule for Peres {
    fn matches(&self, left: &Gate, right: &Gate) -> bool {
        let left_count = count_bits(left.control_mask());
        let right_count = count_bits(right.control_mask());

        (left_count == 2
            && right_count == 1
            && left.control_mask() == (right.target_mask() | right.control_mask()))
            || (right_count == 2
                && left_count == 1
                && right.control_mask() == (left.target_mask() | left.control_mask()))
    }

    fn rewrite(&self, left: &Gate, right: &Gate) -> (Vec<Gate>, Vec<Gate>) {
        debug_assert!(is_peres_pair(left, right).is_some() || self.matches(left, right));
        (vec![*left], vec![*right])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::N;

    fn eval(gates: &[Gate], n: N) -> Vec<Word> {
        (0..1 << n)
            .map(|x| gates.iter().fold(x, |x, gate| gate.apply(x)))
            .collect()
    }

    #[test]
    fn duplicate() {
        let gate = Gate::cnot(3, 0b100, 0b011);

        assert!(Duplicate.matches(&gate, &gate));
        let (left, right) = Duplicate.rewrite(&gate, &gate);
        assert!(left.is_empty() && right.is_empty());

        let other = Gate::cnot(3, 0b100, 0b001);
        assert!(!Duplicate.matches(&gate, &other));
    }

    #[test]
    fn merge_same_controls() {
        // (01)(11) -> (*1)
        let left = Gate::new(3, 0b100, 0b011, 0b001);
        let right = Gate::new(3, 0b100, 0b011, 0b000);

        let rule = Merge {
            allow_inversions: true,
        };
        assert!(rule.matches(&left, &right));

        let (replacement, rest) = rule.rewrite(&left, &right);
        assert!(rest.is_empty());
        assert_eq!(replacement.len(), 1);

        assert_eq!(eval(&replacement, 3), eval(&[left, right], 3));
    }

    #[test]
    fn merge_same_inversions() {
        // (0*)(01) -> (00)
        let left = Gate::cnot(3, 0b100, 0b010);
        let right = Gate::cnot(3, 0b100, 0b011);

        let rule = Merge {
            allow_inversions: false,
        };
        assert!(rule.matches(&left, &right));

        let (replacement, _) = rule.rewrite(&left, &right);
        assert_eq!(replacement.len(), 1);
        assert_eq!(eval(&replacement, 3), eval(&[left, right], 3));
    }

    #[test]
    fn merge_same_bit_in_both() {
        // (1*)(10) -> (11)
        let left = Gate::cnot(3, 0b100, 0b010);
        let right = Gate::new(3, 0b100, 0b011, 0b001);

        let rule = Merge {
            allow_inversions: true,
        };
        assert!(rule.matches(&left, &right));

        let (replacement, _) = rule.rewrite(&left, &right);
        assert_eq!(replacement.len(), 1);
        assert_eq!(eval(&replacement, 3), eval(&[left, right], 3));
    }

    #[test]
    fn reduce_connections() {
        // (01)(10) -> (*1)(1*)
        let left = Gate::new(3, 0b100, 0b011, 0b001);
        let right = Gate::new(3, 0b100, 0b011, 0b010);

        assert!(ReduceConnections.matches(&left, &right));

        let (replacement, rest) = ReduceConnections.rewrite(&left, &right);
        assert!(rest.is_empty());
        assert_eq!(replacement.len(), 2);

        assert!(replacement.iter().all(|g| g.control_count() == 1));
        assert_eq!(eval(&replacement, 3), eval(&[left, right], 3));
    }

    #[test]
    fn transfer() {
        let cnot = Gate::cnot(3, 0b010, 0b001);
        let ccnot = Gate::cnot(3, 0b100, 0b011);

        assert!(Transfer.matches(&cnot, &ccnot));

        let (left_replacement, right_replacement) = Transfer.rewrite(&cnot, &ccnot);

        let mut combined = left_replacement.clone();
        combined.extend(right_replacement.iter().copied());

        assert_eq!(eval(&combined, 3), eval(&[cnot, ccnot], 3));

        // and in the mirrored order
        assert!(Transfer.matches(&ccnot, &cnot));

        let (left_replacement, right_replacement) = Transfer.rewrite(&ccnot, &cnot);
        let mut combined = left_replacement.clone();
        combined.extend(right_replacement.iter().copied());

        assert_eq!(eval(&combined, 3), eval(&[ccnot, cnot], 3));
    }

    #[test]
    fn peres_pair_is_kept() {
        let ccnot = Gate::cnot(3, 0b100, 0b011);
        let cnot = Gate::cnot(3, 0b010, 0b001);

        assert!(Peres.matches(&ccnot, &cnot));

        let (left, right) = Peres.rewrite(&ccnot, &cnot);
        assert_eq!(left, vec![ccnot]);
        assert_eq!(right, vec![cnot]);
    }
}
