//! Gate sequences.
//!
//! A [`Scheme`] is an ordered cascade of [`Gate`]s, applied left to right.
//! It derefs to [`VecDeque<Gate>`] to inherit the queue interface, the
//! same way the rest of the crate treats gate batches as plain value
//! sequences.

use std::{
    collections::VecDeque,
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{gate::Gate, math::Word, table::TruthTable};

pub use self::cost::{is_peres_pair, quantum_cost};

mod cost;

#[derive(Clone, Default, PartialEq)]
pub struct Scheme(VecDeque<Gate>);

impl Scheme {
    pub fn new() -> Self {
        Self(VecDeque::new())
    }

    /// Evaluate the cascade on one input word.
    pub fn apply(&self, input: Word) -> Word {
        self.0.iter().fold(input, |x, gate| gate.apply(x))
    }

    /// True iff the cascade maps every x to `table[x]`.
    pub fn realizes(&self, table: &TruthTable) -> bool {
        table
            .iter()
            .enumerate()
            .all(|(x, &y)| self.apply(x as Word) == y)
    }

    /// True iff both cascades compute the same function on `n` lines.
    pub fn equivalent_to(&self, other: &Scheme, n: usize) -> bool {
        (0..1 << n).all(|x| self.apply(x) == other.apply(x))
    }
}

impl Deref for Scheme {
    type Target = VecDeque<Gate>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Scheme {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<VecDeque<Gate>> for Scheme {
    fn from(gates: VecDeque<Gate>) -> Self {
        Self(gates)
    }
}

impl From<Vec<Gate>> for Scheme {
    fn from(gates: Vec<Gate>) -> Self {
        Self(gates.into())
    }
}

impl From<Scheme> for Vec<Gate> {
    fn from(scheme: Scheme) -> Self {
        scheme.0.into()
    }
}

impl std::iter::FromIterator<Gate> for Scheme {
    fn from_iter<I: IntoIterator<Item = Gate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Scheme {
    type Item = &'a Gate;
    type IntoIter = std::collections::vec_deque::Iter<'a, Gate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Surround `target` with `conjugations`: C target C⁻¹ (every gate is an
/// involution, so the closing run is the opening run reversed).
pub fn conjugate(
    target: VecDeque<Gate>,
    conjugations: &VecDeque<Gate>,
    with_reverse: bool,
) -> VecDeque<Gate> {
    let mut implementation = VecDeque::with_capacity(target.len() + 2 * conjugations.len());

    if with_reverse {
        implementation.extend(conjugations.iter().rev().copied());
        implementation.extend(target);
        implementation.extend(conjugations.iter().copied());
    } else {
        implementation.extend(conjugations.iter().copied());
        implementation.extend(target);
        implementation.extend(conjugations.iter().rev().copied());
    }

    implementation
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::FromIterator;

    #[test]
    fn apply_folds_left_to_right() {
        let mut scheme = Scheme::new();
        scheme.push_back(Gate::cnot(2, 0b10, 0b01));
        scheme.push_back(Gate::not(2, 0b01));

        assert_eq!(scheme.apply(0b01), 0b10);
        assert_eq!(scheme.apply(0b00), 0b01);
    }

    #[test]
    fn realizes_table() {
        let mut scheme = Scheme::new();
        scheme.push_back(Gate::cnot(2, 0b10, 0b01));

        assert!(scheme.realizes(&vec![0, 3, 2, 1]));
        assert!(!scheme.realizes(&vec![0, 1, 2, 3]));
    }

    #[test]
    fn conjugation_wraps_target() {
        let a = Gate::not(2, 0b01);
        let b = Gate::not(2, 0b10);
        let core = Gate::cnot(2, 0b10, 0b01);

        let wrapped = conjugate(
            VecDeque::from(vec![core]),
            &VecDeque::from(vec![a, b]),
            false,
        );

        assert_eq!(Vec::from_iter(wrapped.iter().copied()), vec![a, b, core, b, a]);

        let wrapped = conjugate(
            VecDeque::from(vec![core]),
            &VecDeque::from(vec![a, b]),
            true,
        );

        assert_eq!(Vec::from_iter(wrapped.iter().copied()), vec![b, a, core, a, b]);
    }
}
