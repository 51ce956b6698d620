//! Gate-level optimizer.
//!
//! The optimizer walks index pairs of the cascade, brings candidate gates
//! next to each other by commuting them past their neighbours and applies
//! the local rewrite rules of [`rules`]. Passes alternate until a fixed
//! point: duplicates and merges first, then the same over the
//! inversion-free expansions, with transfers in between.

use std::collections::VecDeque;

use crate::{
    config::Config,
    gate::{Gate, SwapMode},
    math::N,
    scheme::Scheme,
    synthesis::{Error, Result},
};

pub use self::rules::{Duplicate, Merge, Peres, ReduceConnections, RewriteRule, Rule, Transfer};

mod rules;

type OptScheme = Vec<Gate>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ExpansionKind {
    Simple,
    Recursive,
}

/// Contiguous index range a gate can be commuted across, inclusive.
#[derive(Clone, Copy, Debug)]
struct Range {
    start: N,
    end: N,
}

impl Range {
    fn sorted(start: N, end: N) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    fn has(&self, index: N) -> bool {
        self.start <= index && index <= self.end
    }
}

/// A gate variant together with the range it may occupy.
#[derive(Clone)]
struct SwapResult {
    gate: Gate,
    range: Range,
}

struct SwapResultsPair {
    for_left: VecDeque<SwapResult>,
    for_right: VecDeque<SwapResult>,
}

pub struct PostProcessor {
    do_post_optimization: bool,
    max_distance: N,
    max_sub_scheme_size: N,
    use_swap_results: bool,
    full_scheme_passes: bool,
    remove_negative_controls: bool,

    negative_controls_allowed: bool,
}

impl PostProcessor {
    pub fn new(config: &Config) -> Self {
        Self {
            do_post_optimization: config.do_post_optimization,
            max_distance: config.max_optimization_distance,
            max_sub_scheme_size: config.max_sub_scheme_size.max(1),
            use_swap_results: config.use_swap_results,
            full_scheme_passes: config.full_scheme_passes,
            remove_negative_controls: config.remove_negative_controls,
            negative_controls_allowed: true,
        }
    }

    pub fn optimize(mut self, scheme: &Scheme) -> Result<Scheme> {
        if !self.do_post_optimization {
            return Ok(scheme.clone());
        }

        let mut optimized: OptScheme = scheme.iter().copied().collect();
        self.negative_controls_allowed = true;

        loop {
            optimized = self.remove_duplicates(optimized)?;

            let (next, merged) = self.merge_optimization(optimized)?;
            optimized = next;

            if !merged {
                break;
            }
        }

        let mut implementation = optimized;

        if self.full_scheme_passes {
            self.negative_controls_allowed = true;
            implementation = full_scheme(&implementation, ExpansionKind::Recursive);
            implementation = self.remove_duplicates(implementation)?;
            implementation = self.transfer_merge_loop(implementation)?;

            self.negative_controls_allowed = true;
            implementation = full_scheme(&implementation, ExpansionKind::Simple);
            implementation = self.remove_duplicates(implementation)?;
            implementation = self.transfer_merge_loop(implementation)?;

            if self.remove_negative_controls {
                self.negative_controls_allowed = false;

                implementation = full_scheme(&implementation, ExpansionKind::Simple);
                implementation = self.remove_duplicates(implementation)?;
                implementation = self.transfer_merge_loop(implementation)?;
            }
        }

        implementation = self.peres_pass(implementation)?;

        Ok(implementation.into())
    }

    fn transfer_merge_loop(&mut self, scheme: OptScheme) -> Result<OptScheme> {
        let mut scheme = scheme;

        loop {
            let (next, transferred) = self.general_optimization(scheme, &Rule::from(Transfer), true)?;

            let (next, merged) = self.merge_optimization(next)?;

            let (next, reduced) =
                self.general_optimization(next, &Rule::from(ReduceConnections), false)?;

            scheme = next;

            if !(transferred || merged || reduced) {
                return Ok(scheme);
            }
        }
    }

    fn remove_duplicates(&mut self, scheme: OptScheme) -> Result<OptScheme> {
        let mut scheme = scheme;
        let mut start_index = 0;

        loop {
            let (next, repeat) = self.try_optimization_tactics(
                scheme,
                &Rule::from(Duplicate),
                false,
                Some(&mut start_index),
                true,
            )?;

            scheme = next;
            if !repeat {
                return Ok(scheme);
            }
        }
    }

    fn merge_optimization(&mut self, scheme: OptScheme) -> Result<(OptScheme, bool)> {
        let rule = Rule::from(Merge {
            allow_inversions: self.negative_controls_allowed,
        });

        self.general_optimization(scheme, &rule, false)
    }

    fn peres_pass(&mut self, scheme: OptScheme) -> Result<OptScheme> {
        let mut scheme = scheme;
        let mut start_index = 0;

        loop {
            let (next, repeat) = self.try_optimization_tactics(
                scheme,
                &Rule::from(Peres),
                false,
                Some(&mut start_index),
                false,
            )?;

            scheme = next;
            if !repeat {
                return Ok(scheme);
            }
        }
    }

    /// Window the cascade into bounded sub-schemes and drive the tactic
    /// to a fixed point over each.
    fn general_optimization(
        &mut self,
        scheme: OptScheme,
        rule: &Rule,
        less_complexity_required: bool,
    ) -> Result<(OptScheme, bool)> {
        let mut optimized = scheme;
        let mut any_optimized = false;

        loop {
            let mut repeat_outer = false;
            let mut windowed = OptScheme::with_capacity(optimized.len());

            for chunk in optimized.chunks(self.max_sub_scheme_size) {
                let mut sub_scheme = chunk.to_vec();

                loop {
                    let (next, repeat) = self.try_optimization_tactics(
                        sub_scheme,
                        rule,
                        less_complexity_required,
                        None,
                        true,
                    )?;

                    sub_scheme = next;

                    if repeat {
                        any_optimized = true;
                        repeat_outer = true;
                    } else {
                        break;
                    }
                }

                windowed.extend(sub_scheme);
            }

            optimized = windowed;

            if !repeat_outer {
                return Ok((optimized, any_optimized));
            }
        }
    }

    /// One application attempt of a rule: find an index pair, bring the
    /// gates together, splice in the replacements and keep the result if
    /// it is no worse (strictly better when required).
    fn try_optimization_tactics(
        &mut self,
        scheme: OptScheme,
        rule: &Rule,
        less_complexity_required: bool,
        mut start_index: Option<&mut N>,
        use_neighbor_elements: bool,
    ) -> Result<(OptScheme, bool)> {
        let element_count = scheme.len();
        if element_count < 2 {
            return Ok((scheme, false));
        }

        let mut optimized = scheme.clone();

        for left_index in start_index.as_deref().map(|s| *s).unwrap_or(0)..element_count - 1 {
            if let Some(start) = start_index.as_deref_mut() {
                *start = left_index;
            }

            if !use_neighbor_elements {
                // pairs already adjacent are left in place
                let element = &scheme[left_index];
                if left_index > 0 && rule.matches(&scheme[left_index - 1], element) {
                    continue;
                }

                if rule.matches(element, &scheme[left_index + 1]) {
                    continue;
                }
            }

            let mut left_max_transfer_index: Option<N> = None;

            for right_index in left_index + 1..element_count {
                if right_index - left_index > self.max_distance {
                    break;
                }

                if !use_neighbor_elements && right_index - left_index == 1 {
                    continue;
                }

                let positions = if self.use_swap_results {
                    let pair = self.swap_results_pair(&scheme, left_index, right_index);
                    self.positions_from_swap_results(rule, &pair, left_index, right_index)
                } else {
                    self.positions_from_transfer(
                        &scheme,
                        rule,
                        left_index,
                        right_index,
                        &mut left_max_transfer_index,
                    )
                };

                let (new_left_index, new_right_index) = match positions {
                    Some(positions) => positions,
                    None => continue,
                };

                // move the pair to its meeting point
                if new_left_index < right_index {
                    move_element(&mut optimized, left_index, new_left_index)?;
                    move_element(&mut optimized, right_index, new_right_index)?;
                } else {
                    move_element(&mut optimized, right_index, new_right_index)?;
                    move_element(&mut optimized, left_index, new_left_index)?;
                }

                let left_element = optimized[new_left_index];
                let right_element = optimized[new_right_index];

                debug_assert!(rule.matches(&left_element, &right_element));

                let (left_replacement, right_replacement) =
                    rule.rewrite(&left_element, &right_element);

                let mut replaced = OptScheme::with_capacity(optimized.len() + 2);
                for (index, gate) in optimized.iter().enumerate() {
                    if index == new_left_index {
                        replaced.extend(left_replacement.iter().copied());
                    } else if index == new_right_index {
                        replaced.extend(right_replacement.iter().copied());
                    } else {
                        replaced.push(*gate);
                    }
                }

                let mut scheme_optimized = true;

                if replaced.len() >= element_count {
                    replaced = self.remove_duplicates(replaced)?;

                    if self.negative_controls_allowed {
                        let (next, _) = self.merge_optimization(replaced)?;
                        replaced = next;
                    }

                    if less_complexity_required {
                        scheme_optimized = replaced.len() < element_count;
                    }
                }

                if scheme_optimized {
                    return Ok((replaced, true));
                }

                // revert and keep searching
                optimized = scheme.clone();
            }
        }

        Ok((scheme, false))
    }

    /// Simple meeting-point computation: commute the right gate leftward
    /// as far as possible, then the left gate rightward.
    fn positions_from_transfer(
        &self,
        scheme: &OptScheme,
        rule: &Rule,
        left_index: N,
        right_index: N,
        left_max_transfer_index: &mut Option<N>,
    ) -> Option<(N, N)> {
        let left = &scheme[left_index];
        let right = &scheme[right_index];

        if !rule.matches(left, right) {
            return None;
        }

        let mut new_left_index = left_index;
        let mut new_right_index = right_index;

        if new_left_index + 1 != new_right_index {
            new_right_index = maximum_transfer_index(scheme, right, right_index, left_index);

            if new_right_index != left_index + 1 {
                let left_max = *left_max_transfer_index.get_or_insert_with(|| {
                    maximum_transfer_index(scheme, left, left_index, scheme.len() - 1)
                });

                new_left_index = left_max;
            }

            if new_left_index + 1 >= new_right_index {
                // keep the left element maximally left aligned
                new_left_index = new_right_index - 1;
            } else {
                return None;
            }
        }

        Some((new_left_index, new_right_index))
    }

    /// Non-local meeting points: both gates are propagated in both
    /// directions with their mutating variants recorded per range, and any
    /// variant pair that matches the rule on touching ranges qualifies.
    fn positions_from_swap_results(
        &self,
        rule: &Rule,
        pair: &SwapResultsPair,
        left_index: N,
        right_index: N,
    ) -> Option<(N, N)> {
        let mut best: Option<(N, N)> = None;
        let mut min_distance = N::MAX;

        for left in &pair.for_left {
            for right in &pair.for_right {
                if !rule.matches(&left.gate, &right.gate) {
                    continue;
                }

                let shifted = Range {
                    start: right.range.start.saturating_sub(1),
                    end: right.range.end.saturating_sub(1),
                };

                for index in left.range.start..=left.range.end {
                    if shifted.has(index) && right.range.has(index + 1) {
                        let distance = left_index.max(index) - left_index.min(index)
                            + right_index.max(index + 1)
                            - right_index.min(index + 1);

                        if distance < min_distance {
                            min_distance = distance;
                            best = Some((index, index + 1));
                        }
                    }
                }
            }
        }

        best
    }

    /// Propagate both operands left and right, merging the two walks.
    fn swap_results_pair(
        &self,
        scheme: &OptScheme,
        left_index: N,
        right_index: N,
    ) -> SwapResultsPair {
        debug_assert!(left_index < right_index);

        let mut scheme_copy = scheme.clone();
        let for_left_to_left = self.swap_result(&mut scheme_copy, left_index, true);
        let for_right_to_left = self.swap_result(&mut scheme_copy, right_index, true);

        let mut scheme_copy = scheme.clone();
        let for_right_to_right = self.swap_result(&mut scheme_copy, right_index, false);
        let for_left_to_right = self.swap_result(&mut scheme_copy, left_index, false);

        SwapResultsPair {
            for_left: merge_swap_results(for_left_to_left, for_left_to_right),
            for_right: merge_swap_results(for_right_to_left, for_right_to_right),
        }
    }

    /// Push one gate through the scheme in one direction, recording the
    /// (possibly inversion-mutated) variant for every contiguous range.
    fn swap_result(
        &self,
        scheme: &mut OptScheme,
        start_index: N,
        to_left: bool,
    ) -> VecDeque<SwapResult> {
        let mut result = VecDeque::new();

        let stop_index = if to_left { 0 } else { scheme.len() - 1 };
        if start_index == stop_index {
            return result;
        }

        let mut index = start_index;
        let mut range_anchor = start_index;
        let mut target = scheme[index];

        loop {
            let next = if to_left { index - 1 } else { index + 1 };
            let another = scheme[next];

            match target.swappability(&another, self.negative_controls_allowed) {
                Some(mode) => {
                    let mut moving = scheme[index];
                    let mut neighbor = scheme[next];

                    if !Gate::swap(&mut moving, &mut neighbor) {
                        break;
                    }

                    scheme[index] = moving;
                    scheme[next] = neighbor;

                    if mode == SwapMode::InvertSelf {
                        // the moving gate mutated: close the range
                        let sr = SwapResult {
                            gate: target,
                            range: Range::sorted(range_anchor, index),
                        };

                        if to_left {
                            result.push_front(sr);
                        } else {
                            result.push_back(sr);
                        }

                        range_anchor = next;
                    }

                    index = next;
                    target = scheme[index];
                }
                None => break,
            }

            if index == stop_index {
                break;
            }
        }

        let sr = SwapResult {
            gate: target,
            range: Range::sorted(range_anchor, index),
        };

        if to_left {
            result.push_front(sr);
        } else {
            result.push_back(sr);
        }

        result
    }
}

fn merge_swap_results(
    mut to_left: VecDeque<SwapResult>,
    mut to_right: VecDeque<SwapResult>,
) -> VecDeque<SwapResult> {
    if to_left.is_empty() {
        return to_right;
    }

    if to_right.is_empty() {
        return to_left;
    }

    // the last leftward segment and the first rightward one share the home
    // position of the gate
    let left = to_left.pop_back().unwrap_or_else(|| unreachable!());
    let right = to_right.pop_front().unwrap_or_else(|| unreachable!());

    debug_assert!(left.gate == right.gate);

    let merged_home = SwapResult {
        gate: left.gate,
        range: Range {
            start: left.range.start,
            end: right.range.end,
        },
    };

    let mut merged = to_left;
    merged.push_back(merged_home);
    merged.extend(to_right);

    merged
}

/// How far a gate can be commuted (under the strict rule) from
/// `start_index` toward `stop_index`.
fn maximum_transfer_index(scheme: &OptScheme, target: &Gate, start_index: N, stop_index: N) -> N {
    let step: isize = if start_index > stop_index { -1 } else { 1 };

    let mut index = start_index as isize;
    while index != stop_index as isize {
        let neighbor = &scheme[index as usize];
        if !target.swappable(neighbor) {
            break;
        }

        index += step;
    }

    (index - step) as N
}

/// Commute a gate step by step to its new position, mutating inversion
/// masks along the way where the swap rule demands it.
fn move_element(scheme: &mut OptScheme, from_index: N, to_index: N) -> Result<()> {
    let mut from = from_index as isize;
    let to = to_index as isize;
    let step: isize = if to < from { -1 } else { 1 };

    while from != to {
        let next = from + step;

        let mut moving = scheme[from as usize];
        let mut neighbor = scheme[next as usize];

        if !Gate::swap(&mut moving, &mut neighbor) {
            return Err(Error::Precondition(
                "attempt to commute non-commuting gates".to_string(),
            ));
        }

        scheme[from as usize] = moving;
        scheme[next as usize] = neighbor;

        from = next;
    }

    Ok(())
}

fn full_scheme(scheme: &OptScheme, kind: ExpansionKind) -> OptScheme {
    let mut full = OptScheme::new();

    for gate in scheme {
        let implementation = match kind {
            ExpansionKind::Simple => gate.simple_implementation(),
            ExpansionKind::Recursive => gate.recursive_implementation(),
        };

        full.extend(implementation);
    }

    full
}
