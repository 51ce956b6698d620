//! Synthesis configuration.
//!
//! A read-only [`Config`] value is injected into every generator; nothing
//! in the core reads global state. The CLI builds one from an INI file
//! via [`Config::from_values`].

use crate::math::N;

pub use self::values::{Error, IniValues, Result};

mod values;

/// Where the Reed–Muller driver pushes an alien-row correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushPolicy {
    /// Push into both residual tables; the composite keeps the side that
    /// synthesized shorter.
    Default,
    ForceLeft,
    ForceRight,
    /// Push to the side with the smaller conjugated Hamming distance.
    AutoHammingDistance,
    /// Push to the side whose residual spectrum grows the least.
    AutoRmCostReduction,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Spectrum rows with index weight at or above this go to the GT
    /// driver; `None` selects min(n, ⌈log2(2 · pack_size)⌉).
    pub rm_weight_threshold: Option<N>,
    /// Cap on independent-transposition packs.
    pub pack_size: N,
    pub push_policy: PushPolicy,

    pub do_post_optimization: bool,
    /// Maximum index distance between rewrite candidates.
    pub max_optimization_distance: N,
    /// Window size for the optimizer's sub-scheme passes.
    pub max_sub_scheme_size: N,
    /// Run the expansion passes over the inversion-free forms.
    pub full_scheme_passes: bool,
    pub remove_negative_controls: bool,
    /// Use the non-local swap-results pair search.
    pub use_swap_results: bool,

    /// Require exact edges during GT partial-result search.
    pub gt_explicit_edges: bool,
    /// Require exact edges in the with-memory generator.
    pub memory_explicit_edges: bool,
    pub compare_results_on_edge_search: bool,
    pub pack_reverse_order: bool,

    /// Keep the output variable order of square tables untouched.
    pub keep_output_variables_order: bool,
    pub output_order_by_hamming_only: bool,
    pub pick_output_by_hamming_only: bool,
    /// Complete extended tables to an even permutation.
    pub complete_to_even_on_extension: bool,
    /// Sort output variables in TFC output, emitting swap gates.
    pub sort_output_variables_order: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rm_weight_threshold: None,
            pack_size: 4,
            push_policy: PushPolicy::Default,

            do_post_optimization: true,
            max_optimization_distance: 20,
            max_sub_scheme_size: 100,
            full_scheme_passes: true,
            remove_negative_controls: false,
            use_swap_results: false,

            gt_explicit_edges: false,
            memory_explicit_edges: true,
            compare_results_on_edge_search: false,
            pack_reverse_order: true,

            keep_output_variables_order: false,
            output_order_by_hamming_only: false,
            pick_output_by_hamming_only: false,
            complete_to_even_on_extension: false,
            sort_output_variables_order: false,
        }
    }
}

impl Config {
    /// Build a configuration from parsed INI values; unknown keys are
    /// ignored, tuning keys take effect only under `enable-tuning`.
    pub fn from_values(values: &IniValues) -> Result<Self> {
        let mut config = Self::default();

        let threshold = values.get_int("rm-generator-weight-threshold", -1)?;
        config.rm_weight_threshold = if threshold < 0 {
            None
        } else {
            Some(threshold as N)
        };

        let pack_size = values.get_int("transpositions-pack-size", config.pack_size as isize)?;
        config.pack_size = pack_size.max(1) as N;

        config.do_post_optimization =
            values.get_bool("do-post-optimization", config.do_post_optimization)?;

        config.max_optimization_distance = values.get_int(
            "max-elements-distance-for-optimization",
            config.max_optimization_distance as isize,
        )? as N;

        config.max_sub_scheme_size = values.get_int(
            "max-sub-scheme-size-for-optimization",
            config.max_sub_scheme_size as isize,
        )? as N;

        config.full_scheme_passes = values.get_bool(
            "do-last-optimizations-with-full-scheme",
            config.full_scheme_passes,
        )?;

        config.remove_negative_controls = values.get_bool(
            "remove-negative-control-inputs",
            config.remove_negative_controls,
        )?;

        config.use_swap_results = values.get_bool(
            "use-swap-results-optimization-technique",
            config.use_swap_results,
        )?;

        if values.get_bool("enable-tuning", false)? {
            config.push_policy = Self::push_policy_from_values(values)?;

            config.gt_explicit_edges =
                values.get_bool("explicit-edges-only", config.gt_explicit_edges)?;

            config.memory_explicit_edges = values.get_bool(
                "memory-explicit-edges-only",
                config.memory_explicit_edges,
            )?;

            config.compare_results_on_edge_search = values.get_bool(
                "compare-results-on-edge-search",
                config.compare_results_on_edge_search,
            )?;

            config.pack_reverse_order = values.get_bool(
                "transpositions-pack-in-reverse-order",
                config.pack_reverse_order,
            )?;

            config.keep_output_variables_order = values.get_bool(
                "do-not-alter-output-variables-order",
                config.keep_output_variables_order,
            )?;

            config.output_order_by_hamming_only = values.get_bool(
                "choose-output-order-only-by-hamming-distance",
                config.output_order_by_hamming_only,
            )?;

            config.pick_output_by_hamming_only = values.get_bool(
                "pick-up-best-output-only-by-hamming-distance",
                config.pick_output_by_hamming_only,
            )?;

            config.complete_to_even_on_extension = values.get_bool(
                "complete-permutation-to-even",
                config.complete_to_even_on_extension,
            )?;

            config.sort_output_variables_order = values.get_bool(
                "sort-output-variables-order",
                config.sort_output_variables_order,
            )?;
        }

        Ok(config)
    }

    fn push_policy_from_values(values: &IniValues) -> Result<PushPolicy> {
        let force_left = values.get_bool("push-policy-force-left", false)?;
        let force_right = values.get_bool("push-policy-force-right", false)?;
        let auto_hamming = values.get_bool("push-policy-auto-mode-min-hamming-distance", false)?;
        let auto_rm_cost =
            values.get_bool("push-policy-auto-mode-max-rm-cost-reduction", false)?;

        let enabled = [force_left, force_right, auto_hamming, auto_rm_cost]
            .iter()
            .filter(|&&flag| flag)
            .count();

        if enabled > 1 {
            return Err(Error::InvalidValue(
                "push-policy".to_string(),
                "mutually exclusive push policies are enabled".to_string(),
            ));
        }

        Ok(if force_left {
            PushPolicy::ForceLeft
        } else if force_right {
            PushPolicy::ForceRight
        } else if auto_hamming {
            PushPolicy::AutoHammingDistance
        } else if auto_rm_cost {
            PushPolicy::AutoRmCostReduction
        } else {
            PushPolicy::Default
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.push_policy, PushPolicy::Default);
        assert!(config.do_post_optimization);
        assert_eq!(config.rm_weight_threshold, None);
    }

    #[test]
    fn from_ini_values() {
        let source = "\
            rm-generator-weight-threshold = 3\n\
            transpositions-pack-size = 8\n\
            do-post-optimization = false\n\
            enable-tuning = true\n\
            push-policy-force-left = true\n";

        let values = IniValues::parse(source.as_bytes()).unwrap();
        let config = Config::from_values(&values).unwrap();

        assert_eq!(config.rm_weight_threshold, Some(3));
        assert_eq!(config.pack_size, 8);
        assert!(!config.do_post_optimization);
        assert_eq!(config.push_policy, PushPolicy::ForceLeft);
    }

    #[test]
    fn conflicting_push_policies() {
        let source = "\
            enable-tuning = true\n\
            push-policy-force-left = true\n\
            push-policy-force-right = true\n";

        let values = IniValues::parse(source.as_bytes()).unwrap();
        assert!(Config::from_values(&values).is_err());
    }

    #[test]
    fn tuning_keys_require_enable_tuning() {
        let source = "push-policy-force-left = true\n";

        let values = IniValues::parse(source.as_bytes()).unwrap();
        let config = Config::from_values(&values).unwrap();

        assert_eq!(config.push_policy, PushPolicy::Default);
    }
}
