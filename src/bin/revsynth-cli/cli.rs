const KEYS_HELP: &str = "\
General options (INI file):
    work-mode = < general-synthesis | post-processing | memory-synthesis | random-check >
    truth-table-input = <filename>
    tfc-input = <filename>
    results-file = <filename>
    schemes-folder = <foldername>
    rm-generator-weight-threshold = <number>
    transpositions-pack-size = <number>

Optimization options:
    do-post-optimization = <bool>
    max-elements-distance-for-optimization = <number>
    max-sub-scheme-size-for-optimization = <number>
    do-last-optimizations-with-full-scheme = <bool>
    remove-negative-control-inputs = <bool>
    use-swap-results-optimization-technique = <bool>

Tuning options (require enable-tuning = true):
    enable-tuning = <bool>
    do-not-alter-output-variables-order = <bool>
    choose-output-order-only-by-hamming-distance = <bool>
    pick-up-best-output-only-by-hamming-distance = <bool>
    complete-permutation-to-even = <bool>
    explicit-edges-only = <bool>
    memory-explicit-edges-only = <bool>
    compare-results-on-edge-search = <bool>
    transpositions-pack-in-reverse-order = <bool>
    sort-output-variables-order = <bool>
    push-policy-force-left = <bool>
    push-policy-force-right = <bool>
    push-policy-auto-mode-min-hamming-distance = <bool>
    push-policy-auto-mode-max-rm-cost-reduction = <bool>

Diagnostics:
    random-check-count = <number>
    random-check-lines = <number>";

#[derive(clap::Parser, Debug)]
#[clap(
    name = "REVSYNTH",
    version,
    about = "Reversible logic circuit synthesizer",
    after_help = KEYS_HELP
)]
pub struct CliArgs {
    #[clap(help = "INI configuration file; default options are used when omitted")]
    pub config: Option<String>,
}

impl CliArgs {
    pub fn new() -> Self {
        <Self as clap::Parser>::parse()
    }
}
