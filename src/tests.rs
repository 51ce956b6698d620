use std::io;

use crate::{
    config::{Config, PushPolicy},
    math::Word,
    prelude::*,
    synthesis::{synthesize, GtGeneratorWithMemory},
    table::{self, extend},
};

fn synthesize_default(table: &table::TruthTable) -> Scheme {
    synthesize(table, &Config::default(), &mut io::sink()).unwrap()
}

#[test]
fn not_on_line_0() {
    let scheme = synthesize_default(&vec![1, 0]);

    assert_eq!(scheme.len(), 1);
    assert_eq!(scheme[0], Gate::not(1, 1));
}

#[test]
fn single_cnot() {
    let table = vec![0, 1, 3, 2];
    let scheme = synthesize_default(&table);

    assert_eq!(scheme.len(), 1);
    assert!(scheme.realizes(&table));
}

#[test]
fn single_toffoli() {
    let table = vec![0, 1, 2, 3, 4, 5, 7, 6];
    let scheme = synthesize_default(&table);

    assert_eq!(scheme.len(), 1);
    assert!(scheme.realizes(&table));
}

#[test]
fn swap_of_two_values() {
    // swap 5 <-> 13, all other inputs fixed
    let mut table: table::TruthTable = (0..16).collect();
    table[5] = 13;
    table[13] = 5;

    let mut config = Config::default();
    config.rm_weight_threshold = Some(4);

    let scheme = synthesize(&table, &config, &mut io::sink()).unwrap();

    assert!(scheme.realizes(&table));
    assert!(scheme.len() <= 3, "got {} gates", scheme.len());
}

#[test]
fn boolean_edge_exploitation() {
    // swapped pairs (x, x ^ 1) on the whole half-cube bit3 = 0: one edge
    // of capacity 8 instead of four independent swaps
    let mut table: table::TruthTable = (0..16).collect();
    for x in (0..8).step_by(2) {
        table[x] = (x + 1) as Word;
        table[x + 1] = x as Word;
    }

    let scheme = synthesize_default(&table);

    assert!(scheme.realizes(&table));
    assert!(scheme.len() <= 3, "got {} gates", scheme.len());
}

#[test]
fn odd_permutation_completion() {
    // 2-cycle on a 3-line table has odd parity; the synthesizer widens
    // the circuit and still realizes the table on the original inputs
    let mut table: table::TruthTable = (0..8).collect();
    table[2] = 6;
    table[6] = 2;

    let scheme = synthesize_default(&table);

    assert!(!scheme.is_empty());
    for (x, &y) in table.iter().enumerate() {
        assert_eq!(scheme.apply(x as Word), y);
    }
}

#[test]
fn identity_stays_empty() {
    assert!(synthesize_default(&(0..32).collect()).is_empty());
    assert!(synthesize_default(&vec![]).is_empty());
}

#[test]
fn end_to_end_table_reconstruction() {
    let table = vec![6, 2, 0, 7, 5, 1, 3, 4];
    let scheme = synthesize_default(&table);

    let reconstructed: table::TruthTable =
        (0..8).map(|x| scheme.apply(x as Word)).collect();

    assert_eq!(reconstructed, table);
}

#[test]
fn every_push_policy_is_correct() {
    let table = vec![7, 0, 5, 2, 1, 6, 3, 4];

    let policies = [
        PushPolicy::Default,
        PushPolicy::ForceLeft,
        PushPolicy::ForceRight,
        PushPolicy::AutoHammingDistance,
        PushPolicy::AutoRmCostReduction,
    ];

    for policy in policies {
        let mut config = Config::default();
        config.push_policy = policy;

        let scheme = synthesize(&table, &config, &mut io::sink()).unwrap();
        assert!(scheme.realizes(&table), "push policy {:?}", policy);
    }
}

#[test]
fn synthesis_is_deterministic() {
    let table = table::hwb(4);

    let first = synthesize_default(&table);
    let second = synthesize_default(&table);

    assert_eq!(first, second);
}

#[test]
fn hwb_synthesis() {
    for n in 3..6 {
        let table = table::hwb(n);
        let scheme = synthesize_default(&table);

        assert!(scheme.realizes(&table), "hwb({})", n);
    }
}

#[test]
fn synthesized_scheme_through_tfc() {
    let table = vec![3, 1, 0, 2, 7, 5, 4, 6];
    let scheme = synthesize_default(&table);

    let mut formatter = TfcFormatter::new();
    let mut text = Vec::new();
    formatter.format(&mut text, &scheme).unwrap();

    let mut reparser = TfcFormatter::new();
    let reparsed = reparser.parse(text.as_slice()).unwrap();

    assert_eq!(scheme, reparsed);
    assert!(reparsed.realizes(&table));
}

#[test]
fn partial_function_through_extension() {
    // AND gate: extended to a bijection, synthesized and read back on
    // the placed output line
    let config = Config::default();
    let original = vec![0, 0, 0, 1];

    let (extended, order) = extend::optimize_hamming_distance(&original, 2, 1, &config);
    let scheme = synthesize(&extended, &config, &mut io::sink()).unwrap();

    let out_line = order[&0];
    for (x, &y) in original.iter().enumerate() {
        let image = scheme.apply(x as Word);
        assert_eq!((image >> out_line) & 1, y, "input {}", x);
    }
}

#[test]
fn memory_generator_against_composite() {
    // the same partial function through the ancilla route
    let table = vec![1, 0, 0, 1];

    let config = Config::default();
    let scheme = GtGeneratorWithMemory::new(&config).generate(&table).unwrap();

    assert!(GtGeneratorWithMemory::check_scheme_validity(
        &scheme, 2, 1, &table
    ));
}

#[test]
fn quantum_cost_reported_on_log() {
    let table = vec![0, 1, 2, 3, 4, 5, 7, 6];

    let mut log = Vec::new();
    let scheme = synthesize(&table, &Config::default(), &mut log).unwrap();

    let log = String::from_utf8(log).unwrap();

    assert!(scheme.realizes(&table));
    assert!(log.contains("Complexity after optimization"));
    assert!(log.contains("Quantum cost"));
}
