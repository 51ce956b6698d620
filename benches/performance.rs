use criterion::*;
use revsynth::{prelude::*, table};

fn synthesis_test(n: usize) {
    let truth_table = table::hwb(n);

    let scheme = synthesize(&truth_table, &Config::default(), &mut std::io::sink()).unwrap();
    assert!(scheme.realizes(&truth_table));
}

fn performance(c: &mut Criterion) {
    for line_count in [3, 4, 5] {
        c.bench_function(
            format!("synthesize_hwb{}", line_count).as_str(),
            |b| b.iter(|| synthesis_test(black_box(line_count))),
        );
    }
}

criterion_group!(benches, performance);
criterion_main!(benches);
