use criterion::{criterion_group, criterion_main, Criterion};
use puff::{
    error::BuildError,
    grammar::{Grammar, GrammarDef},
    honalee, lalr,
    table::NullReporter,
};
use puff_tests::grammars;

criterion_main!(benches);
criterion_group!(benches, bench_table_construction);

fn bench_table_construction(c: &mut Criterion) {
    bench_grammar(c, "g_sum", grammars::g_sum);
    bench_grammar(c, "g_arith", grammars::g_arith);
    bench_grammar(c, "g_simple1", grammars::g_simple1);
    bench_grammar(c, "g_non_lalr", grammars::g_non_lalr);
}

fn bench_grammar(
    c: &mut Criterion,
    name: &str,
    f: fn(&mut GrammarDef<'_>) -> Result<(), BuildError>,
) {
    let grammar = Grammar::define(f).unwrap();

    let mut group = c.benchmark_group(name);
    group.bench_function("LALR", |b| {
        b.iter(|| lalr::make_lalr_table(&grammar, &mut NullReporter).unwrap());
    });
    group.bench_function("LR1", |b| {
        b.iter(|| honalee::make_lr1_table(&grammar, &mut NullReporter).unwrap());
    });
    group.finish();
}
