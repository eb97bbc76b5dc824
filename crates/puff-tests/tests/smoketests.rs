use puff::{
    error::BuildError,
    grammar::{Grammar, GrammarDef},
    honalee, lalr,
    table::NullReporter,
};
use puff_tests::grammars;

type GrammarFn = fn(&mut GrammarDef<'_>) -> Result<(), BuildError>;

const ALL_GRAMMARS: [GrammarFn; 6] = [
    grammars::g_sum,
    grammars::g_arith,
    grammars::g_simple1,
    grammars::g_list,
    grammars::g_non_lalr,
    grammars::g_dangling_else,
];

fn smoketest_grammar(f: GrammarFn) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let grammar = Grammar::define(f).unwrap();
    eprintln!("grammar:\n{}", grammar);

    let table = lalr::make_lalr_table(&grammar, &mut NullReporter).unwrap();
    eprintln!("LALR(1) table:\n{}", table.display(&grammar));

    let table = honalee::make_lr1_table(&grammar, &mut NullReporter).unwrap();
    eprintln!("LR(1) table:\n{}", table.display(&grammar));
}

#[test]
fn smoketest_g_sum() {
    smoketest_grammar(grammars::g_sum);
}

#[test]
fn smoketest_g_arith() {
    smoketest_grammar(grammars::g_arith);
}

#[test]
fn smoketest_g_simple1() {
    smoketest_grammar(grammars::g_simple1);
}

#[test]
fn smoketest_g_list() {
    smoketest_grammar(grammars::g_list);
}

#[test]
fn smoketest_g_non_lalr() {
    smoketest_grammar(grammars::g_non_lalr);
}

#[test]
fn smoketest_g_dangling_else() {
    smoketest_grammar(grammars::g_dangling_else);
}

/// Two builds of the same grammar render the same table, byte for byte.
#[test]
fn tables_are_deterministic() {
    for f in ALL_GRAMMARS {
        let g1 = Grammar::define(f).unwrap();
        let g2 = Grammar::define(f).unwrap();

        let t1 = lalr::make_lalr_table(&g1, &mut NullReporter).unwrap();
        let t2 = lalr::make_lalr_table(&g2, &mut NullReporter).unwrap();
        assert_eq!(
            t1.display(&g1).to_string(),
            t2.display(&g2).to_string(),
            "LALR construction is not deterministic"
        );

        let t1 = honalee::make_lr1_table(&g1, &mut NullReporter).unwrap();
        let t2 = honalee::make_lr1_table(&g2, &mut NullReporter).unwrap();
        assert_eq!(
            t1.display(&g1).to_string(),
            t2.display(&g2).to_string(),
            "LR(1) construction is not deterministic"
        );
    }
}
