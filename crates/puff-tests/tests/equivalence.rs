use puff::{
    error::BuildError,
    grammar::{Grammar, GrammarDef, Rule, RuleID},
    honalee, lalr,
    table::{Action, ConflictReporter, NullReporter},
};
use puff_tests::{check_isomorphic, grammars};

type GrammarFn = fn(&mut GrammarDef<'_>) -> Result<(), BuildError>;

#[derive(Default)]
struct Recording {
    shift_reduce: Vec<(RuleID, RuleID)>,
    reduce_reduce: Vec<(RuleID, RuleID)>,
}
impl ConflictReporter for Recording {
    fn shift_reduce(&mut self, shift: &Rule, reduce: &Rule) {
        self.shift_reduce.push((shift.id(), reduce.id()));
    }
    fn reduce_reduce(&mut self, left: &Rule, right: &Rule) {
        self.reduce_reduce.push((left.id(), right.id()));
    }
}

/// For genuinely LALR(1) grammars the two constructions describe the same
/// automaton, up to state numbering.
#[test]
fn lalr_and_lr1_tables_are_isomorphic_on_lalr_grammars() {
    let lalr_grammars: [GrammarFn; 4] = [
        grammars::g_sum,
        grammars::g_arith,
        grammars::g_simple1,
        grammars::g_list,
    ];
    for f in lalr_grammars {
        let g = Grammar::define(f).unwrap();

        let mut reporter = Recording::default();
        let a = lalr::make_lalr_table(&g, &mut reporter).unwrap();
        assert!(reporter.shift_reduce.is_empty() && reporter.reduce_reduce.is_empty());

        let b = honalee::make_lr1_table(&g, &mut NullReporter).unwrap();

        if let Err(msg) = check_isomorphic(&a, &b) {
            panic!("tables diverge: {}", msg);
        }
    }
}

/// The classical LALR-vs-LR(1) distinguishing grammar: merging the isocore
/// states manufactures a reduce/reduce conflict under LALR(1) while the
/// incremental construction keeps them apart and stays conflict-free.
#[test]
fn non_lalr_grammar_conflicts_only_under_lalr() {
    let g = Grammar::define(grammars::g_non_lalr).unwrap();

    let mut reporter = Recording::default();
    let lalr_table = lalr::make_lalr_table(&g, &mut reporter).unwrap();
    assert!(
        !reporter.reduce_reduce.is_empty(),
        "expected a reduce/reduce conflict under LALR(1)"
    );

    let mut reporter = Recording::default();
    let lr1_table = honalee::make_lr1_table(&g, &mut reporter).unwrap();
    assert!(reporter.shift_reduce.is_empty());
    assert!(reporter.reduce_reduce.is_empty());

    // The conflict-free table pays with extra states.
    assert!(lr1_table.states().len() > lalr_table.states().len());
}

/// In the merged LALR(1) state the tie-break picks the rule that appears
/// earlier in the grammar, on every conflicting lookahead.
#[test]
fn reduce_reduce_tiebreak_prefers_the_earlier_rule() {
    let g = Grammar::define(grammars::g_non_lalr).unwrap();
    let table = lalr::make_lalr_table(&g, &mut NullReporter).unwrap();

    // `AA := C` is declared before `BB := C`.
    let a_rule = g
        .rules()
        .find(|r| g.nonterminal(r.left()).name() == Some("AA"))
        .unwrap()
        .id();
    let b_rule = g
        .rules()
        .find(|r| g.nonterminal(r.left()).name() == Some("BB"))
        .unwrap()
        .id();
    assert!(a_rule < b_rule);

    let merged = table
        .states()
        .iter()
        .find(|s| {
            s.actions
                .values()
                .filter(|a| matches!(a, Action::Reduce { rule } if *rule == a_rule))
                .count()
                == 2
        })
        .expect("the merged state reduces by the earlier rule on both lookaheads");
    assert!(!merged
        .actions
        .values()
        .any(|a| matches!(a, Action::Reduce { rule } if *rule == b_rule)));
}
