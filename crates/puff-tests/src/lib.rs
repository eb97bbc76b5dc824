//! Shared fixtures for the integration tests and benches.

pub mod grammars;

use puff::{
    lr0::CoreSet,
    table::{Action, ParsingTable, StateID},
};
use std::collections::BTreeMap;

/// Check that two tables for the same grammar are the same automaton up to
/// state numbering, matching states by their kernel core sets.
pub fn check_isomorphic(a: &ParsingTable, b: &ParsingTable) -> Result<(), String> {
    if a.states().len() != b.states().len() {
        return Err(format!(
            "state counts differ: {} vs {}",
            a.states().len(),
            b.states().len()
        ));
    }

    let index = |t: &ParsingTable| -> BTreeMap<CoreSet, StateID> {
        t.states().iter().map(|s| (s.kernel.clone(), s.id)).collect()
    };
    let ia = index(a);
    let ib = index(b);
    if ia.len() != a.states().len() || ib.len() != b.states().len() {
        return Err("kernel signatures are not unique".into());
    }

    let kernel_of = |t: &ParsingTable, id: StateID| t.state(id).kernel.clone();
    if kernel_of(a, a.first_state()) != kernel_of(b, b.first_state()) {
        return Err("initial states differ".into());
    }

    for (kernel, &sa) in &ia {
        let Some(&sb) = ib.get(kernel) else {
            return Err("kernel present in one table only".into());
        };
        let sa = a.state(sa);
        let sb = b.state(sb);

        let mut tokens: Vec<_> = sa.actions.keys().copied().collect();
        tokens.extend(sb.actions.keys().copied());
        tokens.sort();
        tokens.dedup();
        for token in tokens {
            match (sa.action(token), sb.action(token)) {
                (Action::Shift { next: na, .. }, Action::Shift { next: nb, .. }) => {
                    if kernel_of(a, na) != kernel_of(b, nb) {
                        return Err(format!("shift targets diverge on {:?}", token));
                    }
                }
                (Action::Reduce { rule: ra }, Action::Reduce { rule: rb }) if ra == rb => {}
                (Action::Accept, Action::Accept) => {}
                (Action::Error, Action::Error) => {}
                (la, lb) => {
                    return Err(format!(
                        "actions diverge on {:?}: {:?} vs {:?}",
                        token, la, lb
                    ));
                }
            }
        }

        let mut symbols: Vec<_> = sa.gotos.keys().copied().collect();
        symbols.extend(sb.gotos.keys().copied());
        symbols.sort();
        symbols.dedup();
        for symbol in symbols {
            match (sa.goto(symbol), sb.goto(symbol)) {
                (Some(na), Some(nb)) => {
                    if kernel_of(a, na) != kernel_of(b, nb) {
                        return Err(format!("goto targets diverge on {:?}", symbol));
                    }
                }
                (None, None) => {}
                _ => return Err(format!("goto entries diverge on {:?}", symbol)),
            }
        }
    }

    Ok(())
}
