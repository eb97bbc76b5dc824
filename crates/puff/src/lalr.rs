//! LALR(1) table construction.
//!
//! The construction runs over the LR(0) collection and determines the
//! lookahead sets of the kernel items afterwards: closing a kernel item
//! under a placeholder lookahead reveals, per goto edge, whether a
//! lookahead arises at the target spontaneously or must be copied forward
//! from the source item. The propagation graph is then saturated to a
//! fixed point and each state is re-closed with its resolved lookaheads
//! before the actions are emitted.

use crate::{
    error::BuildError,
    first_sets::FirstSets,
    grammar::{check_reachable, Grammar, RuleID, SymbolID, TerminalID, TerminalSet},
    lr0::{self, Core, CoreSet},
    lr1::{self, Item, ItemSet},
    table::{insert_action, Action, ConflictReporter, ParsingTable, StateID},
    types::{Map, Set},
};

#[derive(Debug)]
struct StateAux {
    cores: CoreSet,
    kernel: CoreSet,
    // kernel core -> lookaheads known so far (spontaneous, then propagated)
    generate: Map<Core, TerminalSet>,
    // kernel core -> kernel items its lookaheads flow to
    propagate: Map<Core, Set<(StateID, Core)>>,
    // goto over every grammar symbol; terminal edges become shift actions
    transitions: Map<SymbolID, StateID>,
}

/// Build the LALR(1) parsing table for the grammar.
///
/// Conflicts are resolved by the fixed policy of [`crate::table`] and
/// surfaced through `reporter`; only structural grammar errors fail.
#[tracing::instrument(skip_all)]
pub fn make_lalr_table<R>(g: &Grammar, reporter: &mut R) -> Result<ParsingTable, BuildError>
where
    R: ConflictReporter + ?Sized,
{
    check_reachable(g)?;
    let first = FirstSets::new(g);

    let mut table = ParsingTable::new();
    for rule in g.rules() {
        table.add_rule(rule.clone());
    }

    // The LR(0) collection compressed to kernels. States sharing an LR(0)
    // kernel are merged here, before any lookahead exists.
    let collection = lr0::collection(g);
    let mut aux: Vec<StateAux> = Vec::with_capacity(collection.len());
    let mut kernels: Map<CoreSet, StateID> = Map::default();
    for cores in collection {
        let kernel = lr0::kernel_of(&cores);
        let id = table.add_state(kernel.clone(), ItemSet::new());
        kernels.insert(kernel.clone(), id);

        let mut generate: Map<Core, TerminalSet> = Map::default();
        if kernel.contains(&Core::ROOT) {
            table.set_first_state(id);
            generate
                .entry(Core::ROOT)
                .or_default()
                .insert(TerminalID::EOI);
        }

        aux.push(StateAux {
            cores,
            kernel,
            generate,
            propagate: Map::default(),
            transitions: Map::default(),
        });
    }

    for i in 0..aux.len() {
        for symbol in g.symbols() {
            let next = lr0::goto(&aux[i].cores, symbol, g);
            if next.is_empty() {
                continue;
            }
            let next_kernel = lr0::kernel_of(&next);
            let Some(&to) = kernels.get(&next_kernel) else {
                continue;
            };
            aux[i].transitions.insert(symbol, to);
        }
    }

    // Lookahead determination. Closing `{(k, #)}` with the placeholder
    // lookahead `#`: a closure item that still carries `#` stands for
    // whatever lookaheads k will have (propagation), any real terminal was
    // generated by the closure itself (spontaneous).
    let mut spontaneous: Vec<(StateID, Core, TerminalID)> = vec![];
    let mut edges: Vec<(usize, Core, StateID, Core)> = vec![];
    for (i, s) in aux.iter().enumerate() {
        for &k in &s.kernel {
            let mut probe = ItemSet::new();
            probe.insert(Item {
                core: k,
                lookahead: TerminalID::DUMMY,
            });
            lr1::closure(&mut probe, &first, g);

            for j in &probe {
                let Some(x) = j.core.next_symbol(g) else {
                    continue;
                };
                let Some(&to) = s.transitions.get(&x) else {
                    continue;
                };
                let advanced = j.core.advanced();
                if !aux[to.index()].kernel.contains(&advanced) {
                    continue;
                }
                if j.lookahead == TerminalID::DUMMY {
                    edges.push((i, k, to, advanced));
                } else {
                    spontaneous.push((to, advanced, j.lookahead));
                }
            }
        }
    }
    for (to, core, lookahead) in spontaneous {
        aux[to.index()]
            .generate
            .entry(core)
            .or_default()
            .insert(lookahead);
    }
    for (from, core, to, target) in edges {
        aux[from]
            .propagate
            .entry(core)
            .or_default()
            .insert((to, target));
    }

    // Saturate: union every kernel item's lookaheads into the items it
    // propagates to, until no set grows.
    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..aux.len() {
            let kernel: Vec<Core> = aux[i].kernel.iter().copied().collect();
            for k in kernel {
                let Some(lookaheads) = aux[i].generate.get(&k).cloned() else {
                    continue;
                };
                if lookaheads.is_empty() {
                    continue;
                }
                let Some(targets) = aux[i].propagate.get(&k).cloned() else {
                    continue;
                };
                for (to, target) in targets {
                    let slot = aux[to.index()].generate.entry(target).or_default();
                    let before = slot.len();
                    slot.union_with(&lookaheads);
                    changed |= slot.len() != before;
                }
            }
        }
    }

    // Rebuild each state's full LR(1) item set from its kernels and the
    // resolved lookaheads.
    for (i, s) in aux.iter().enumerate() {
        let mut items = ItemSet::new();
        for (&core, lookaheads) in &s.generate {
            for lookahead in lookaheads.iter() {
                items.insert(Item { core, lookahead });
            }
        }
        lr1::closure(&mut items, &first, g);
        table.state_mut(StateID::new(i as u32)).items = items;
    }

    // Emission. Shifts first so the conflict policy sees them, then the
    // completed items, then the nonterminal goto edges. Terminal edges stay
    // out of the goto table.
    for (i, s) in aux.iter().enumerate() {
        let id = StateID::new(i as u32);
        let items = table.state(id).items.clone();

        for item in &items {
            let Some(SymbolID::T(t)) = item.core.next_symbol(g) else {
                continue;
            };
            let Some(&next) = s.transitions.get(&SymbolID::T(t)) else {
                continue;
            };
            insert_action(
                table.state_mut(id),
                t,
                Action::Shift {
                    next,
                    origin: item.core.rule,
                },
                g,
                reporter,
            );
        }

        for item in &items {
            if !item.core.is_complete(g) {
                continue;
            }
            if item.core.rule == RuleID::ACCEPT {
                insert_action(table.state_mut(id), TerminalID::EOI, Action::Accept, g, reporter);
            } else {
                insert_action(
                    table.state_mut(id),
                    item.lookahead,
                    Action::Reduce {
                        rule: item.core.rule,
                    },
                    g,
                    reporter,
                );
            }
        }

        let state = table.state_mut(id);
        for (&symbol, &to) in &s.transitions {
            if let SymbolID::N(n) = symbol {
                state.gotos.insert(n, to);
            }
        }
        state.handle_error = state.actions.contains_key(&TerminalID::ERROR);
    }

    tracing::debug!("LALR(1) table: {} states", table.states().len());
    Ok(table)
}
