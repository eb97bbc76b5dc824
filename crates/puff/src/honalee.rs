//! Incremental LR(1) table construction.
//!
//! Unlike the LALR(1) path, states are built lazily and merged eagerly:
//! a freshly closed state is folded into any existing state with the same
//! kernel cores, unless the merge would manufacture a reduce/reduce
//! conflict — in that case both states stay separate and the table grows
//! instead. Merging can add shift items to a state whose transitions were
//! already computed; such a state is re-opened and processed again, which
//! is how late-discovered lookahead distinctions travel backwards.

use crate::{
    error::BuildError,
    first_sets::FirstSets,
    grammar::{check_reachable, Grammar, RuleID, SymbolID, TerminalID},
    lr0::{Core, CoreSet},
    lr1::{self, Item, ItemSet},
    table::{insert_action, Action, ConflictReporter, ParsingTable, StateID},
    types::Map,
};
use std::collections::{BTreeMap, VecDeque};

/// Tuning knobs for the merge loop.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on processing rounds. Merging may re-open completed
    /// states, so the loop is not a simple pass over a finite worklist;
    /// the bound turns a runaway cascade into a reportable error instead
    /// of an endless build. Whether the merge loop terminates for every
    /// context-free grammar is an open question, so the bound stays.
    pub iteration_limit: usize,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            iteration_limit: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MarkAction {
    /// Not yet decided; shift targets are computed when the owning state
    /// is popped from the incomplete queue.
    Nil,
    Shift { symbol: SymbolID, target: usize },
    Reduce(RuleID),
}

#[derive(Debug, Copy, Clone)]
struct Mark {
    kernel: bool,
    action: MarkAction,
}

#[derive(Debug, Default)]
struct HState {
    items: BTreeMap<Item, Mark>,
    complete: bool,
}

impl HState {
    fn kernel_cores(&self) -> CoreSet {
        self.items
            .iter()
            .filter(|(_, mark)| mark.kernel)
            .map(|(item, _)| item.core)
            .collect()
    }
}

fn equal_core(arena: &[HState], x: usize, y: usize) -> bool {
    arena[x].kernel_cores() == arena[y].kernel_cores()
}

/// Two reduce marks on the same lookahead with different rules: merging the
/// states would bake in a reduce/reduce conflict the split avoided.
fn rr_conflict(arena: &[HState], x: usize, y: usize) -> Option<(RuleID, RuleID)> {
    for (x_item, x_mark) in &arena[x].items {
        let MarkAction::Reduce(x_rule) = x_mark.action else {
            continue;
        };
        for (y_item, y_mark) in &arena[y].items {
            let MarkAction::Reduce(y_rule) = y_mark.action else {
                continue;
            };
            if x_item.lookahead == y_item.lookahead && x_rule != y_rule {
                return Some((x_rule, y_rule));
            }
        }
    }
    None
}

/// Union `from`'s items into `into`. Returns whether anything was added and
/// whether any added item still expects a shift.
fn merge(arena: &mut [HState], into: usize, from: usize) -> (bool, bool) {
    let added: Vec<(Item, Mark)> = arena[from]
        .items
        .iter()
        .filter(|(item, _)| !arena[into].items.contains_key(item))
        .map(|(item, mark)| (*item, *mark))
        .collect();

    let mut added_items = false;
    let mut added_shift_items = false;
    for (item, mark) in added {
        added_items = true;
        if !matches!(mark.action, MarkAction::Reduce(..)) {
            added_shift_items = true;
        }
        arena[into].items.insert(item, mark);
    }
    (added_items, added_shift_items)
}

/// Build an LR(1) parsing table with the incremental merge construction.
pub fn make_lr1_table<R>(g: &Grammar, reporter: &mut R) -> Result<ParsingTable, BuildError>
where
    R: ConflictReporter + ?Sized,
{
    make_lr1_table_with_config(g, &Config::new(), reporter)
}

#[tracing::instrument(skip_all)]
pub fn make_lr1_table_with_config<R>(
    g: &Grammar,
    config: &Config,
    reporter: &mut R,
) -> Result<ParsingTable, BuildError>
where
    R: ConflictReporter + ?Sized,
{
    check_reachable(g)?;
    let first = FirstSets::new(g);

    let mut arena: Vec<HState> = vec![];
    let mut done: Vec<usize> = vec![];
    let mut incomplete: VecDeque<usize> = VecDeque::new();
    let mut todo: VecDeque<usize> = VecDeque::new();

    // `$start := . S / $` seeds the whole construction.
    let root = arena.len();
    arena.push(HState::default());
    arena[root].items.insert(
        Item {
            core: Core::ROOT,
            lookahead: TerminalID::EOI,
        },
        Mark {
            kernel: true,
            action: MarkAction::Nil,
        },
    );
    todo.push_back(root);

    let mut rounds = 0usize;
    while !incomplete.is_empty() || !todo.is_empty() {
        rounds += 1;
        if rounds > config.iteration_limit {
            return Err(BuildError::IterationLimit {
                limit: config.iteration_limit,
            });
        }

        // Phase 1: take one incomplete state and spawn the kernel of every
        // shift target, grouping the items by the symbol after the cursor.
        let mut come_from: Option<usize> = None;
        if let Some(s) = incomplete.pop_front() {
            come_from = Some(s);

            let pending: Vec<Item> = arena[s]
                .items
                .iter()
                .filter(|(item, mark)| {
                    mark.action == MarkAction::Nil && !item.core.is_complete(g)
                })
                .map(|(item, _)| *item)
                .collect();

            for item in pending {
                if arena[s].items[&item].action != MarkAction::Nil {
                    // Already claimed by an earlier group sharing its symbol.
                    continue;
                }
                let Some(symbol) = item.core.next_symbol(g) else {
                    continue;
                };

                let target = arena.len();
                arena.push(HState::default());

                let sharing: Vec<Item> = arena[s]
                    .items
                    .keys()
                    .filter(|other| other.core.next_symbol(g) == Some(symbol))
                    .copied()
                    .collect();
                for other in sharing {
                    arena[target].items.insert(
                        Item {
                            core: other.core.advanced(),
                            lookahead: other.lookahead,
                        },
                        Mark {
                            kernel: true,
                            action: MarkAction::Nil,
                        },
                    );
                    arena[s].items.get_mut(&other).expect("item just listed").action =
                        MarkAction::Shift { symbol, target };
                }

                todo.push_back(target);
            }

            arena[s].complete = true;
            done.push(s);
        }

        // Phase 2: close every spawned state and try to fold it into an
        // existing state with the same kernel cores.
        while let Some(s) = todo.pop_front() {
            let mut closed: ItemSet = arena[s].items.keys().copied().collect();
            lr1::closure(&mut closed, &first, g);

            for item in closed {
                let kernel = arena[s]
                    .items
                    .get(&item)
                    .map(|mark| mark.kernel)
                    .unwrap_or(false);
                let action = if item.core.is_complete(g) {
                    MarkAction::Reduce(item.core.rule)
                } else {
                    MarkAction::Nil
                };
                arena[s].items.insert(item, Mark { kernel, action });
            }

            let mut merged = false;
            let mut reopened: Option<usize> = None;
            let candidates: Vec<usize> = done.iter().chain(incomplete.iter()).copied().collect();
            for target in candidates {
                if !equal_core(&arena, s, target) {
                    continue;
                }
                if let Some((left, right)) = rr_conflict(&arena, s, target) {
                    // Keeping the states apart is the whole point of this
                    // construction; the skip is only worth a log line.
                    tracing::debug!(
                        "merge of isocore states skipped: would conflict {:?} vs {:?}",
                        left,
                        right
                    );
                    continue;
                }

                let (_, added_shift_items) = merge(&mut arena, target, s);

                // The popped state's shift marks still point at the
                // discarded set.
                if let Some(from) = come_from {
                    for mark in arena[from].items.values_mut() {
                        if let MarkAction::Shift { symbol, target: t } = mark.action {
                            if t == s {
                                mark.action = MarkAction::Shift { symbol, target };
                            }
                        }
                    }
                }

                if arena[target].complete && added_shift_items {
                    // New shift items invalidate the transitions computed
                    // earlier; send the state through phase 1 again.
                    for mark in arena[target].items.values_mut() {
                        if matches!(mark.action, MarkAction::Shift { .. }) {
                            mark.action = MarkAction::Nil;
                        }
                    }
                    arena[target].complete = false;
                    reopened = Some(target);
                    tracing::debug!("reopening completed state after merge");
                }

                merged = true;
                break;
            }

            if let Some(r) = reopened {
                done.retain(|&x| x != r);
                incomplete.push_back(r);
            }
            if !merged {
                incomplete.push_back(s);
            }
        }
    }

    // Emission: renumber the finished states and translate the marks into
    // table actions, with the same conflict policy as the LALR(1) path.
    let mut table = ParsingTable::new();
    for rule in g.rules() {
        table.add_rule(rule.clone());
    }

    let mut numbering: Map<usize, StateID> = Map::default();
    for &s in &done {
        let kernel = arena[s].kernel_cores();
        let items: ItemSet = arena[s].items.keys().copied().collect();
        let id = table.add_state(kernel.clone(), items);
        numbering.insert(s, id);
        if kernel.contains(&Core::ROOT) {
            table.set_first_state(id);
        }
    }

    for &s in &done {
        let id = numbering[&s];
        for (item, mark) in &arena[s].items {
            match mark.action {
                MarkAction::Shift {
                    symbol: SymbolID::T(t),
                    target,
                } => {
                    let next = numbering[&target];
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
                MarkAction::Shift {
                    symbol: SymbolID::N(n),
                    target,
                } => {
                    let next = numbering[&target];
                    table.state_mut(id).gotos.insert(n, next);
                }
                MarkAction::Reduce(rule) if rule == RuleID::ACCEPT => {
                    insert_action(table.state_mut(id), TerminalID::EOI, Action::Accept, g, reporter);
                }
                MarkAction::Reduce(rule) => {
                    insert_action(
                        table.state_mut(id),
                        item.lookahead,
                        Action::Reduce { rule },
                        g,
                        reporter,
                    );
                }
                MarkAction::Nil => {}
            }
        }
        let state = table.state_mut(id);
        state.handle_error = state.actions.contains_key(&TerminalID::ERROR);
    }

    tracing::debug!("LR(1) table: {} states", table.states().len());
    Ok(table)
}
