//! Calculation of the nullable, FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Set},
};

/// The FIRST sets of a grammar, together with the set of nullable
/// nonterminals.
#[derive(Debug)]
pub struct FirstSets {
    nullables: Set<NonterminalID>,
    first: Map<SymbolID, TerminalSet>,
}

impl FirstSets {
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar) -> Self {
        let nullables = nullables_set(grammar);
        let first = first_sets(grammar, &nullables);
        Self { nullables, first }
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(..) => false,
            SymbolID::N(n) => self.nullables.contains(&n),
        }
    }

    pub fn nullables(&self) -> impl Iterator<Item = NonterminalID> + '_ {
        self.nullables.iter().copied()
    }

    /// `FIRST(X)` for a single symbol.
    pub fn first(&self, symbol: SymbolID) -> &TerminalSet {
        &self.first[&symbol]
    }

    /// `FIRST(Y1 Y2 ... Yk)` of a symbol string.
    ///
    /// Accumulates `FIRST(Yi)` across the nullable prefix and stops at the
    /// first non-nullable symbol. The boolean is true iff the whole string
    /// derives ε; the caller decides what to substitute for ε (typically
    /// the lookahead following the string).
    pub fn first_of_seq(&self, symbols: &[SymbolID]) -> (TerminalSet, bool) {
        let mut set = TerminalSet::default();
        for symbol in symbols {
            set.union_with(&self.first[symbol]);
            if !self.is_nullable(*symbol) {
                return (set, false);
            }
        }
        (set, true)
    }
}

/// Calculate the set of nullable nonterminals in this grammar.
fn nullables_set(grammar: &Grammar) -> Set<NonterminalID> {
    let mut nullables: Set<NonterminalID> = grammar
        .rules()
        .filter_map(|rule| rule.right().is_empty().then_some(rule.left()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules() {
            if nullables.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule.right().iter().all(|s| match s {
                SymbolID::T(..) => false,
                SymbolID::N(n) => nullables.contains(n),
            });
            if is_rhs_nullable {
                changed = true;
                nullables.insert(rule.left());
            }
        }
    }

    nullables
}

fn first_sets(grammar: &Grammar, nullables: &Set<NonterminalID>) -> Map<SymbolID, TerminalSet> {
    let mut map: Map<SymbolID, TerminalSet> = Map::default();

    // FIRST(T) = {T} for terminal symbols, FIRST(N) starts empty.
    for terminal in grammar.terminals() {
        map.insert(
            SymbolID::T(terminal.id()),
            Some(terminal.id()).into_iter().collect(),
        );
    }
    for nonterminal in grammar.nonterminals() {
        map.insert(SymbolID::N(nonterminal.id()), TerminalSet::default());
    }

    // For X := Y1 Y2 ... Yk, FIRST(X) accumulates FIRST(Yi) over the
    // nullable prefix. Iterate until no set grows.
    let mut changed = true;
    while changed {
        changed = false;

        for rule in grammar.rules() {
            let left = SymbolID::N(rule.left());
            for symbol in rule.right() {
                if *symbol != left {
                    let added = map[symbol].clone();
                    let target = map.get_mut(&left).expect("symbol missing from FIRST table");
                    let before = target.len();
                    target.union_with(&added);
                    changed |= target.len() != before;
                }
                let nullable = match symbol {
                    SymbolID::T(..) => false,
                    SymbolID::N(n) => nullables.contains(n),
                };
                if !nullable {
                    break;
                }
            }
        }
    }

    map
}

/// The FOLLOW sets of a grammar.
#[derive(Debug)]
pub struct FollowSets {
    follow: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar, first: &FirstSets) -> Self {
        let mut follow: Map<NonterminalID, TerminalSet> = Map::default();
        for nonterminal in grammar.nonterminals() {
            follow.insert(nonterminal.id(), TerminalSet::default());
        }

        // $ follows the root.
        follow
            .get_mut(&grammar.root_rule().left())
            .expect("root nonterminal missing from FOLLOW table")
            .insert(TerminalID::EOI);

        let mut changed = true;
        while changed {
            changed = false;

            for rule in grammar.rules() {
                let right = rule.right();
                for (i, symbol) in right.iter().enumerate() {
                    let SymbolID::N(n) = symbol else { continue };

                    // FOLLOW(Yi) ⊇ FIRST(Y(i+1) ... Yk), and additionally
                    // FOLLOW(Yi) ⊇ FOLLOW(X) when the suffix is nullable.
                    let (rest_first, rest_nullable) = first.first_of_seq(&right[i + 1..]);
                    let from_left = if rest_nullable && rule.left() != *n {
                        Some(follow[&rule.left()].clone())
                    } else {
                        None
                    };

                    let target = follow.get_mut(n).expect("nonterminal missing from FOLLOW table");
                    let before = target.len();
                    target.union_with(&rest_first);
                    if let Some(from_left) = from_left {
                        target.union_with(&from_left);
                    }
                    changed |= target.len() != before;
                }
            }
        }

        Self { follow }
    }

    pub fn get(&self, n: NonterminalID) -> &TerminalSet {
        &self.follow[&n]
    }
}
