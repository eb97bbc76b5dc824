//! LR(1) items: an LR(0) core paired with one lookahead terminal.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, SymbolID, TerminalID},
    lr0::Core,
    util::display_fn,
};
use std::{collections::BTreeSet, fmt};

/// An LR(1) item. Ordering is lexicographic on (core, lookahead).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub core: Core,
    pub lookahead: TerminalID,
}

impl Item {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} / ", self.core.display(g))?;
            if self.lookahead == TerminalID::DUMMY {
                f.write_str("#")
            } else {
                write!(f, "{}", g.terminal(self.lookahead))
            }
        })
    }
}

/// An ordered, duplicate-free set of LR(1) items.
pub type ItemSet = BTreeSet<Item>;

/// Expand an item set to a fixed point: for every `A := α . B β / a`, add
/// `B := . γ` with every lookahead in `FIRST(β a)`.
///
/// Only the items added by the previous round are rescanned, so each item
/// is inspected once per frontier pass.
pub fn closure(items: &mut ItemSet, first: &FirstSets, g: &Grammar) {
    let mut frontier: ItemSet = items.clone();

    loop {
        let mut added = ItemSet::new();

        for item in &frontier {
            let Some(SymbolID::N(n)) = item.core.next_symbol(g) else {
                continue;
            };

            let rule = g.rule(item.core.rule);
            let beta = &rule.right()[item.core.cursor as usize + 1..];
            let (lookaheads, beta_nullable) = first.first_of_seq(beta);

            for &next_rule in g.rules_for(n) {
                let core = Core {
                    rule: next_rule,
                    cursor: 0,
                };
                for lookahead in lookaheads.iter() {
                    let candidate = Item { core, lookahead };
                    if !items.contains(&candidate) {
                        added.insert(candidate);
                    }
                }
                if beta_nullable {
                    let candidate = Item {
                        core,
                        lookahead: item.lookahead,
                    };
                    if !items.contains(&candidate) {
                        added.insert(candidate);
                    }
                }
            }
        }

        if added.is_empty() {
            break;
        }
        items.extend(added.iter().copied());
        frontier = added;
    }
}

/// The closed item set reached by advancing every item past `x`.
pub fn goto(items: &ItemSet, x: SymbolID, first: &FirstSets, g: &Grammar) -> ItemSet {
    let mut next = ItemSet::new();
    for item in items {
        if item.core.next_symbol(g) == Some(x) {
            next.insert(Item {
                core: item.core.advanced(),
                lookahead: item.lookahead,
            });
        }
    }
    if !next.is_empty() {
        closure(&mut next, first, g);
    }
    next
}
