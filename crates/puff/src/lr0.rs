//! The LR(0) items and the canonical collection of LR(0) item sets.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::BTreeSet, collections::VecDeque, fmt};

/// An LR(0) item: a production rule with a cursor into its right side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Core {
    pub rule: RuleID,
    pub cursor: u16,
}

impl Core {
    /// The item `$start := . S` the whole construction grows from.
    pub const ROOT: Self = Self {
        rule: RuleID::ACCEPT,
        cursor: 0,
    };

    /// The symbol right after the cursor, `None` once the rule is matched
    /// completely.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(self.cursor as usize).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        g.rule(self.rule).right().len() <= self.cursor as usize
    }

    pub fn advanced(&self) -> Self {
        Self {
            rule: self.rule,
            cursor: self.cursor + 1,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} :=", g.nonterminal(rule.left()))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.cursor as usize {
                    f.write_str(" .")?;
                }
                match symbol {
                    SymbolID::T(t) => write!(f, " {}", g.terminal(*t))?,
                    SymbolID::N(n) => write!(f, " {}", g.nonterminal(*n))?,
                }
            }
            if self.cursor as usize == rule.right().len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// An ordered, duplicate-free set of LR(0) items. Structural equality makes
/// it the unit of closure, goto and state identification.
pub type CoreSet = BTreeSet<Core>;

/// Expand a core set with the initial items of every nonterminal appearing
/// right after a cursor.
pub fn closure(set: &mut CoreSet, g: &Grammar) {
    let mut expanded: Set<crate::grammar::NonterminalID> = Set::default();

    let mut changed = true;
    while changed {
        changed = false;

        let mut added = CoreSet::new();
        for core in set.iter() {
            let Some(SymbolID::N(n)) = core.next_symbol(g) else {
                continue;
            };
            if !expanded.insert(n) {
                continue;
            }
            for &rule in g.rules_for(n) {
                added.insert(Core { rule, cursor: 0 });
            }
        }

        for core in added {
            changed |= set.insert(core);
        }
    }
}

/// The closed set of items reached by advancing every item in `set` past
/// the symbol `x`.
pub fn goto(set: &CoreSet, x: SymbolID, g: &Grammar) -> CoreSet {
    let mut next = CoreSet::new();
    for core in set {
        if core.next_symbol(g) == Some(x) {
            next.insert(core.advanced());
        }
    }
    if !next.is_empty() {
        closure(&mut next, g);
    }
    next
}

/// The canonical collection of LR(0) item sets, discovered breadth-first
/// from the closure of the root item. Sets are deduplicated by value; the
/// returned order is the discovery order and is deterministic.
#[tracing::instrument(skip_all)]
pub fn collection(g: &Grammar) -> Vec<CoreSet> {
    let mut start = CoreSet::new();
    start.insert(Core::ROOT);
    closure(&mut start, g);

    let mut sets: Vec<CoreSet> = vec![];
    let mut seen: Map<CoreSet, usize> = Map::default();
    let mut pending = VecDeque::new();

    seen.insert(start.clone(), 0);
    sets.push(start.clone());
    pending.push_back(start);

    while let Some(current) = pending.pop_front() {
        for symbol in g.symbols() {
            let next = goto(&current, symbol, g);
            if next.is_empty() || seen.contains_key(&next) {
                continue;
            }
            seen.insert(next.clone(), sets.len());
            sets.push(next.clone());
            pending.push_back(next);
        }
    }

    tracing::debug!("LR(0) collection size = {}", sets.len());
    sets
}

/// Keep only the kernel items: the root item and every item whose cursor
/// has moved.
pub fn kernel_of(set: &CoreSet) -> CoreSet {
    set.iter()
        .filter(|core| **core == Core::ROOT || core.cursor > 0)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::BuildError, grammar::GrammarDef};

    // E := E '+' T | T    T := '(' E ')' | NUM
    fn def_paren_expr(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
        let plus = g.terminal("PLUS")?;
        let lparen = g.terminal("LPAREN")?;
        let rparen = g.terminal("RPAREN")?;
        let num = g.terminal("NUM")?;
        let e = g.nonterminal("E")?;
        let t = g.nonterminal("T")?;
        g.start_symbol(e);
        g.rule(e, [SymbolID::N(e), SymbolID::T(plus), SymbolID::N(t)])?;
        g.rule(e, [SymbolID::N(t)])?;
        g.rule(t, [SymbolID::T(lparen), SymbolID::N(e), SymbolID::T(rparen)])?;
        g.rule(t, [SymbolID::T(num)])?;
        Ok(())
    }

    #[test]
    fn closure_expands_each_nonterminal_once() {
        let g = Grammar::define(def_paren_expr).unwrap();
        let mut set = CoreSet::new();
        set.insert(Core::ROOT);
        closure(&mut set, &g);

        // $start := . E, both E rules and both T rules.
        assert_eq!(set.len(), 5);
        assert!(set.iter().all(|core| core.cursor == 0));
    }

    #[test]
    fn collection_is_deduplicated_and_stable() {
        let g = Grammar::define(def_paren_expr).unwrap();
        let sets = collection(&g);

        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(sets, collection(&g));
    }

    #[test]
    fn kernel_drops_closure_items() {
        let g = Grammar::define(def_paren_expr).unwrap();
        let mut set = CoreSet::new();
        set.insert(Core::ROOT);
        closure(&mut set, &g);

        let kernel = kernel_of(&set);
        assert_eq!(kernel.len(), 1);
        assert!(kernel.contains(&Core::ROOT));
    }
}
