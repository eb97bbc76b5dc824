//! The parsing table: states, actions and goto entries.
//!
//! Both table builders emit into this structure and share its conflict
//! policy: a shift always beats a reduce, and of two reduces the rule that
//! appears earlier in the grammar wins. Conflicts are reported through
//! [`ConflictReporter`] and never abort construction.

use crate::{
    grammar::{Grammar, NonterminalID, Rule, RuleID, TerminalID},
    lr0::CoreSet,
    lr1::ItemSet,
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The parse action attached to a (state, terminal) pair.
///
/// Every variant keeps the rule that produced it so conflicts stay
/// diagnosable after resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Consume the lookahead and move to the given state.
    Shift { next: StateID, origin: RuleID },

    /// Match the given rule.
    Reduce { rule: RuleID },

    /// The whole input matches the root rule.
    Accept,

    /// Explicitly reject the lookahead. Equivalent to a missing entry.
    Error,
}

impl Action {
    /// The rule this action reduces by, treating accept as a reduce of the
    /// root rule. `None` for shifts and errors.
    fn reduced_rule(&self) -> Option<RuleID> {
        match self {
            Self::Reduce { rule } => Some(*rule),
            Self::Accept => Some(RuleID::ACCEPT),
            Self::Shift { .. } | Self::Error => None,
        }
    }
}

/// One node of the final table.
#[derive(Debug)]
pub struct State {
    pub id: StateID,
    pub kernel: CoreSet,
    pub items: ItemSet,
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
    /// True when this state acts on the reserved error token; the code
    /// generators emit recovery dispatch only for such states.
    pub handle_error: bool,
}

impl State {
    fn new(id: StateID, kernel: CoreSet, items: ItemSet) -> Self {
        Self {
            id,
            kernel,
            items,
            actions: Map::default(),
            gotos: Map::default(),
            handle_error: false,
        }
    }

    pub fn action(&self, token: TerminalID) -> Action {
        self.actions.get(&token).copied().unwrap_or(Action::Error)
    }

    pub fn goto(&self, n: NonterminalID) -> Option<StateID> {
        self.gotos.get(&n).copied()
    }
}

/// The finished, immutable artifact of table construction: an ordered state
/// list, the rule list, and the initial state.
#[derive(Debug)]
pub struct ParsingTable {
    states: Vec<State>,
    rules: Vec<Rule>,
    first_state: StateID,
}

impl ParsingTable {
    pub(crate) fn new() -> Self {
        Self {
            states: vec![],
            rules: vec![],
            first_state: StateID::new(0),
        }
    }

    pub(crate) fn add_rule(&mut self, rule: Rule) -> RuleID {
        debug_assert_eq!(rule.id().index(), self.rules.len());
        let id = rule.id();
        self.rules.push(rule);
        id
    }

    pub(crate) fn add_state(&mut self, kernel: CoreSet, items: ItemSet) -> StateID {
        let id = StateID::new(self.states.len() as u32);
        self.states.push(State::new(id, kernel, items));
        id
    }

    pub(crate) fn state_mut(&mut self, id: StateID) -> &mut State {
        &mut self.states[id.index()]
    }

    pub(crate) fn set_first_state(&mut self, id: StateID) {
        self.first_state = id;
    }

    pub fn first_state(&self) -> StateID {
        self.first_state
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "<toplevel = state{}>", self.first_state)?;
            for state in &self.states {
                writeln!(f, "<state: {}>", state.id)?;
                for (token, action) in &state.actions {
                    write!(f, "  action({}) = ", g.terminal(*token))?;
                    match action {
                        Action::Shift { next, .. } => writeln!(f, "shift({})", next)?,
                        Action::Reduce { rule } => {
                            writeln!(f, "reduce({})", self.rule(*rule).display(g))?
                        }
                        Action::Accept => writeln!(f, "accept")?,
                        Action::Error => writeln!(f, "error")?,
                    }
                }
                for (symbol, goto) in &state.gotos {
                    writeln!(f, "  goto({}) = {}", g.nonterminal(*symbol), goto)?;
                }
            }
            Ok(())
        })
    }
}

/// Callbacks invoked when the action table has two applicable actions for
/// the same (state, lookahead) pair. The conflict is resolved either way;
/// reporting exists so a front end can warn about the grammar.
pub trait ConflictReporter {
    /// A shift/reduce conflict; the shift wins. Called with the rule the
    /// shift item belongs to and the losing reduce rule.
    fn shift_reduce(&mut self, shift: &Rule, reduce: &Rule);

    /// A reduce/reduce conflict; the rule with the lower id wins. Called
    /// with the already-installed rule first.
    fn reduce_reduce(&mut self, left: &Rule, right: &Rule);
}

/// A reporter that ignores every conflict.
#[derive(Debug, Default)]
pub struct NullReporter;

impl ConflictReporter for NullReporter {
    fn shift_reduce(&mut self, _: &Rule, _: &Rule) {}
    fn reduce_reduce(&mut self, _: &Rule, _: &Rule) {}
}

/// Install `action` for `token`, resolving conflicts with the fixed policy.
pub(crate) fn insert_action<R>(
    state: &mut State,
    token: TerminalID,
    action: Action,
    g: &Grammar,
    reporter: &mut R,
) where
    R: ConflictReporter + ?Sized,
{
    let Some(existing) = state.actions.get(&token).copied() else {
        state.actions.insert(token, action);
        return;
    };

    match (existing, action) {
        (Action::Shift { next, .. }, Action::Shift { next: new_next, .. }) => {
            // One goto target per symbol; a second shift must agree.
            debug_assert_eq!(next, new_next);
        }

        (Action::Shift { origin, .. }, new) => {
            let Some(reduce) = new.reduced_rule() else {
                return;
            };
            tracing::debug!("shift/reduce conflict on {:?}", token);
            reporter.shift_reduce(g.rule(origin), g.rule(reduce));
            // The shift stays.
        }

        (old, Action::Shift { origin, .. }) => {
            if let Some(reduce) = old.reduced_rule() {
                tracing::debug!("shift/reduce conflict on {:?}", token);
                reporter.shift_reduce(g.rule(origin), g.rule(reduce));
            }
            state.actions.insert(token, action);
        }

        (old, new) => {
            let (Some(r_old), Some(r_new)) = (old.reduced_rule(), new.reduced_rule()) else {
                return;
            };
            if r_old == r_new {
                return;
            }
            tracing::debug!("reduce/reduce conflict on {:?}", token);
            reporter.reduce_reduce(g.rule(r_old), g.rule(r_new));
            // The earlier rule in the grammar wins.
            if r_new < r_old {
                state.actions.insert(token, new);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::BuildError, grammar::GrammarDef, grammar::SymbolID};

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

    fn tiny_grammar() -> (Grammar, Vec<RuleID>) {
        let mut ids = vec![];
        let g = Grammar::define(|g| {
            let x = g.terminal("X")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.start_symbol(a);
            ids.push(g.rule(a, [SymbolID::T(x)])?);
            ids.push(g.rule(a, [SymbolID::N(b), SymbolID::T(x)])?);
            ids.push(g.rule(b, [SymbolID::T(x), SymbolID::T(x)])?);
            Ok::<_, BuildError>(())
        })
        .unwrap();
        (g, ids)
    }

    fn empty_state() -> State {
        State::new(StateID::new(0), CoreSet::new(), ItemSet::new())
    }

    #[test]
    fn lower_rule_id_wins_reduce_reduce() {
        let (g, ids) = tiny_grammar();
        let mut state = empty_state();
        let mut reporter = Recording::default();
        let token = TerminalID::EOI;

        insert_action(&mut state, token, Action::Reduce { rule: ids[2] }, &g, &mut reporter);
        insert_action(&mut state, token, Action::Reduce { rule: ids[0] }, &g, &mut reporter);
        assert_eq!(state.action(token), Action::Reduce { rule: ids[0] });

        // And in the opposite insertion order the earlier rule still wins.
        let mut state = empty_state();
        insert_action(&mut state, token, Action::Reduce { rule: ids[0] }, &g, &mut reporter);
        insert_action(&mut state, token, Action::Reduce { rule: ids[2] }, &g, &mut reporter);
        assert_eq!(state.action(token), Action::Reduce { rule: ids[0] });

        assert_eq!(reporter.reduce_reduce.len(), 2);
    }

    #[test]
    fn shift_beats_reduce_both_ways() {
        let (g, ids) = tiny_grammar();
        let token = TerminalID::EOI;
        let shift = Action::Shift {
            next: StateID::new(7),
            origin: ids[1],
        };

        let mut reporter = Recording::default();
        let mut state = empty_state();
        insert_action(&mut state, token, shift, &g, &mut reporter);
        insert_action(&mut state, token, Action::Reduce { rule: ids[0] }, &g, &mut reporter);
        assert_eq!(state.action(token), shift);

        let mut state = empty_state();
        insert_action(&mut state, token, Action::Reduce { rule: ids[0] }, &g, &mut reporter);
        insert_action(&mut state, token, shift, &g, &mut reporter);
        assert_eq!(state.action(token), shift);

        assert_eq!(reporter.shift_reduce.len(), 2);
        assert!(reporter
            .shift_reduce
            .iter()
            .all(|(s, r)| *s == ids[1] && *r == ids[0]));
    }

    #[test]
    fn accept_counts_as_root_reduce() {
        let (g, ids) = tiny_grammar();
        let token = TerminalID::EOI;
        let mut reporter = Recording::default();
        let mut state = empty_state();

        insert_action(&mut state, token, Action::Reduce { rule: ids[0] }, &g, &mut reporter);
        insert_action(&mut state, token, Action::Accept, &g, &mut reporter);

        // The root rule has id 0, so accept wins the tie-break.
        assert_eq!(state.action(token), Action::Accept);
        assert_eq!(reporter.reduce_reduce, vec![(ids[0], RuleID::ACCEPT)]);
    }

    #[test]
    fn missing_entry_reads_as_error() {
        let state = empty_state();
        assert_eq!(state.action(TerminalID::ERROR), Action::Error);
    }
}
