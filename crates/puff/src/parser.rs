//! The table-driven parsing engine.
//!
//! A classic LR stack machine over a finished [`ParsingTable`]: the caller
//! feeds tokens one at a time, semantic actions registered per rule fire on
//! every reduction, and the value produced by the root rule's action comes
//! back once the input is accepted.

use crate::{
    grammar::{RuleID, TerminalID},
    table::{Action, ParsingTable, StateID},
};

#[derive(Debug)]
struct StackFrame<V> {
    state: StateID,
    value: V,
}

/// A read-only view over the values popped by a reduction, one slot per
/// right-hand-side symbol of the matched rule.
pub struct Arguments<'a, V> {
    frames: &'a [StackFrame<V>],
}

impl<'a, V> Arguments<'a, V> {
    pub fn get(&self, n: usize) -> &'a V {
        &self.frames[n].value
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<'a, V> std::ops::Index<usize> for Arguments<'a, V> {
    type Output = V;

    fn index(&self, n: usize) -> &Self::Output {
        self.get(n)
    }
}

type SemanticAction<'t, V> = Box<dyn Fn(Arguments<'_, V>) -> V + 't>;

/// Errors raised while driving a parse.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The table has no action for the current (state, token) pair. The
    /// parse cannot continue.
    #[error("syntax error")]
    SyntaxError,

    /// The table has no goto entry for a nonterminal just reduced. Only a
    /// corrupted table can get here.
    #[error("missing goto entry after reduction")]
    MissingGoto,

    /// Tokens were pushed after the parse accepted.
    #[error("parse already accepted")]
    AlreadyAccepted,
}

/// The parser driven by a parsing table.
pub struct Parser<'t, V> {
    table: &'t ParsingTable,
    stack: Vec<StackFrame<V>>,
    semantic_actions: Vec<Option<SemanticAction<'t, V>>>,
    accept_value: Option<V>,
    accepted: bool,
}

impl<'t, V> std::fmt::Debug for Parser<'t, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("depth", &self.stack.len())
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

impl<'t, V> Parser<'t, V>
where
    V: Default,
{
    pub fn new(table: &'t ParsingTable) -> Self {
        let mut semantic_actions = Vec::with_capacity(table.rules().len());
        semantic_actions.resize_with(table.rules().len(), || None);
        Self {
            table,
            stack: vec![StackFrame {
                state: table.first_state(),
                value: V::default(),
            }],
            semantic_actions,
            accept_value: None,
            accepted: false,
        }
    }

    /// Bind a semantic action to a rule. Rules without an action thread a
    /// default value through the reduction.
    pub fn set_semantic_action<F>(&mut self, rule: RuleID, action: F)
    where
        F: Fn(Arguments<'_, V>) -> V + 't,
    {
        self.semantic_actions[rule.index()] = Some(Box::new(action));
    }

    /// Feed one token. Reductions run until the token can be shifted;
    /// `Ok(true)` signals that the input was accepted.
    ///
    /// The caller finishes a parse by pushing [`TerminalID::EOI`].
    pub fn push(&mut self, token: TerminalID, value: V) -> Result<bool, ParseError> {
        if self.accepted {
            return Err(ParseError::AlreadyAccepted);
        }

        loop {
            let top = self.stack.last().expect("the state stack never drains");
            match self.table.state(top.state).action(token) {
                Action::Shift { next, .. } => {
                    self.stack.push(StackFrame { state: next, value });
                    return Ok(false);
                }

                Action::Reduce { rule } => {
                    self.reduce(rule)?;
                }

                Action::Accept => {
                    let value = self.run_semantic_action(RuleID::ACCEPT);
                    self.accept_value = Some(value);
                    self.accepted = true;
                    return Ok(true);
                }

                Action::Error => return Err(ParseError::SyntaxError),
            }
        }
    }

    /// The value produced by the root rule, available once `push` returned
    /// `Ok(true)`.
    pub fn accept_value(&mut self) -> Option<V> {
        self.accept_value.take()
    }

    fn reduce(&mut self, rule_id: RuleID) -> Result<(), ParseError> {
        let value = self.run_semantic_action(rule_id);

        let table = self.table;
        let rule = table.rule(rule_id);
        let pop = rule.right().len();
        debug_assert!(self.stack.len() > pop);
        self.stack.truncate(self.stack.len() - pop);

        let exposed = self.stack.last().expect("the state stack never drains");
        let next = table
            .state(exposed.state)
            .goto(rule.left())
            .ok_or(ParseError::MissingGoto)?;
        self.stack.push(StackFrame { state: next, value });
        Ok(())
    }

    fn run_semantic_action(&self, rule_id: RuleID) -> V {
        let rule = self.table.rule(rule_id);
        let n = rule.right().len();
        match &self.semantic_actions[rule_id.index()] {
            Some(action) => action(Arguments {
                frames: &self.stack[self.stack.len() - n..],
            }),
            None => V::default(),
        }
    }
}
