//! Grammar types.
//!
//! A grammar is assembled once through [`GrammarDef`] and is immutable
//! afterwards. Nonterminal identity is decided by an intern table owned by
//! the definition session, so two declarations of the same name yield the
//! same [`NonterminalID`] and symbol comparisons stay plain integer
//! comparisons.

use crate::{error::BuildError, types::Map, util::display_fn};
use std::{borrow::Cow, fmt, marker::PhantomData};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved terminal that means the end of input.
    pub const EOI: Self = Self::new(0);

    /// Reserved terminal used as the error-recovery token.
    pub const ERROR: Self = Self::new(1);

    /// Placeholder lookahead used while determining LALR(1) lookaheads.
    /// Distinct from every declared terminal and never part of a grammar.
    pub(crate) const DUMMY: Self = Self::new(u16::MAX);

    const OFFSET: u16 = 2;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

/// A set of terminal symbols, backed by a bit set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.index())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.index())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| TerminalID::new(raw.try_into().expect("terminal id out of range")))
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.index()).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    display: Option<Cow<'static, str>>,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TerminalID::EOI => f.write_str("$eoi"),
            TerminalID::ERROR => f.write_str("$error"),
            _ => f.write_str(self.display().unwrap_or("<unknown>")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The synthetic root nonterminal.
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Option<Cow<'static, str>>,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            NonterminalID::START => f.write_str("$start"),
            _ => f.write_str(self.name().unwrap_or("<unknown>")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The synthetic root rule `$start := S`, always rule 0.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

/// A production rule.
///
/// Two rules are equal iff their left side and right-hand sequences are
/// equal; the id only breaks reduce/reduce ties and indexes the table.
#[derive(Debug, Clone)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.right == other.right
    }
}
impl Eq for Rule {}

impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    pub fn left(&self) -> NonterminalID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} := ", g.nonterminal(self.left()))?;
            if self.right().is_empty() {
                return f.write_str("ε");
            }
            for (i, symbol) in self.right().iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                match symbol {
                    SymbolID::T(t) => write!(f, "{}", g.terminal(*t))?,
                    SymbolID::N(n) => write!(f, "{}", g.nonterminal(*n))?,
                }
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
pub struct Grammar {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    by_left: Map<NonterminalID, Vec<RuleID>>,
    start_symbol: NonterminalID,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut GrammarDef<'_>) -> Result<(), BuildError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            by_left: Map::default(),
            terminal_names: Map::default(),
            nonterminal_names: Map::default(),
            rule_index: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                display: None,
            },
        );
        def.terminals.insert(
            TerminalID::ERROR,
            Terminal {
                id: TerminalID::ERROR,
                display: None,
            },
        );
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: None,
            },
        );

        f(&mut def)?;

        def.end()
    }

    /// Return the synthetic root rule `$start := S`.
    pub fn root_rule(&self) -> &Rule {
        &self.rules[&RuleID::ACCEPT]
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Iterate all rules in declaration order, the root rule first.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// All rules whose left-hand side is the given nonterminal.
    pub fn rules_for(&self, left: NonterminalID) -> &[RuleID] {
        self.by_left.get(&left).map(|v| &v[..]).unwrap_or(&[])
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[&id]
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals.values()
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals.values()
    }

    /// Every grammar symbol, terminals first, in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self.terminals.keys().copied().map(SymbolID::T);
        let nonterminals = self.nonterminals.keys().copied().map(SymbolID::N);
        terminals.chain(nonterminals)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

/// Check that every rule is reachable from the root.
///
/// Starting from the root's left side, transitively mark every symbol that
/// occurs on the right side of a rule with a marked left side. Rules whose
/// left side is never marked cannot take part in any derivation and make
/// table construction fail.
#[tracing::instrument(skip_all)]
pub fn check_reachable(g: &Grammar) -> Result<(), BuildError> {
    let mut marked: crate::types::Set<NonterminalID> = Some(NonterminalID::START).into_iter().collect();
    let mut remains: Vec<&Rule> = g.rules().collect();

    let mut iterate = true;
    while iterate {
        iterate = false;
        remains.retain(|rule| {
            if !marked.contains(&rule.left()) {
                return true;
            }
            for symbol in rule.right() {
                if let SymbolID::N(n) = symbol {
                    marked.insert(*n);
                }
            }
            iterate = true;
            false
        });
    }

    if !remains.is_empty() {
        let rules: Vec<_> = remains
            .iter()
            .map(|rule| rule.display(g).to_string())
            .collect();
        tracing::debug!("disconnected rules: {:?}", rules);
        return Err(BuildError::DisconnectedRules { rules });
    }

    Ok(())
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    by_left: Map<NonterminalID, Vec<RuleID>>,
    terminal_names: Map<String, TerminalID>,
    nonterminal_names: Map<String, NonterminalID>,
    rule_index: Map<(NonterminalID, Vec<SymbolID>), RuleID>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    ///
    /// Token ids are handed out densely starting right after the reserved
    /// end-of-input and error tokens. Declaring the same display name again
    /// returns the id of the earlier declaration.
    pub fn terminal(&mut self, display: &str) -> Result<TerminalID, BuildError> {
        if !verify_ident(display) {
            return Err(BuildError::InvalidSymbolName {
                name: display.to_owned(),
            });
        }

        if let Some(id) = self.terminal_names.get(display) {
            return Ok(*id);
        }

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id += 1;

        self.terminals.insert(
            id,
            Terminal {
                id,
                display: Some(display.to_owned().into()),
            },
        );
        self.terminal_names.insert(display.to_owned(), id);

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    ///
    /// Names are interned: declaring the same name twice yields the same id.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, BuildError> {
        if !verify_ident(name) {
            return Err(BuildError::InvalidSymbolName {
                name: name.to_owned(),
            });
        }

        if let Some(id) = self.nonterminal_names.get(name) {
            return Ok(*id);
        }

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: Some(name.to_owned().into()),
            },
        );
        self.nonterminal_names.insert(name.to_owned(), id);

        Ok(id)
    }

    /// Specify a production rule for this grammar.
    ///
    /// The rule receives the next sequential id and is indexed under its
    /// left-hand side. A structurally identical rule is an error.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, BuildError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if self.rules.is_empty() {
            // Reserve rule 0 for `$start := S`; the right side is resolved
            // once the start symbol is known.
            self.rules.insert(
                RuleID::ACCEPT,
                Rule {
                    id: RuleID::ACCEPT,
                    left: NonterminalID::START,
                    right: vec![],
                },
            );
        }

        let right: Vec<SymbolID> = right.into_iter().collect();
        let key = (left, right.clone());
        if self.rule_index.contains_key(&key) {
            let mut rule = format!("{} :=", self.nonterminals[&left]);
            for symbol in &right {
                match symbol {
                    SymbolID::T(t) => rule.push_str(&format!(" {}", self.terminals[t])),
                    SymbolID::N(n) => rule.push_str(&format!(" {}", self.nonterminals[n])),
                }
            }
            return Err(BuildError::DuplicateRule { rule });
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(id, Rule { id, left, right });
        self.by_left.entry(left).or_default().push(id);
        self.rule_index.insert(key, id);

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    ///
    /// Defaults to the first declared nonterminal when never called.
    pub fn start_symbol(&mut self, symbol: NonterminalID) {
        self.start.replace(symbol);
    }

    fn end(mut self) -> Result<Grammar, BuildError> {
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(BuildError::EmptyGrammar)?,
        };

        if self.rules.is_empty() {
            return Err(BuildError::EmptyGrammar);
        }

        let root = self
            .rules
            .get_mut(&RuleID::ACCEPT)
            .expect("root rule is reserved on first insertion");
        root.right = vec![SymbolID::N(start)];
        self.by_left
            .entry(NonterminalID::START)
            .or_default()
            .push(RuleID::ACCEPT);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            by_left: self.by_left,
            start_symbol: start,
        })
    }
}

fn verify_ident(mut s: &str) -> bool {
    if s.is_empty() {
        // The identifier must not be empty.
        return false;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        // The number must not be identifer.
        return false;
    }

    if s.starts_with("r#") {
        s = &s[2..];
        if matches!(s, "crate" | "self" | "super" | "Self") {
            // unexpected raw identifier
            return false;
        }
    } else if is_strict_keyword(s) || is_reserved(s) {
        // Reserved keyword specified.
        return false;
    }

    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !is_ident_start(first) {
        // The identifier must be started with XID-Start.
        return false;
    }
    if chars.any(|ch| !is_ident_continue(ch)) {
        // The idenfier must be continued with XID-Continue.
        return false;
    }

    true
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}

fn is_strict_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break" | "const" | "continue" | "crate" | "else" | "enum" | "extern"
        | "false" | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop" | "match" | "mod"
        | "move" | "mut" | "pub" | "ref" | "return" | "self" | "Self" | "static" | "struct"
        | "super" | "trait" | "true" | "type" | "unsafe" | "use" | "where" | "while"
        // since Rust 2018
        | "async" | "await" | "dyn"
    )
}

fn is_reserved(s: &str) -> bool {
    matches!(
        s,
        "abstract" | "become" | "box" | "do" | "final" | "macro" | "override" | "priv"
        | "typeof" | "unsized" | "virtual" | "yield"
        // since Rust 2018
        | "try"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def_expr(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
        let plus = g.terminal("PLUS")?;
        let num = g.terminal("NUM")?;
        let e = g.nonterminal("E")?;
        let t = g.nonterminal("T")?;
        g.start_symbol(e);
        g.rule(e, [SymbolID::N(e), SymbolID::T(plus), SymbolID::N(t)])?;
        g.rule(e, [SymbolID::N(t)])?;
        g.rule(t, [SymbolID::T(num)])?;
        Ok(())
    }

    #[test]
    fn root_rule_is_rule_zero() {
        let g = Grammar::define(def_expr).unwrap();
        let root = g.root_rule();
        assert_eq!(root.id(), RuleID::ACCEPT);
        assert_eq!(root.left(), NonterminalID::START);
        assert_eq!(root.right(), [SymbolID::N(g.start_symbol())]);
        assert_eq!(g.rules().next().unwrap().id(), RuleID::ACCEPT);
    }

    #[test]
    fn nonterminal_names_are_interned() {
        Grammar::define(|g| {
            let a = g.nonterminal("Expr")?;
            let b = g.nonterminal("Expr")?;
            assert_eq!(a, b);
            let num = g.terminal("NUM")?;
            g.rule(a, [SymbolID::T(num)])?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn duplicate_rule_is_rejected() {
        let err = Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let e = g.nonterminal("E")?;
            g.rule(e, [SymbolID::T(num)])?;
            g.rule(e, [SymbolID::T(num)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateRule { .. }));
    }

    #[test]
    fn reachability_flags_unreferenced_rules() {
        let g = Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let e = g.nonterminal("E")?;
            let orphan = g.nonterminal("Orphan")?;
            g.start_symbol(e);
            g.rule(e, [SymbolID::T(num)])?;
            g.rule(orphan, [SymbolID::T(num)])?;
            Ok(())
        })
        .unwrap();
        let err = check_reachable(&g).unwrap_err();
        assert!(matches!(err, BuildError::DisconnectedRules { rules } if rules.len() == 1));
    }

    #[test]
    fn reachability_accepts_connected_grammars() {
        let g = Grammar::define(def_expr).unwrap();
        check_reachable(&g).unwrap();
    }

    #[test]
    fn bad_symbol_names_are_rejected() {
        let err = Grammar::define(|g| {
            g.nonterminal("123")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidSymbolName { .. }));
    }
}
