//! Grammar definitions shared by the integration tests.

use puff::{
    error::BuildError,
    grammar::{GrammarDef, SymbolID},
};

/// `E := E '+' T | T`, `T := NUM` — the smallest left-recursive grammar.
pub fn g_sum(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
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

/// The classic arithmetic grammar with precedence by stratification.
pub fn g_arith(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
    let plus = g.terminal("PLUS")?;
    let star = g.terminal("STAR")?;
    let lparen = g.terminal("LPAREN")?;
    let rparen = g.terminal("RPAREN")?;
    let num = g.terminal("NUM")?;

    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;
    let f = g.nonterminal("F")?;

    g.start_symbol(e);

    g.rule(e, [SymbolID::N(e), SymbolID::T(plus), SymbolID::N(t)])?;
    g.rule(e, [SymbolID::N(t)])?;
    g.rule(t, [SymbolID::N(t), SymbolID::T(star), SymbolID::N(f)])?;
    g.rule(t, [SymbolID::N(f)])?;
    g.rule(f, [SymbolID::T(lparen), SymbolID::N(e), SymbolID::T(rparen)])?;
    g.rule(f, [SymbolID::T(num)])?;
    Ok(())
}

/// `A := E '=' E | ID`, `E := E '+' T | T`, `T := NUM | ID`.
pub fn g_simple1(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
    let equal = g.terminal("EQUAL")?;
    let plus = g.terminal("PLUS")?;
    let ident = g.terminal("ID")?;
    let num = g.terminal("NUM")?;

    let a = g.nonterminal("A")?;
    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;

    g.start_symbol(a);

    g.rule(a, [SymbolID::N(e), SymbolID::T(equal), SymbolID::N(e)])?;
    g.rule(a, [SymbolID::T(ident)])?;
    g.rule(e, [SymbolID::N(e), SymbolID::T(plus), SymbolID::N(t)])?;
    g.rule(e, [SymbolID::N(t)])?;
    g.rule(t, [SymbolID::T(num)])?;
    g.rule(t, [SymbolID::T(ident)])?;
    Ok(())
}

/// A comma-separated list with a nullable tail.
pub fn g_list(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
    let comma = g.terminal("COMMA")?;
    let ident = g.terminal("ID")?;

    let list = g.nonterminal("LIST")?;
    let rest = g.nonterminal("REST")?;

    g.start_symbol(list);

    g.rule(list, [SymbolID::T(ident), SymbolID::N(rest)])?;
    g.rule(rest, [SymbolID::T(comma), SymbolID::T(ident), SymbolID::N(rest)])?;
    g.rule(rest, [])?;
    Ok(())
}

/// The classical case that distinguishes LALR(1) from LR(1):
/// `S := 'a' A 'd' | 'a' B 'e' | 'b' A 'e' | 'b' B 'd'`, `A := 'c'`,
/// `B := 'c'`. The LR(0) state after `c` merges the `A := c .` and
/// `B := c .` contexts, so the LALR(1) lookahead union manufactures a
/// reduce/reduce conflict that canonical LR(1) does not have.
pub fn g_non_lalr(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
    let ta = g.terminal("A")?;
    let tb = g.terminal("B")?;
    let tc = g.terminal("C")?;
    let td = g.terminal("D")?;
    let te = g.terminal("E")?;

    let s = g.nonterminal("S")?;
    let a = g.nonterminal("AA")?;
    let b = g.nonterminal("BB")?;

    g.start_symbol(s);

    g.rule(s, [SymbolID::T(ta), SymbolID::N(a), SymbolID::T(td)])?;
    g.rule(s, [SymbolID::T(ta), SymbolID::N(b), SymbolID::T(te)])?;
    g.rule(s, [SymbolID::T(tb), SymbolID::N(a), SymbolID::T(te)])?;
    g.rule(s, [SymbolID::T(tb), SymbolID::N(b), SymbolID::T(td)])?;
    g.rule(a, [SymbolID::T(tc)])?;
    g.rule(b, [SymbolID::T(tc)])?;
    Ok(())
}

/// The dangling-else shape, a deliberate shift/reduce conflict.
pub fn g_dangling_else(g: &mut GrammarDef<'_>) -> Result<(), BuildError> {
    let t_if = g.terminal("IF")?;
    let t_else = g.terminal("ELSE")?;
    let t_x = g.terminal("X")?;

    let s = g.nonterminal("S")?;

    g.start_symbol(s);

    g.rule(s, [SymbolID::T(t_if), SymbolID::N(s)])?;
    g.rule(
        s,
        [
            SymbolID::T(t_if),
            SymbolID::N(s),
            SymbolID::T(t_else),
            SymbolID::N(s),
        ],
    )?;
    g.rule(s, [SymbolID::T(t_x)])?;
    Ok(())
}
