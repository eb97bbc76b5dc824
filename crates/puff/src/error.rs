//! Errors reported during table construction.
//!
//! Conflicts are *not* errors: they are resolved deterministically and
//! surfaced through [`ConflictReporter`](crate::table::ConflictReporter).
//! Everything below is fatal to the grammar being built.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("incorrect symbol name: `{name}'")]
    InvalidSymbolName { name: String },

    #[error("the grammar has no rules")]
    EmptyGrammar,

    #[error("duplicate production rule: {rule}")]
    DuplicateRule { rule: String },

    #[error("disconnected rules: {}", rules.join(", "))]
    DisconnectedRules { rules: Vec<String> },

    #[error("duplicated semantic action argument: action `{action}', index {index}")]
    DuplicateActionArgument { action: String, index: usize },

    #[error("skipped semantic action argument: action `{action}', index {index}")]
    SkippedActionArgument { action: String, index: usize },

    #[error("untyped terminal `{symbol}' used as an argument of action `{action}'")]
    UntypedTerminal { action: String, symbol: String },

    #[error("empty type tag on `{symbol}'")]
    EmptyTypeTag { symbol: String },

    #[error("state merging did not settle within {limit} iterations")]
    IterationLimit { limit: usize },
}
