//! Semantic-action descriptions.
//!
//! The front end resolves each production alternative into the name of the
//! handler to call and the typed, reordered arguments it receives; the code
//! generators consume the result together with the parsing table. The core
//! only validates and carries this mapping — invoking the handlers at run
//! time goes through [`crate::parser::Parser::set_semantic_action`].

use crate::{error::BuildError, grammar::RuleID, types::Map};

/// One argument of a semantic action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Position of the source symbol on the rule's right-hand side.
    pub source_index: usize,
    /// The value type attached to that symbol.
    pub type_name: String,
}

/// A semantic action bound to one production rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticAction {
    pub name: String,
    /// Arguments in handler order, i.e. sorted by their `(n)` tag.
    pub args: Vec<Argument>,
}

/// `rule -> action` for every rule that carries a handler.
pub type SemanticActionMap = Map<RuleID, SemanticAction>;

/// One `(n)`-tagged term of a production alternative, before validation.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    /// The `n` of the `(n)` tag: the handler-side position.
    pub argument_index: usize,
    /// Position of the term on the right-hand side.
    pub source_index: usize,
    /// The symbol's declared value type, if any.
    pub type_name: Option<String>,
    /// Display name of the symbol, for error reports.
    pub symbol: String,
}

impl SemanticAction {
    /// Assemble an action from its tagged terms.
    ///
    /// Argument indices must be unique and contiguous from zero, and every
    /// argument's symbol must carry a non-empty value type.
    pub fn assemble(name: &str, specs: &[ArgumentSpec]) -> Result<Self, BuildError> {
        let mut by_index: Map<usize, &ArgumentSpec> = Map::default();
        let mut max_index = None;

        for spec in specs {
            if by_index.contains_key(&spec.argument_index) {
                return Err(BuildError::DuplicateActionArgument {
                    action: name.to_owned(),
                    index: spec.argument_index,
                });
            }

            let type_name = match &spec.type_name {
                Some(t) => t,
                None => {
                    return Err(BuildError::UntypedTerminal {
                        action: name.to_owned(),
                        symbol: spec.symbol.clone(),
                    })
                }
            };
            if type_name.is_empty() {
                return Err(BuildError::EmptyTypeTag {
                    symbol: spec.symbol.clone(),
                });
            }

            by_index.insert(spec.argument_index, spec);
            max_index = Some(max_index.map_or(spec.argument_index, |m: usize| m.max(spec.argument_index)));
        }

        let mut args = Vec::with_capacity(specs.len());
        if let Some(max_index) = max_index {
            for index in 0..=max_index {
                let spec = by_index.get(&index).ok_or_else(|| {
                    BuildError::SkippedActionArgument {
                        action: name.to_owned(),
                        index,
                    }
                })?;
                args.push(Argument {
                    source_index: spec.source_index,
                    type_name: spec.type_name.clone().expect("validated above"),
                });
            }
        }

        Ok(Self {
            name: name.to_owned(),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(argument_index: usize, source_index: usize, type_name: Option<&str>) -> ArgumentSpec {
        ArgumentSpec {
            argument_index,
            source_index,
            type_name: type_name.map(str::to_owned),
            symbol: format!("sym{}", source_index),
        }
    }

    #[test]
    fn arguments_are_reordered_by_tag() {
        let action = SemanticAction::assemble(
            "MakeAdd",
            &[spec(1, 2, Some("Term")), spec(0, 0, Some("Expr"))],
        )
        .unwrap();
        assert_eq!(action.args.len(), 2);
        assert_eq!(action.args[0].source_index, 0);
        assert_eq!(action.args[1].source_index, 2);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let err = SemanticAction::assemble(
            "MakeAdd",
            &[spec(0, 0, Some("Expr")), spec(0, 2, Some("Term"))],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateActionArgument { index: 0, .. }));
    }

    #[test]
    fn skipped_index_is_rejected() {
        let err = SemanticAction::assemble(
            "MakeAdd",
            &[spec(0, 0, Some("Expr")), spec(2, 2, Some("Term"))],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::SkippedActionArgument { index: 1, .. }));
    }

    #[test]
    fn untyped_terminal_is_rejected() {
        let err =
            SemanticAction::assemble("MakeNum", &[spec(0, 0, None)]).unwrap_err();
        assert!(matches!(err, BuildError::UntypedTerminal { .. }));
    }

    #[test]
    fn empty_type_tag_is_rejected() {
        let err = SemanticAction::assemble("MakeNum", &[spec(0, 0, Some(""))]).unwrap_err();
        assert!(matches!(err, BuildError::EmptyTypeTag { .. }));
    }

    #[test]
    fn actions_without_arguments_are_fine() {
        let action = SemanticAction::assemble("MakeUnit", &[]).unwrap();
        assert!(action.args.is_empty());
    }
}
