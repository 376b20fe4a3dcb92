use super::{Nullability, detect_left_recursion, reachable};
use crate::config::PrepareOptions;
use crate::engine::supports_dumb;
use crate::error::GrammarError;
use crate::expr::{ExprKind, Grammar};

/// Check a resolved grammar before it is handed to the engine.
///
/// # Errors
///
/// - [`GrammarError::MissingRoot`] if no root is set
/// - [`GrammarError::UnresolvedReference`] for a reference still reachable
/// - [`GrammarError::AmbiguousPrecedence`] for two groups of one cluster
///   sharing a precedence
/// - [`GrammarError::NullableRepetition`] for a repetition over a nullable
///   operand, when `options.reject_nullable_repetition` is set
/// - [`GrammarError::WhitespaceNotDumb`] if the whitespace expression has no
///   fast path
/// - [`GrammarError::UnbrokenLeftRecursion`] for a first-position cycle not
///   going through a `LeftRecursive` node or a cluster
pub fn validate(grammar: &Grammar, nullability: &Nullability, options: &PrepareOptions) -> Result<(), GrammarError> {
    if grammar.root().is_none() {
        return Err(GrammarError::MissingRoot("<unset>".to_string()));
    }

    for id in reachable(grammar) {
        match grammar.kind(id) {
            ExprKind::Reference(name) => {
                return Err(GrammarError::UnresolvedReference(name.to_string()));
            }
            ExprKind::ZeroMore(operand) | ExprKind::OneMore(operand)
                if options.reject_nullable_repetition && nullability.is_nullable(*operand) =>
            {
                return Err(GrammarError::NullableRepetition(grammar.describe(id)));
            }
            ExprKind::Cluster(groups) => {
                if let Some(pair) = groups.windows(2).find(|w| w[0].precedence == w[1].precedence) {
                    return Err(GrammarError::AmbiguousPrecedence {
                        cluster: grammar.describe(id),
                        precedence: pair[0].precedence,
                    });
                }
            }
            _ => {}
        }
    }

    if let Some(whitespace) = grammar.whitespace()
        && let Err(culprit) = supports_dumb(grammar, whitespace)
    {
        return Err(GrammarError::WhitespaceNotDumb(
            grammar.kind(culprit).variant_name().to_string(),
        ));
    }

    if let Some(&cycle) = detect_left_recursion(grammar, nullability).first() {
        return Err(GrammarError::UnbrokenLeftRecursion(grammar.describe(cycle)));
    }
    Ok(())
}
