//! # Error Types
//!
//! Errors come in three flavours:
//!
//! - [`GrammarError`]: a grammar that cannot be prepared (unresolved names,
//!   ambiguous clusters, unsupported whitespace). Returned before any parse.
//! - [`EngineError`]: a parse that had to be aborted (recursion or step limit,
//!   failing extension). Returned as `Err` from [`crate::Parser::parse`].
//! - [`ErrorReport`]: the user-facing farthest failure of a parse that did not
//!   match. Produced by an [`ErrorHandler`], carried in the parse result.
//!
//! [`Error`] wraps the first two for the one-call [`crate::parse`].
//!
//! Match failures themselves are not errors: they are the `false` outcome of an
//! expression and are undone by the engine.

mod report;

pub use report::{ErrorHandler, ErrorReport, FarthestErrors};

use thiserror::Error;

/// Errors raised while preparing a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("reference to undefined rule `{0}`")]
    UnresolvedReference(String),

    #[error("reference chain starting at `{name}` exceeds {limit} hops")]
    ReferenceChainTooLong { name: String, limit: usize },

    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),

    #[error("no root rule: `{0}`")]
    MissingRoot(String),

    #[error("unknown expression: {0}")]
    UnknownExpression(String),

    #[error("cluster {cluster} has several groups with precedence {precedence}")]
    AmbiguousPrecedence { cluster: String, precedence: u32 },

    #[error("repetition {0} has a nullable operand and would loop forever")]
    NullableRepetition(String),

    #[error("whitespace expression uses {0}, which has no fast path")]
    WhitespaceNotDumb(String),

    #[error("left recursion through {0} is not broken by a recursion boundary")]
    UnbrokenLeftRecursion(String),

    #[error("grammar must be prepared before parsing")]
    Unprepared,
}

/// Errors that abort a parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("recursion depth exceeded {limit} at offset {position}")]
    RecursionLimit { limit: usize, position: usize },

    #[error("step limit of {limit} reached at offset {position}")]
    StepLimit { limit: u64, position: usize },

    #[error("engine invariant violated: {0}")]
    Invariant(String),

    #[error("extension failed: {0}")]
    Extension(String),
}

/// Either kind of hard failure, for callers that prepare and parse in one go.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Format a list of alternatives as `a`, `a or b`, `a, b, or c`.
#[must_use]
pub fn format_expected_list(expected: &[String]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [one] => one.clone(),
        [a, b] => format!("{a} or {b}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}
