//! # Matching Engine
//!
//! Recursive-descent interpretation of a prepared [`Grammar`].
//!
//! Every expression is invoked through one entry point that consults the memo
//! store, enforces the depth and step limits, dispatches on the variant and
//! records failures for error reporting. All bookkeeping flows through the
//! [`ParseState`] slot protocol, so a failed invocation leaves the state as it
//! found it.
//!
//! ## Example
//!
//! ```rust
//! use strata::expr::{GrammarBuilder, Peg};
//! use strata::{Parser, ParserConfig};
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("greeting", Peg::seq([Peg::lit("hello").token(), Peg::rule("name")]))
//!     .rule("name", Peg::plus(Peg::range('a', 'z')).text("name"))
//!     .whitespace(Peg::star(Peg::lit(" ")))
//!     .build()
//!     .expect("valid grammar");
//!
//! let parser = Parser::new(&grammar, ParserConfig::default()).expect("prepared");
//! let result = parser.parse("hello world").expect("no engine error");
//! assert!(result.matched);
//! assert_eq!(result.tree.get("name").and_then(|n| n.text()), Some("world"));
//! ```

mod cluster;
mod context;
mod dumb;
mod matcher;
mod recursion;

pub use context::MatchContext;
pub use dumb::{parse_dumb, supports_dumb};

use crate::capture::CaptureTree;
use crate::config::ParserConfig;
use crate::error::{EngineError, ErrorReport, GrammarError};
use crate::expr::{ExprId, Grammar};
use crate::state::ParseState;
use crate::text::Text;
use matcher::Matcher;
use std::time::{Duration, Instant};

/// Counters collected during one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseMetrics {
    pub parse_time: Duration,
    /// Expression invocations, memo hits included
    pub invocations: u64,
    pub memo_hits: u64,
    pub memo_misses: u64,
    /// Seeds installed by left recursion and clusters
    pub seed_iterations: u64,
}

/// Outcome of [`Parser::parse`].
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The root matched and consumed the whole input.
    pub matched: bool,
    /// The root matched, possibly only a prefix.
    pub succeeded: bool,
    /// Where the root match ended; 0 if it failed.
    pub end_position: usize,
    pub tree: CaptureTree,
    /// Farthest failure, set whenever `matched` is false.
    pub error: Option<ErrorReport>,
    pub metrics: ParseMetrics,
}

impl ParseResult {
    /// The capture tree as an s-expression, for tests and debugging.
    #[must_use]
    pub fn sexpr(&self) -> String {
        self.tree.to_sexpr()
    }
}

/// A prepared grammar paired with a configuration.
///
/// The grammar is only read; each call to [`Parser::parse`] owns a fresh
/// [`ParseState`], memo store and error handler.
#[derive(Debug)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    root: ExprId,
    config: ParserConfig,
}

impl<'g> Parser<'g> {
    /// # Errors
    ///
    /// [`GrammarError::Unprepared`] if the grammar has not been through
    /// [`Grammar::prepare`] since its last change, and
    /// [`GrammarError::MissingRoot`] if it has no root.
    pub fn new(grammar: &'g Grammar, config: ParserConfig) -> Result<Self, GrammarError> {
        if !grammar.is_prepared() {
            return Err(GrammarError::Unprepared);
        }
        let root = grammar
            .root()
            .ok_or_else(|| GrammarError::MissingRoot("<unset>".to_string()))?;
        Ok(Self { grammar, root, config })
    }

    #[must_use]
    pub const fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Match the root expression against `source`.
    ///
    /// # Errors
    ///
    /// Only fatal conditions are errors: the depth or step limit being hit, or
    /// a custom expression failing hard. A text that does not match is an
    /// `Ok` result with `succeeded` or `matched` false.
    #[tracing::instrument(skip_all, fields(len = source.len()))]
    pub fn parse(&self, source: &str) -> Result<ParseResult, EngineError> {
        let started = Instant::now();
        let text = Text::new(source);
        let mut state = ParseState::new(self.config.slots());
        let mut matcher = Matcher::new(self.grammar, &text, &self.config);

        let succeeded = matcher.invoke(&mut state, self.root)?;
        let end_position = if succeeded {
            state.commit();
            state.end()
        } else {
            0
        };
        let matched = succeeded && end_position == text.len();

        let error = (!matched).then(|| {
            matcher
                .report()
                .filter(|report| report.position >= end_position)
                .unwrap_or_else(|| ErrorReport::new(&text, end_position, ["end of input".to_string()]))
        });
        let tree = state.captures().finish(0..end_position);

        let mut metrics = matcher.metrics();
        metrics.parse_time = started.elapsed();
        tracing::debug!(
            matched,
            succeeded,
            end_position,
            invocations = metrics.invocations,
            memo_hits = metrics.memo_hits,
            "parse finished"
        );

        Ok(ParseResult {
            matched,
            succeeded,
            end_position,
            tree,
            error,
            metrics,
        })
    }
}

/// Parse `source` with a prepared grammar in one call.
///
/// # Errors
///
/// [`crate::Error::Grammar`] if the grammar cannot be parsed with, and
/// [`crate::Error::Engine`] for fatal parse errors.
pub fn parse(grammar: &Grammar, source: &str, config: ParserConfig) -> Result<ParseResult, crate::Error> {
    Ok(Parser::new(grammar, config)?.parse(source)?)
}
