//! # Strata
//!
//! A parsing expression grammar (PEG) engine with left recursion, precedence
//! clusters and a transactional, extensible parse state.
//!
//! ## Overview
//!
//! - **Expression graph**: grammars are arenas of expressions addressed by
//!   [`ExprId`]; shared sub-expressions and recursive rules are id reuse
//! - **Preparation**: reference resolution, nullability, left-recursion
//!   breaking and validation run once, through [`Grammar::prepare`]
//! - **Left recursion**: `LeftRecursive` nodes grow seeds until a fixed point;
//!   the left-associative flavour nests operators to the left
//! - **Precedence clusters**: operator levels with associativity, parsed by
//!   precedence climbing without a rule per tier
//! - **Packrat memoization**: outcomes are keyed by expression, position and
//!   a fingerprint of the parse state, and replayed rather than recomputed
//! - **Extensible state**: extensions register [`StateSlot`]s that take part in
//!   backtracking and memoization like the built-in capture tree
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::expr::{GrammarBuilder, GroupKind, Peg, PegGroup};
//! use strata::{Parser, ParserConfig};
//!
//! let number = Peg::plus(Peg::range('0', '9')).text("num").token();
//! let binary = |op: &str| {
//!     Peg::seq([Peg::rule("expr"), Peg::lit(op).token(), Peg::rule("expr")]).node(op)
//! };
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "expr",
//!         Peg::cluster([
//!             PegGroup::new(3, GroupKind::None, [number]),
//!             PegGroup::new(2, GroupKind::LeftAssociative, [binary("*")]),
//!             PegGroup::new(1, GroupKind::LeftAssociative, [binary("+")]),
//!         ]),
//!     )
//!     .whitespace(Peg::star(Peg::set(" \t")))
//!     .build()
//!     .expect("valid grammar");
//!
//! let parser = Parser::new(&grammar, ParserConfig::default()).expect("prepared grammar");
//! let result = parser.parse("1 + 2 * 3").expect("no engine error");
//! assert!(result.matched);
//! assert_eq!(result.sexpr(), "(_ (+ 1 (* 2 3)))");
//! ```
//!
//! ## Error Reporting
//!
//! A text that does not match is not an error: [`ParseResult::error`] carries
//! the farthest position where an error-recording expression failed, and what
//! was expected there.
//!
//! ```rust
//! use strata::expr::{GrammarBuilder, Peg};
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("A", Peg::seq([Peg::lit("a"), Peg::lit("b")]))
//!     .build()
//!     .expect("valid grammar");
//! let result = strata::parse(&grammar, "ax", strata::ParserConfig::default()).expect("no hard error");
//! let error = result.error.expect("failed parse has a report");
//! assert_eq!(error.position, 1);
//! assert_eq!(error.expected, vec!["\"b\"".to_string()]);
//! ```

pub mod analysis;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod memo;
pub mod state;
pub mod testing;
pub mod text;
pub mod walk;

// Re-export commonly used types
pub use capture::{CaptureNode, CaptureTree};
pub use config::{LeftRecursionOptions, ParserConfig, PrepareOptions};
pub use engine::{MatchContext, ParseMetrics, ParseResult, Parser, parse};
pub use error::{EngineError, Error, ErrorHandler, ErrorReport, GrammarError};
pub use expr::{ExprId, ExprKind, Grammar, GrammarBuilder, Peg};
pub use memo::MemoStrategy;
pub use state::{ParseState, SlotId, StateSlot};
