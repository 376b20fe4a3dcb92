//! # Memoization
//!
//! Packrat memoization of invocation outcomes. A [`MemoKey`] names the
//! expression, the position and a fingerprint of every piece of parse state
//! that can change the outcome (seeds, precedence floors, extension slots, the
//! error-recording flag). The stored [`Memoized`] outcome is replayed with
//! [`ParseState::merge`](crate::state::ParseState::merge) instead of running the
//! expression again.

mod table;

pub use table::PositionTable;

use crate::expr::ExprId;
use crate::state::ParseChanges;

/// Which invocations are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoStrategy {
    /// No memoization.
    None,
    /// Expressions flagged `MEMOIZE` (named rules).
    #[default]
    Rules,
    /// Every non-terminal expression.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub expr: ExprId,
    pub position: usize,
    pub fingerprint: u64,
}

impl MemoKey {
    #[must_use]
    pub const fn new(expr: ExprId, position: usize, fingerprint: u64) -> Self {
        Self {
            expr,
            position,
            fingerprint,
        }
    }
}

/// Outcome of a memoized invocation.
#[derive(Debug, Clone)]
pub enum Memoized {
    Failure,
    Success(ParseChanges),
}

/// Storage for memoized outcomes. One handler lives for one parse.
pub trait MemoHandler {
    fn get(&self, key: &MemoKey) -> Option<&Memoized>;
    fn insert(&mut self, key: MemoKey, outcome: Memoized);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
