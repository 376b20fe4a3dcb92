//! Configuration for grammar preparation and for parsing.

use crate::error::{ErrorHandler, FarthestErrors};
use crate::memo::{MemoHandler, MemoStrategy, PositionTable};
use crate::state::{SlotId, SlotRegistry, StateSlot};
use std::fmt;
use std::sync::Arc;

/// Options for [`Grammar::prepare`](crate::expr::Grammar::prepare).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PrepareOptions {
    /// Maximum number of hops when a reference targets another reference.
    pub reference_chain_limit: usize,
    pub left_recursion: LeftRecursionOptions,
    /// Reject `ZeroMore`/`OneMore` over a nullable operand.
    pub reject_nullable_repetition: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            reference_chain_limit: 100,
            left_recursion: LeftRecursionOptions::default(),
            reject_nullable_repetition: true,
        }
    }
}

/// How detected left recursion is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LeftRecursionOptions {
    /// Rewrite the grammar, wrapping each cycle-breaking node in a
    /// `LeftRecursive` marker. When `false`, detected cycles are errors.
    pub in_place: bool,
    /// Associativity of the inserted markers.
    pub left_associative: bool,
}

impl Default for LeftRecursionOptions {
    fn default() -> Self {
        Self {
            in_place: true,
            left_associative: false,
        }
    }
}

/// Creates the error handler of each parse.
pub type ErrorHandlerFactory = Arc<dyn Fn() -> Box<dyn ErrorHandler> + Send + Sync>;

/// Creates the memo store of each parse.
pub type MemoHandlerFactory = Arc<dyn Fn() -> Box<dyn MemoHandler> + Send + Sync>;

/// Configuration options for [`Parser`](crate::Parser).
///
/// # Example
///
/// ```rust
/// use strata::{MemoStrategy, ParserConfig};
///
/// let config = ParserConfig::new()
///     .with_memoization(MemoStrategy::All)
///     .with_max_steps(1_000_000);
/// assert_eq!(config.max_depth, 512);
/// assert_eq!(config.max_steps, Some(1_000_000));
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    /// Which invocations are memoized.
    pub memoization: MemoStrategy,

    /// Maximum nesting of invocations before the parse is aborted.
    pub max_depth: usize,

    /// Maximum number of invocations before the parse is aborted.
    pub max_steps: Option<u64>,

    pub error_handler: ErrorHandlerFactory,

    pub memo_handler: MemoHandlerFactory,

    slots: SlotRegistry,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            memoization: MemoStrategy::default(),
            max_depth: 512,
            max_steps: None,
            error_handler: Arc::new(|| Box::new(FarthestErrors::new())),
            memo_handler: Arc::new(|| Box::new(PositionTable::new())),
            slots: SlotRegistry::new(),
        }
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("memoization", &self.memoization)
            .field("max_depth", &self.max_depth)
            .field("max_steps", &self.max_steps)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl ParserConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_memoization(mut self, memoization: MemoStrategy) -> Self {
        self.memoization = memoization;
        self
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    #[must_use]
    pub fn with_error_handler<F, H>(mut self, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: ErrorHandler + 'static,
    {
        self.error_handler = Arc::new(move || Box::new(factory()));
        self
    }

    #[must_use]
    pub fn with_memo_handler<F, H>(mut self, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: MemoHandler + 'static,
    {
        self.memo_handler = Arc::new(move || Box::new(factory()));
        self
    }

    /// Register an extension slot; every parse gets a fresh instance from
    /// `supplier`.
    pub fn register_slot<S, F>(&mut self, supplier: F) -> SlotId<S>
    where
        S: StateSlot,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.slots.register(supplier)
    }

    #[must_use]
    pub const fn slots(&self) -> &SlotRegistry {
        &self.slots
    }
}
