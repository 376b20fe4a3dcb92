use super::matcher::Matcher;
use crate::error::EngineError;
use crate::expr::{ExprId, ExprKind, Grammar};
use crate::state::{ParseState, SlotId, StateSlot};
use crate::text::Text;

/// What a [`Custom`](crate::expr::ExprKind::Custom) expression sees while it
/// runs.
///
/// Everything done through the context is part of the custom expression's
/// result: if the closure returns `Ok(false)` or an error, the engine rolls
/// the state back to where the expression started.
///
/// # Example
///
/// A custom expression matching a run of digits and recording how many it saw:
///
/// ```rust
/// use strata::expr::{CustomExpr, GrammarBuilder, Peg};
/// use strata::{Parser, ParserConfig};
///
/// let digits = CustomExpr::new("digits", Vec::new(), |cx| {
///     let count = cx.remaining().iter().take_while(|c| c.is_ascii_digit()).count();
///     cx.advance(count);
///     Ok(count > 0)
/// });
/// let grammar = GrammarBuilder::new()
///     .rule("number", Peg::Custom(digits).text("n"))
///     .build()
///     .expect("valid grammar");
/// let result = Parser::new(&grammar, ParserConfig::default())
///     .expect("prepared")
///     .parse("2024")
///     .expect("no engine error");
/// assert!(result.matched);
/// ```
pub struct MatchContext<'m, 'p> {
    matcher: &'m mut Matcher<'p>,
    state: &'m mut ParseState,
    expr: ExprId,
}

impl<'m, 'p> MatchContext<'m, 'p> {
    pub(super) fn new(matcher: &'m mut Matcher<'p>, state: &'m mut ParseState, expr: ExprId) -> Self {
        Self { matcher, state, expr }
    }

    /// The custom expression being run.
    #[must_use]
    pub const fn expr(&self) -> ExprId {
        self.expr
    }

    #[must_use]
    pub fn grammar(&self) -> &'p Grammar {
        self.matcher.grammar
    }

    #[must_use]
    pub fn text(&self) -> &'p Text {
        self.matcher.text
    }

    /// Current position, in characters.
    #[must_use]
    pub fn position(&self) -> usize {
        self.state.end()
    }

    /// Input from the current position on.
    #[must_use]
    pub fn remaining(&self) -> &'p [char] {
        let chars = self.matcher.text.chars();
        &chars[self.state.end().min(chars.len())..]
    }

    /// Move to `position`, which must not be before the current one or past the
    /// end of input.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of that range.
    pub fn advance_to(&mut self, position: usize) {
        assert!(
            position >= self.state.end() && position <= self.matcher.text.len(),
            "custom expression moved to {position} from {}",
            self.state.end()
        );
        self.state.advance_to(position);
        self.state.commit();
    }

    /// Skip `count` characters.
    pub fn advance(&mut self, count: usize) {
        self.advance_to(self.state.end() + count);
    }

    /// Invoke `id` at the current position. On success the position moves past
    /// what it matched; on failure nothing changes.
    ///
    /// # Errors
    ///
    /// Propagates fatal engine errors from the child.
    pub fn invoke(&mut self, id: ExprId) -> Result<bool, EngineError> {
        self.state.commit();
        let matched = self.matcher.invoke(self.state, id)?;
        if matched {
            self.state.commit();
        }
        Ok(matched)
    }

    /// Children declared by the custom expression being run.
    #[must_use]
    pub fn children(&self) -> &'p [ExprId] {
        match self.matcher.grammar.kind(self.expr) {
            ExprKind::Custom(custom) => &custom.children,
            _ => &[],
        }
    }

    /// The whole parse state, read-only.
    #[must_use]
    pub fn state(&self) -> &ParseState {
        self.state
    }

    #[must_use]
    pub fn slot<S: StateSlot>(&self, id: SlotId<S>) -> &S {
        self.state.slot(id)
    }

    /// Mutable access to an extension slot. Changes go into the uncommitted
    /// view and are rolled back with the rest of the state.
    pub fn slot_mut<S: StateSlot>(&mut self, id: SlotId<S>) -> &mut S {
        self.state.slot_mut(id)
    }
}
