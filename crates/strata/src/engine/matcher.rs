use super::context::MatchContext;
use super::dumb::parse_dumb;
use super::{ParseMetrics, cluster, recursion};
use crate::config::ParserConfig;
use crate::error::{EngineError, ErrorHandler, ErrorReport};
use crate::expr::{CustomExpr, Expr, ExprFlags, ExprId, ExprKind, Grammar};
use crate::memo::{MemoHandler, MemoKey, MemoStrategy, Memoized};
use crate::state::ParseState;
use crate::text::Text;

/// Folded into the memo fingerprint while errors are being recorded.
const RECORDING: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-parse engine: the read-only grammar and text plus the mutable stores
/// that are not part of the transactional state.
pub(crate) struct Matcher<'p> {
    pub(super) grammar: &'p Grammar,
    pub(super) text: &'p Text,
    config: &'p ParserConfig,
    memo: Box<dyn MemoHandler>,
    errors: Box<dyn ErrorHandler>,
    depth: usize,
    pub(super) metrics: ParseMetrics,
}

impl<'p> Matcher<'p> {
    pub(crate) fn new(grammar: &'p Grammar, text: &'p Text, config: &'p ParserConfig) -> Self {
        Self {
            grammar,
            text,
            config,
            memo: (config.memo_handler)(),
            errors: (config.error_handler)(),
            depth: 0,
            metrics: ParseMetrics::default(),
        }
    }

    pub(crate) fn report(&self) -> Option<ErrorReport> {
        self.errors.report(self.grammar, self.text)
    }

    pub(crate) const fn metrics(&self) -> ParseMetrics {
        self.metrics
    }

    fn memoizes(&self, expr: &Expr) -> bool {
        match self.config.memoization {
            MemoStrategy::None => false,
            MemoStrategy::Rules => expr.flags.contains(ExprFlags::MEMOIZE),
            MemoStrategy::All => !matches!(
                expr.kind,
                ExprKind::Literal(_) | ExprKind::Any | ExprKind::CharRange(..) | ExprKind::CharSet(_)
            ),
        }
    }

    fn fingerprint(state: &ParseState) -> u64 {
        let recording = if state.record_errors() { RECORDING } else { 0 };
        state.fingerprint() ^ recording
    }

    fn record_failure(&mut self, state: &ParseState, id: ExprId, expr: &Expr) {
        if state.record_errors() && expr.records_errors() {
            self.errors.record(id, state.end());
        }
    }

    /// Invoke `id` at the current end position.
    ///
    /// Must be called with an empty uncommitted view. On success the view holds
    /// exactly the effects of this invocation; on failure the state is as it
    /// was before the call.
    pub(crate) fn invoke(&mut self, state: &mut ParseState, id: ExprId) -> Result<bool, EngineError> {
        debug_assert_eq!(state.start(), state.end(), "invoked with a pending uncommitted view");
        let position = state.end();

        self.metrics.invocations += 1;
        if let Some(limit) = self.config.max_steps
            && self.metrics.invocations > limit
        {
            return Err(EngineError::StepLimit { limit, position });
        }
        if self.depth >= self.config.max_depth {
            return Err(EngineError::RecursionLimit {
                limit: self.config.max_depth,
                position,
            });
        }

        let grammar = self.grammar;
        let expr = grammar.get(id);
        let key = self
            .memoizes(expr)
            .then(|| MemoKey::new(id, position, Self::fingerprint(state)));

        if let Some(key) = &key
            && let Some(outcome) = self.memo.get(key).cloned()
        {
            self.metrics.memo_hits += 1;
            tracing::trace!(expr = %id, position, "memo hit");
            return Ok(match outcome {
                Memoized::Success(changes) => {
                    state.merge(&changes);
                    true
                }
                Memoized::Failure => {
                    self.record_failure(state, id, expr);
                    false
                }
            });
        }

        self.depth += 1;
        let outcome = self.dispatch(state, id, expr);
        self.depth -= 1;
        let matched = outcome?;

        if let Some(key) = key {
            self.metrics.memo_misses += 1;
            let memoized = if matched {
                Memoized::Success(state.extract())
            } else {
                Memoized::Failure
            };
            self.memo.insert(key, memoized);
        }
        if !matched {
            self.record_failure(state, id, expr);
        }
        Ok(matched)
    }

    fn dispatch(&mut self, state: &mut ParseState, id: ExprId, expr: &'p Expr) -> Result<bool, EngineError> {
        let position = state.end();
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Self::terminal(state, self.text.match_literal(position, literal))),
            ExprKind::Any => Ok(Self::terminal(state, self.text.at(position).map(|_| position + 1))),
            ExprKind::CharRange(lo, hi) => {
                let end = self
                    .text
                    .at(position)
                    .filter(|c| (*lo..=*hi).contains(c))
                    .map(|_| position + 1);
                Ok(Self::terminal(state, end))
            }
            ExprKind::CharSet(chars) => {
                let end = self
                    .text
                    .at(position)
                    .filter(|c| chars.contains(c))
                    .map(|_| position + 1);
                Ok(Self::terminal(state, end))
            }
            ExprKind::Sequence(items) => self.sequence(state, items),
            ExprKind::Choice(items) => {
                for &item in items {
                    if self.invoke(state, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ExprKind::Optional(operand) => {
                self.invoke(state, *operand)?;
                Ok(true)
            }
            ExprKind::ZeroMore(operand) => self.repeat(state, *operand, 0),
            ExprKind::OneMore(operand) => self.repeat(state, *operand, 1),
            ExprKind::Lookahead(operand) => {
                if self.invoke(state, *operand)? {
                    state.discard();
                    return Ok(true);
                }
                Ok(false)
            }
            ExprKind::Not(operand) => {
                let recording = state.set_record_errors(false);
                let outcome = self.invoke(state, *operand);
                state.set_record_errors(recording);
                if outcome? {
                    state.discard();
                    return Ok(false);
                }
                Ok(true)
            }
            ExprKind::Token(operand) => {
                if !self.invoke(state, *operand)? {
                    return Ok(false);
                }
                if let Some(whitespace) = self.grammar.whitespace()
                    && let Some(end) = parse_dumb(self.grammar, whitespace, self.text, state.end())
                {
                    state.advance_to(end);
                }
                Ok(true)
            }
            ExprKind::Capture { operand, mode } => {
                let base = state.captures().len();
                if !self.invoke(state, *operand)? {
                    return Ok(false);
                }
                let span = position..state.end();
                let text = mode.capture_text.then(|| self.text.slice(span.clone()).into());
                state.capture.close(base, mode, span, text);
                Ok(true)
            }
            ExprKind::LeftRecursive {
                operand,
                left_associative,
            } => recursion::left_recursive(self, state, id, *operand, *left_associative),
            ExprKind::Cluster(groups) => cluster::cluster(self, state, id, groups),
            ExprKind::WithMinPrecedence { operand, precedence } => {
                recursion::with_min_precedence(self, state, *operand, *precedence)
            }
            ExprKind::Reference(name) => Err(EngineError::Invariant(format!(
                "unresolved reference `{name}` reached the engine"
            ))),
            ExprKind::Custom(custom) => self.custom(state, id, custom),
        }
    }

    fn terminal(state: &mut ParseState, end: Option<usize>) -> bool {
        match end {
            Some(end) => {
                state.advance_to(end);
                true
            }
            None => false,
        }
    }

    fn sequence(&mut self, state: &mut ParseState, items: &[ExprId]) -> Result<bool, EngineError> {
        let snapshot = state.snapshot();
        for &item in items {
            if !self.invoke(state, item)? {
                state.restore(&snapshot);
                return Ok(false);
            }
            state.commit();
        }
        state.uncommit(&snapshot);
        Ok(true)
    }

    fn repeat(&mut self, state: &mut ParseState, operand: ExprId, min: usize) -> Result<bool, EngineError> {
        let snapshot = state.snapshot();
        let mut count = 0;
        loop {
            let before = state.end();
            if !self.invoke(state, operand)? {
                break;
            }
            if state.end() == before {
                state.discard();
                break;
            }
            state.commit();
            count += 1;
        }
        if count < min {
            state.restore(&snapshot);
            return Ok(false);
        }
        state.uncommit(&snapshot);
        Ok(true)
    }

    fn custom(&mut self, state: &mut ParseState, id: ExprId, custom: &CustomExpr) -> Result<bool, EngineError> {
        let snapshot = state.snapshot();
        let outcome = {
            let mut context = MatchContext::new(self, state, id);
            (custom.matcher)(&mut context)
        };
        match outcome {
            Ok(true) => {
                state.uncommit(&snapshot);
                Ok(true)
            }
            Ok(false) => {
                state.restore(&snapshot);
                Ok(false)
            }
            Err(e) => {
                state.restore(&snapshot);
                Err(e)
            }
        }
    }
}
