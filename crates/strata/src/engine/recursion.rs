//! Seed growing for `LeftRecursive` nodes, and precedence resets.
//!
//! Invoking a left-recursive node `N` at position `P` installs a failing seed
//! for `(N, P)` and runs the operand. Any re-entry into `N` at `P` replays the
//! current seed instead of recursing. Each time the operand gets farther than
//! the seed, its changes become the new seed and the operand runs again; the
//! loop stops at the first run that fails or does not get farther.
//!
//! A left-associative node is blocked while it grows: a re-entry at another
//! position (a right operand) parses the operand once, without growing, so
//! `1+2+3` nests to the left.

use super::matcher::Matcher;
use crate::error::EngineError;
use crate::expr::ExprId;
use crate::state::{ParseChanges, ParseState};

pub(super) fn left_recursive(
    matcher: &mut Matcher<'_>,
    state: &mut ParseState,
    id: ExprId,
    operand: ExprId,
    left_associative: bool,
) -> Result<bool, EngineError> {
    let position = state.end();
    if let Some(seed) = state.seeds.get(id, position).cloned() {
        return Ok(replay(state, seed.as_ref()));
    }

    if left_associative && state.seeds.is_blocked(id) {
        state.seeds.insert(id, position, None);
        let blocked = state.seeds.set_blocked(id, false);
        let outcome = matcher.invoke(state, operand);
        state.seeds.set_blocked(id, blocked);
        state.seeds.remove(id, position);
        return outcome;
    }

    state.seeds.insert(id, position, None);
    let blocked = left_associative.then(|| state.seeds.set_blocked(id, true));
    let grown = grow(matcher, state, id, position, operand);
    if let Some(blocked) = blocked {
        state.seeds.set_blocked(id, blocked);
    }
    state.seeds.remove(id, position);
    Ok(replay(state, grown?.as_ref()))
}

/// Merge a seed into the uncommitted view; a missing seed is a failure.
pub(super) fn replay(state: &mut ParseState, seed: Option<&ParseChanges>) -> bool {
    match seed {
        Some(changes) => {
            state.merge(changes);
            true
        }
        None => false,
    }
}

fn grow(
    matcher: &mut Matcher<'_>,
    state: &mut ParseState,
    id: ExprId,
    position: usize,
    operand: ExprId,
) -> Result<Option<ParseChanges>, EngineError> {
    let snapshot = state.snapshot();
    let mut best: Option<ParseChanges> = None;
    loop {
        if !matcher.invoke(state, operand)? {
            break;
        }
        if best.as_ref().is_some_and(|seed| state.end() <= seed.end()) {
            state.restore(&snapshot);
            break;
        }
        let changes = state.extract();
        state.restore(&snapshot);
        tracing::trace!(expr = %id, position, end = changes.end(), "seed grew");
        matcher.metrics.seed_iterations += 1;
        state.seeds.insert(id, position, Some(changes.clone()));
        best = Some(changes);
    }
    Ok(best)
}

/// Parse `operand` with every cluster floor set to `precedence` and no node
/// blocked, restoring both afterwards.
pub(super) fn with_min_precedence(
    matcher: &mut Matcher<'_>,
    state: &mut ParseState,
    operand: ExprId,
    precedence: u32,
) -> Result<bool, EngineError> {
    let frame = state.precedence.override_all(precedence);
    let blocked = state.seeds.take_blocked();
    let outcome = matcher.invoke(state, operand);
    state.seeds.restore_blocked(blocked);
    state.precedence.restore_frame(frame);
    outcome
}
