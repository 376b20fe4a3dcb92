//! Precedence climbing over an expression cluster.
//!
//! A cluster `C` invoked at `P` walks its groups from the highest precedence
//! down to the current floor of `C`. While a group runs, the floor is raised to
//! the group's precedence (one above it for left-associative groups), so
//! recursive occurrences of `C` inside an alternative only see that group and
//! tighter ones. Left recursion at `P` replays the seed built so far: an
//! alternative that gets farther than the seed replaces it, and growing groups
//! are retried until no alternative progresses.

use super::matcher::Matcher;
use super::recursion::replay;
use crate::error::EngineError;
use crate::expr::{ExprId, Group, GroupKind};
use crate::state::{ParseChanges, ParseState};

pub(super) fn cluster(
    matcher: &mut Matcher<'_>,
    state: &mut ParseState,
    id: ExprId,
    groups: &[Group],
) -> Result<bool, EngineError> {
    let position = state.end();
    if let Some(seed) = state.seeds.get(id, position).cloned() {
        return Ok(replay(state, seed.as_ref()));
    }

    state.seeds.insert(id, position, None);
    let floor = state.precedence.floor(id);
    let mut previous = None;
    let mut best = None;
    let mut outcome = Ok(());
    for group in groups.iter().take_while(|g| g.precedence >= floor) {
        let level = match group.kind {
            GroupKind::LeftAssociative => group.precedence.saturating_add(1),
            GroupKind::None | GroupKind::LeftRecursive => group.precedence,
        };
        let replaced = state.precedence.set_floor(id, level);
        previous.get_or_insert(replaced);
        match climb(matcher, state, id, position, group, best.take()) {
            Ok(grown) => best = grown,
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    if let Some(previous) = previous {
        state.precedence.reset_floor(id, previous);
    }
    state.seeds.remove(id, position);
    outcome?;
    Ok(replay(state, best.as_ref()))
}

/// Run one group until none of its alternatives gets farther than `best`.
fn climb(
    matcher: &mut Matcher<'_>,
    state: &mut ParseState,
    id: ExprId,
    position: usize,
    group: &Group,
    mut best: Option<ParseChanges>,
) -> Result<Option<ParseChanges>, EngineError> {
    let snapshot = state.snapshot();
    loop {
        let mut progressed = false;
        for &alternative in &group.alternatives {
            if !matcher.invoke(state, alternative)? {
                continue;
            }
            if best.as_ref().is_some_and(|seed| state.end() <= seed.end()) {
                state.restore(&snapshot);
                continue;
            }
            let changes = state.extract();
            state.restore(&snapshot);
            tracing::trace!(expr = %id, position, precedence = group.precedence, end = changes.end(), "cluster seed grew");
            matcher.metrics.seed_iterations += 1;
            state.seeds.insert(id, position, Some(changes.clone()));
            best = Some(changes);
            progressed = true;
            break;
        }
        if !progressed || !group.kind.grows() {
            return Ok(best);
        }
    }
}
