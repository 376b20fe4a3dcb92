//! Fast path for character-level expressions.
//!
//! `parse_dumb` matches without touching the parse state: no captures, no
//! memoization, no error recording. It is used to skip whitespace after
//! tokens. Only variants that need no engine support have a fast path.

use crate::expr::{ExprId, ExprKind, Grammar};
use crate::text::Text;
use crate::walk::{GraphWalker, Visit, Visitor};
use smallvec::SmallVec;

/// Match `id` at `position`, returning the end position.
///
/// Variants without a fast path never match; [`supports_dumb`] tells them apart.
#[must_use]
pub fn parse_dumb(grammar: &Grammar, id: ExprId, text: &Text, position: usize) -> Option<usize> {
    match grammar.kind(id) {
        ExprKind::Literal(literal) => text.match_literal(position, literal),
        ExprKind::Any => text.at(position).map(|_| position + 1),
        ExprKind::CharRange(lo, hi) => text
            .at(position)
            .filter(|c| (*lo..=*hi).contains(c))
            .map(|_| position + 1),
        ExprKind::CharSet(chars) => text
            .at(position)
            .filter(|c| chars.contains(c))
            .map(|_| position + 1),
        ExprKind::Sequence(items) => items
            .iter()
            .try_fold(position, |at, item| parse_dumb(grammar, *item, text, at)),
        ExprKind::Choice(items) => items
            .iter()
            .find_map(|item| parse_dumb(grammar, *item, text, position)),
        ExprKind::Optional(e) => Some(parse_dumb(grammar, *e, text, position).unwrap_or(position)),
        ExprKind::ZeroMore(e) => Some(repeat_dumb(grammar, *e, text, position)),
        ExprKind::OneMore(e) => {
            let first = parse_dumb(grammar, *e, text, position)?;
            Some(repeat_dumb(grammar, *e, text, first))
        }
        ExprKind::Lookahead(e) => parse_dumb(grammar, *e, text, position).map(|_| position),
        ExprKind::Not(e) => match parse_dumb(grammar, *e, text, position) {
            Some(_) => None,
            None => Some(position),
        },
        ExprKind::Capture { operand, .. } | ExprKind::WithMinPrecedence { operand, .. } => {
            parse_dumb(grammar, *operand, text, position)
        }
        ExprKind::Token(_)
        | ExprKind::LeftRecursive { .. }
        | ExprKind::Cluster(_)
        | ExprKind::Reference(_)
        | ExprKind::Custom(_) => None,
    }
}

fn repeat_dumb(grammar: &Grammar, id: ExprId, text: &Text, mut position: usize) -> usize {
    while let Some(end) = parse_dumb(grammar, id, text, position) {
        if end == position {
            break;
        }
        position = end;
    }
    position
}

struct Support<'g> {
    grammar: &'g Grammar,
    unsupported: Option<ExprId>,
}

impl Visitor for Support<'_> {
    type Output = ();

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn before(&mut self, id: ExprId, _depth: usize) {
        let fast = !matches!(
            self.grammar.kind(id),
            ExprKind::Token(_)
                | ExprKind::LeftRecursive { .. }
                | ExprKind::Cluster(_)
                | ExprKind::Reference(_)
                | ExprKind::Custom(_)
        );
        if !fast && self.unsupported.is_none() {
            self.unsupported = Some(id);
        }
    }

    fn after(&mut self, _id: ExprId, _depth: usize, _edges: &[(ExprId, Visit<()>)]) {}
}

/// Check that everything reachable from `id` has a fast path; returns the
/// first expression that does not.
///
/// # Errors
///
/// The offending expression.
pub fn supports_dumb(grammar: &Grammar, id: ExprId) -> Result<(), ExprId> {
    let mut support = Support {
        grammar,
        unsupported: None,
    };
    GraphWalker::new().walk(&mut support, id);
    support.unsupported.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Peg;

    #[test]
    fn whitespace_and_comments() {
        let mut g = Grammar::new();
        let ws = g.insert(Peg::star(Peg::choice([
            Peg::set(" \t\n"),
            Peg::seq([
                Peg::lit("#"),
                Peg::star(Peg::seq([Peg::not(Peg::lit("\n")), Peg::any()])),
            ]),
        ])));
        let text = Text::new("  # note\n  x");
        assert_eq!(parse_dumb(&g, ws, &text, 0), Some(11));
        assert_eq!(parse_dumb(&g, ws, &text, 11), Some(11));
        assert!(supports_dumb(&g, ws).is_ok());
    }

    #[test]
    fn predicates_do_not_advance() {
        let mut g = Grammar::new();
        let and = g.insert(Peg::and(Peg::range('a', 'z')));
        let not = g.insert(Peg::not(Peg::range('a', 'z')));
        let plus = g.insert(Peg::plus(Peg::range('0', '9')));
        let text = Text::new("a1");
        assert_eq!(parse_dumb(&g, and, &text, 0), Some(0));
        assert_eq!(parse_dumb(&g, not, &text, 0), None);
        assert_eq!(parse_dumb(&g, not, &text, 1), Some(1));
        assert_eq!(parse_dumb(&g, plus, &text, 0), None);
        assert_eq!(parse_dumb(&g, plus, &text, 1), Some(2));
    }

    #[test]
    fn unsupported_variants_are_reported() {
        let mut g = Grammar::new();
        let reference = g.insert(Peg::rule("x"));
        let ws = g.insert(Peg::star(Peg::Id(reference)));
        assert_eq!(supports_dumb(&g, ws), Err(reference));
    }
}
