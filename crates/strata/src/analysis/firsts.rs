use super::Nullability;
use crate::expr::{ExprId, ExprKind, Grammar};
use smallvec::SmallVec;

/// Children of `id` that may be invoked at the same position as `id` itself.
///
/// For a sequence these are the children up to and including the first one
/// that is not nullable; for every other variant, all children.
#[must_use]
pub fn firsts(grammar: &Grammar, nullability: &Nullability, id: ExprId) -> SmallVec<[ExprId; 4]> {
    match grammar.kind(id) {
        ExprKind::Sequence(items) => {
            let mut firsts = SmallVec::new();
            for &item in items {
                firsts.push(item);
                if !nullability.is_nullable(item) {
                    break;
                }
            }
            firsts
        }
        _ => grammar.children(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute_nullability;
    use crate::expr::Peg;

    #[test]
    fn sequence_stops_after_first_non_nullable() {
        let mut g = Grammar::new();
        let opt = g.insert(Peg::opt(Peg::lit("a")));
        let b = g.insert(Peg::lit("b"));
        let c = g.insert(Peg::lit("c"));
        let seq = g.insert(Peg::seq([Peg::Id(opt), Peg::Id(b), Peg::Id(c)]));
        let choice = g.insert(Peg::choice([Peg::Id(b), Peg::Id(c)]));
        let n = compute_nullability(&g);

        assert_eq!(firsts(&g, &n, seq).as_slice(), &[opt, b]);
        assert_eq!(firsts(&g, &n, choice).as_slice(), &[b, c]);
        assert!(firsts(&g, &n, b).is_empty());
    }
}
