//! # Grammar Analysis
//!
//! Graph passes run once over a grammar before it is handed to the engine.
//!
//! [`Grammar::prepare`] chains them in a fixed order:
//!
//! 1. **References**: every `Reference` edge is pointed at the named node
//!    ([`resolve_references`]).
//! 2. **Nullability**: least fixed point over the graph ([`compute_nullability`]).
//! 3. **Left recursion**: first-position cycles are detected and each is broken
//!    by wrapping one node in a `LeftRecursive` marker ([`break_left_recursion`]).
//! 4. **Validation**: whatever the engine cannot run is rejected ([`validate`]).
//!
//! Each pass is also usable on its own.

mod firsts;
mod left_recursion;
mod metrics;
mod nullable;
mod resolve;
mod validate;

pub use firsts::firsts;
pub use left_recursion::{break_left_recursion, detect_left_recursion};
pub use metrics::{GrammarMetrics, grammar_summary};
pub use nullable::{Nullability, Strategy, compute_nullability};
pub use resolve::resolve_references;
pub use validate::validate;

use crate::config::PrepareOptions;
use crate::error::GrammarError;
use crate::expr::{ExprId, Grammar};
use crate::walk::{GraphWalker, Visit, Visitor};
use smallvec::SmallVec;

struct Reach<'g> {
    grammar: &'g Grammar,
    order: Vec<ExprId>,
}

impl Visitor for Reach<'_> {
    type Output = ();

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn before(&mut self, id: ExprId, _depth: usize) {
        self.order.push(id);
    }

    fn after(&mut self, _id: ExprId, _depth: usize, _edges: &[(ExprId, Visit<()>)]) {}
}

/// Nodes reachable from the root, the rules and the whitespace, in visit order.
#[must_use]
pub fn reachable(grammar: &Grammar) -> Vec<ExprId> {
    let mut reach = Reach {
        grammar,
        order: Vec::new(),
    };
    let mut walker = GraphWalker::new();
    let entry_points = grammar
        .root()
        .into_iter()
        .chain(grammar.rules().into_iter().map(|(_, id)| id))
        .chain(grammar.whitespace());
    for id in entry_points {
        walker.walk(&mut reach, id);
    }
    reach.order
}

/// What [`Grammar::prepare`] did to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrepareReport {
    /// Reference edges rewritten
    pub references: usize,
    /// Nodes wrapped in a `LeftRecursive` marker
    pub left_recursive: Vec<ExprId>,
    /// Nullable expressions after the rewrite
    pub nullable: usize,
}

impl Grammar {
    /// Run every preprocessing pass and mark the grammar ready for parsing.
    ///
    /// # Errors
    ///
    /// - [`GrammarError::MissingRoot`] if no root is set
    /// - any error from [`resolve_references`] or [`validate`]
    /// - [`GrammarError::UnbrokenLeftRecursion`] when left recursion is found
    ///   and `options.left_recursion.in_place` is off
    pub fn prepare(&mut self, options: &PrepareOptions) -> Result<PrepareReport, GrammarError> {
        if self.root().is_none() {
            return Err(GrammarError::MissingRoot("<unset>".to_string()));
        }
        let references = resolve_references(self, options.reference_chain_limit)?;
        let mut nullability = compute_nullability(self);

        let left_recursive = if options.left_recursion.in_place {
            let wrapped = break_left_recursion(self, &nullability, &options.left_recursion);
            if !wrapped.is_empty() {
                nullability = compute_nullability(self);
            }
            wrapped
        } else {
            Vec::new()
        };

        validate(self, &nullability, options)?;
        self.mark_prepared();

        let report = PrepareReport {
            references,
            left_recursive,
            nullable: nullability.count(),
        };
        tracing::debug!(
            expressions = self.len(),
            references = report.references,
            left_recursive = report.left_recursive.len(),
            nullable = report.nullable,
            "prepared grammar"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeftRecursionOptions;
    use crate::expr::{ExprKind, GrammarBuilder, Peg};

    fn expression_grammar() -> GrammarBuilder {
        GrammarBuilder::new()
            .rule(
                "E",
                Peg::choice([Peg::seq([Peg::rule("E"), Peg::lit("+"), Peg::rule("N")]), Peg::rule("N")]),
            )
            .rule("N", Peg::plus(Peg::range('0', '9')))
    }

    #[test]
    fn prepare_resolves_and_breaks() {
        let mut grammar = expression_grammar().build_unprepared().unwrap();
        let report = grammar.prepare(&PrepareOptions::default()).unwrap();
        let e = grammar.rule("E").unwrap();
        assert_eq!(report.references, 3);
        assert_eq!(report.left_recursive, vec![e]);
        assert!(grammar.is_prepared());
        assert!(matches!(grammar.kind(e), ExprKind::LeftRecursive { .. }));
    }

    #[test]
    fn detection_only_reports_cycles() {
        let options = PrepareOptions {
            left_recursion: LeftRecursionOptions {
                in_place: false,
                ..LeftRecursionOptions::default()
            },
            ..PrepareOptions::default()
        };
        let err = expression_grammar().options(options).build().unwrap_err();
        assert_eq!(err, GrammarError::UnbrokenLeftRecursion("E".into()));
    }

    #[test]
    fn resolved_references_are_unreachable() {
        let mut grammar = expression_grammar().build_unprepared().unwrap();
        grammar.prepare(&PrepareOptions::default()).unwrap();
        assert!(
            reachable(&grammar)
                .into_iter()
                .all(|id| !matches!(grammar.kind(id), ExprKind::Reference(_)))
        );
    }

    #[test]
    fn mutation_clears_prepared() {
        let mut grammar = expression_grammar().build().unwrap();
        assert!(grammar.is_prepared());
        grammar.add(ExprKind::Any);
        assert!(!grammar.is_prepared());
    }
}
