use super::{compute_nullability, reachable};
use crate::expr::{ExprId, ExprKind, Grammar};
use crate::walk::{GraphWalker, Visit, Visitor};
use smallvec::SmallVec;

/// Size and shape of a grammar graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrammarMetrics {
    /// Nodes in the arena, reachable or not
    pub expression_count: usize,
    /// Nodes reachable from the root, the rules and the whitespace
    pub reachable_count: usize,
    pub rule_count: usize,
    /// Number of nullable rules
    pub nullable_count: usize,
    /// Reachable `LeftRecursive` nodes
    pub left_recursive_count: usize,
    /// Reachable clusters
    pub cluster_count: usize,
    /// Nesting depth below the root, not following cycles
    pub max_depth: usize,
}

struct Depth<'g> {
    grammar: &'g Grammar,
}

impl Visitor for Depth<'_> {
    type Output = usize;

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn after(&mut self, _id: ExprId, _depth: usize, edges: &[(ExprId, Visit<usize>)]) -> usize {
        1 + edges
            .iter()
            .filter_map(|(_, visit)| match visit {
                Visit::Done(depth) => Some(*depth),
                Visit::Cutoff => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl GrammarMetrics {
    /// Compute metrics for a grammar
    #[must_use]
    pub fn compute(grammar: &Grammar) -> Self {
        let nullability = compute_nullability(grammar);
        let rules = grammar.rules();
        let mut metrics = Self {
            expression_count: grammar.len(),
            rule_count: rules.len(),
            nullable_count: rules.iter().filter(|(_, id)| nullability.is_nullable(*id)).count(),
            ..Self::default()
        };

        for id in reachable(grammar) {
            metrics.reachable_count += 1;
            match grammar.kind(id) {
                ExprKind::LeftRecursive { .. } => metrics.left_recursive_count += 1,
                ExprKind::Cluster(_) => metrics.cluster_count += 1,
                _ => {}
            }
        }

        if let Some(root) = grammar.root() {
            metrics.max_depth = GraphWalker::new()
                .walk(&mut Depth { grammar }, root)
                .done()
                .unwrap_or(0);
        }
        metrics
    }
}

/// Get a summary of grammar characteristics
#[must_use]
pub fn grammar_summary(grammar: &Grammar) -> String {
    let metrics = GrammarMetrics::compute(grammar);
    format!(
        "Grammar summary: {} rules, {} expressions ({} reachable), max depth {}, {} nullable, {} left-recursive, {} clusters",
        metrics.rule_count,
        metrics.expression_count,
        metrics.reachable_count,
        metrics.max_depth,
        metrics.nullable_count,
        metrics.left_recursive_count,
        metrics.cluster_count,
    )
}
