use crate::error::GrammarError;
use crate::expr::{ExprId, ExprKind, Grammar};
use crate::walk::{GraphWalker, Visit, Visitor};
use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;

type Names = HashMap<CompactString, ExprId, ahash::RandomState>;

/// Collects the name table and every edge that points at a reference.
struct Collector<'g> {
    grammar: &'g Grammar,
    names: Names,
    edges: Vec<(ExprId, usize, ExprId)>,
}

impl Visitor for Collector<'_> {
    type Output = ();

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn before(&mut self, id: ExprId, _depth: usize) {
        if let Some(name) = &self.grammar.get(id).name {
            self.names.entry(name.clone()).or_insert(id);
        }
    }

    fn before_edge(&mut self, parent: ExprId, index: usize, child: ExprId) {
        if matches!(self.grammar.kind(child), ExprKind::Reference(_)) {
            self.edges.push((parent, index, child));
        }
    }

    fn after(&mut self, _id: ExprId, _depth: usize, _edges: &[(ExprId, Visit<()>)]) {}
}

/// Follow `id` through references until a real node is reached.
fn target(grammar: &Grammar, names: &Names, id: ExprId, limit: usize) -> Result<ExprId, GrammarError> {
    let mut current = id;
    let mut hops = 0;
    while let ExprKind::Reference(name) = grammar.kind(current) {
        if hops == limit {
            let start = match grammar.kind(id) {
                ExprKind::Reference(first) => first.to_string(),
                _ => grammar.describe(id),
            };
            return Err(GrammarError::ReferenceChainTooLong { name: start, limit });
        }
        current = *names
            .get(name)
            .ok_or_else(|| GrammarError::UnresolvedReference(name.to_string()))?;
        hops += 1;
    }
    Ok(current)
}

/// Replace every `Reference` edge by an edge to the named node.
///
/// Names come from the rule table first, then from named nodes. The target is
/// not copied: every reference to a rule ends up pointing at the same node.
/// Returns the number of edges rewritten.
///
/// # Errors
///
/// [`GrammarError::UnresolvedReference`] for an unknown name, and
/// [`GrammarError::ReferenceChainTooLong`] when references lead to references
/// for more than `chain_limit` hops (a reference cycle ends up here too).
pub fn resolve_references(grammar: &mut Grammar, chain_limit: usize) -> Result<usize, GrammarError> {
    let mut names: Names = HashMap::with_hasher(ahash::RandomState::new());
    for (name, id) in grammar.rules() {
        names.insert(name.into(), id);
    }
    let mut collector = Collector {
        grammar: &*grammar,
        names,
        edges: Vec::new(),
    };
    let mut walker = GraphWalker::new();
    for id in grammar.ids() {
        walker.walk(&mut collector, id);
    }
    let Collector { names, edges, .. } = collector;

    let mut rewrites = Vec::with_capacity(edges.len());
    for (parent, index, reference) in edges {
        rewrites.push((parent, index, target(grammar, &names, reference, chain_limit)?));
    }
    let mut entry_points = Vec::new();
    for id in grammar.rules().into_iter().map(|(_, id)| id).chain(grammar.root()).chain(grammar.whitespace()) {
        entry_points.push((id, target(grammar, &names, id, chain_limit)?));
    }

    let count = rewrites.len();
    for (parent, index, resolved) in rewrites {
        grammar.replace_child(parent, index, resolved)?;
    }
    let entry_points: HashMap<ExprId, ExprId, ahash::RandomState> = entry_points.into_iter().collect();
    grammar.repoint_rules(|id| entry_points.get(&id).copied().unwrap_or(id));

    tracing::debug!(references = count, names = names.len(), "resolved references");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{GrammarBuilder, Peg};

    #[test]
    fn references_share_the_rule_node() {
        let mut grammar = GrammarBuilder::new()
            .rule("A", Peg::seq([Peg::lit("a"), Peg::opt(Peg::rule("A"))]))
            .rule("B", Peg::seq([Peg::rule("A"), Peg::rule("A")]))
            .build_unprepared()
            .unwrap();
        let count = resolve_references(&mut grammar, 10).unwrap();
        assert_eq!(count, 3);

        let a = grammar.rule("A").unwrap();
        let b = grammar.rule("B").unwrap();
        assert_eq!(grammar.children(b).as_slice(), &[a, a]);
        let opt = grammar.children(a)[1];
        assert_eq!(grammar.children(opt).as_slice(), &[a]);
    }

    #[test]
    fn chains_are_followed() {
        let mut grammar = GrammarBuilder::new()
            .rule("top", Peg::seq([Peg::rule("alias")]))
            .rule("alias", Peg::rule("target"))
            .rule("target", Peg::lit("t"))
            .build_unprepared()
            .unwrap();
        resolve_references(&mut grammar, 10).unwrap();
        let top = grammar.rule("top").unwrap();
        let target = grammar.rule("target").unwrap();
        assert_eq!(grammar.children(top).as_slice(), &[target]);
        assert_eq!(grammar.rule("alias"), Some(target));
    }

    #[test]
    fn unknown_name() {
        let mut grammar = GrammarBuilder::new()
            .rule("top", Peg::seq([Peg::rule("nope")]))
            .build_unprepared()
            .unwrap();
        let err = resolve_references(&mut grammar, 10).unwrap_err();
        assert_eq!(err, GrammarError::UnresolvedReference("nope".into()));
    }

    #[test]
    fn reference_cycle_hits_the_limit() {
        let mut grammar = GrammarBuilder::new()
            .rule("top", Peg::seq([Peg::rule("x")]))
            .rule("x", Peg::rule("y"))
            .rule("y", Peg::rule("x"))
            .build_unprepared()
            .unwrap();
        let err = resolve_references(&mut grammar, 5).unwrap_err();
        assert!(matches!(err, GrammarError::ReferenceChainTooLong { limit: 5, .. }));
    }
}
