//! # Graph Walk
//!
//! Depth-first traversal over an expression graph that may contain cycles.
//!
//! Every node is in one of three states: unvisited, on the current path, or
//! done. Reaching a node that is still on the path yields [`Visit::Cutoff`]
//! instead of descending again; reaching a done node yields its cached result.
//! All preprocessing passes (reference resolution, nullability, left-recursion
//! detection, deep copy) are visitors over this walker.

use crate::expr::ExprId;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Result of visiting a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit<R> {
    /// The node is on the current path: the edge closes a cycle.
    Cutoff,
    Done(R),
}

impl<R> Visit<R> {
    #[must_use]
    pub const fn is_cutoff(&self) -> bool {
        matches!(self, Self::Cutoff)
    }

    #[must_use]
    pub fn done(self) -> Option<R> {
        match self {
            Self::Cutoff => None,
            Self::Done(r) => Some(r),
        }
    }
}

/// Hooks driven by [`GraphWalker`].
///
/// Only [`Visitor::children`] and [`Visitor::after`] are required; the edge
/// hooks default to no-ops.
pub trait Visitor {
    type Output: Clone;

    /// Edges followed from `id`. Overriding this restricts the walk, e.g. to
    /// first-position edges only.
    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]>;

    fn before(&mut self, _id: ExprId, _depth: usize) {}

    fn before_edge(&mut self, _parent: ExprId, _index: usize, _child: ExprId) {}

    /// `child` is on the path at `depth`.
    fn cutoff(&mut self, _parent: ExprId, _child: ExprId, _depth: usize) {}

    fn after_edge(&mut self, _parent: ExprId, _index: usize, _child: ExprId, _result: &Visit<Self::Output>) {}

    /// Called once all edges of `id` have been walked.
    fn after(&mut self, id: ExprId, depth: usize, edges: &[(ExprId, Visit<Self::Output>)]) -> Self::Output;
}

#[derive(Debug, Clone)]
enum NodeState<R> {
    OnStack(usize),
    Done(R),
}

/// Tri-state depth-first walker. Results persist across [`GraphWalker::walk`]
/// calls, so walking several roots visits every node once.
#[derive(Debug, Clone)]
pub struct GraphWalker<R> {
    states: HashMap<ExprId, NodeState<R>, ahash::RandomState>,
}

impl<R: Clone> Default for GraphWalker<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> GraphWalker<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Treat `id` as already visited with `result`; the walk will not descend
    /// into it.
    pub fn mark_visited(&mut self, id: ExprId, result: R) {
        self.states.insert(id, NodeState::Done(result));
    }

    #[must_use]
    pub fn result(&self, id: ExprId) -> Option<&R> {
        match self.states.get(&id) {
            Some(NodeState::Done(r)) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_visited(&self, id: ExprId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn walk<V>(&mut self, visitor: &mut V, root: ExprId) -> Visit<R>
    where
        V: Visitor<Output = R>,
    {
        self.visit(visitor, root, 0)
    }

    fn visit<V>(&mut self, visitor: &mut V, id: ExprId, depth: usize) -> Visit<R>
    where
        V: Visitor<Output = R>,
    {
        match self.states.get(&id) {
            Some(NodeState::OnStack(_)) => return Visit::Cutoff,
            Some(NodeState::Done(r)) => return Visit::Done(r.clone()),
            None => {}
        }
        self.states.insert(id, NodeState::OnStack(depth));
        visitor.before(id, depth);

        let children = visitor.children(id);
        let mut edges: SmallVec<[(ExprId, Visit<R>); 4]> = SmallVec::with_capacity(children.len());
        for (index, child) in children.into_iter().enumerate() {
            visitor.before_edge(id, index, child);
            if let Some(NodeState::OnStack(child_depth)) = self.states.get(&child) {
                visitor.cutoff(id, child, *child_depth);
            }
            let result = self.visit(visitor, child, depth + 1);
            visitor.after_edge(id, index, child, &result);
            edges.push((child, result));
        }

        let output = visitor.after(id, depth, &edges);
        self.states.insert(id, NodeState::Done(output.clone()));
        Visit::Done(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprKind, Grammar};

    /// Counts nodes below each node, cutting cycles.
    struct Counter<'g> {
        grammar: &'g Grammar,
        befores: usize,
        cutoffs: Vec<(ExprId, ExprId, usize)>,
    }

    impl Visitor for Counter<'_> {
        type Output = usize;

        fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
            self.grammar.children(id)
        }

        fn before(&mut self, _id: ExprId, _depth: usize) {
            self.befores += 1;
        }

        fn cutoff(&mut self, parent: ExprId, child: ExprId, depth: usize) {
            self.cutoffs.push((parent, child, depth));
        }

        fn after(&mut self, _id: ExprId, _depth: usize, edges: &[(ExprId, Visit<usize>)]) -> usize {
            1 + edges
                .iter()
                .map(|(_, r)| match r {
                    Visit::Done(n) => *n,
                    Visit::Cutoff => 0,
                })
                .sum::<usize>()
        }
    }

    #[test]
    fn cycle_reports_cutoff_with_depth() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Literal("a".into()));
        let seq = g.add(ExprKind::Sequence(vec![]));
        let choice = g.add(ExprKind::Choice(vec![seq, a]));
        *g.get_mut(seq) = crate::expr::Expr::new(ExprKind::Sequence(vec![choice, a]));

        let mut counter = Counter {
            grammar: &g,
            befores: 0,
            cutoffs: Vec::new(),
        };
        let mut walker = GraphWalker::new();
        let result = walker.walk(&mut counter, choice);

        assert_eq!(counter.befores, 3);
        assert_eq!(counter.cutoffs, vec![(seq, choice, 0)]);
        // choice + seq + a (a counted under seq, then cached under choice)
        assert_eq!(result, Visit::Done(4));
    }

    #[test]
    fn done_nodes_are_not_revisited() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Literal("a".into()));
        let seq = g.add(ExprKind::Sequence(vec![a, a, a]));
        let mut counter = Counter {
            grammar: &g,
            befores: 0,
            cutoffs: Vec::new(),
        };
        let mut walker = GraphWalker::new();
        walker.walk(&mut counter, seq);
        assert_eq!(counter.befores, 2);
        assert_eq!(walker.result(seq), Some(&4));
    }

    #[test]
    fn marked_nodes_prune_descent() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Literal("a".into()));
        let opt = g.add(ExprKind::Optional(a));
        let seq = g.add(ExprKind::Sequence(vec![opt, a]));
        let mut counter = Counter {
            grammar: &g,
            befores: 0,
            cutoffs: Vec::new(),
        };
        let mut walker = GraphWalker::new();
        walker.mark_visited(opt, 100);
        let result = walker.walk(&mut counter, seq);
        assert_eq!(counter.befores, 2);
        assert_eq!(result, Visit::Done(102));
    }
}
