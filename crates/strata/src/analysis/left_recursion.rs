use super::{Nullability, firsts};
use crate::config::LeftRecursionOptions;
use crate::expr::{ExprId, ExprKind, Grammar};
use crate::walk::{GraphWalker, Visit, Visitor};
use hashbrown::HashSet;
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Depth-first walk over first-position edges.
///
/// `boundaries` holds the path depths of recursion boundaries: existing
/// `LeftRecursive` and cluster nodes, plus nodes selected during this walk. A
/// cycle closing on a node at depth `d` is already broken when some boundary
/// sits at depth `d` or below it on the path.
struct Detector<'g> {
    grammar: &'g Grammar,
    nullability: &'g Nullability,
    boundaries: BTreeSet<usize>,
    selected: Vec<ExprId>,
    seen: HashSet<ExprId, ahash::RandomState>,
}

impl Visitor for Detector<'_> {
    type Output = ();

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        firsts(self.grammar, self.nullability, id)
    }

    fn before(&mut self, id: ExprId, depth: usize) {
        if self.grammar.kind(id).is_recursion_boundary() {
            self.boundaries.insert(depth);
        }
    }

    fn cutoff(&mut self, _parent: ExprId, child: ExprId, depth: usize) {
        let innermost = self.boundaries.last().copied();
        if innermost.is_some_and(|b| b >= depth) {
            return;
        }
        self.boundaries.insert(depth);
        if self.seen.insert(child) {
            self.selected.push(child);
        }
    }

    fn after(&mut self, _id: ExprId, depth: usize, _edges: &[(ExprId, Visit<()>)]) {
        self.boundaries.remove(&depth);
    }
}

/// Nodes that must become `LeftRecursive` to break every first-position cycle.
///
/// The walk starts at the root, then the rules, then every remaining node, in
/// id order, so the choice of cycle breakers is deterministic: the first node
/// of each cycle met on the way down is selected.
#[must_use]
pub fn detect_left_recursion(grammar: &Grammar, nullability: &Nullability) -> Vec<ExprId> {
    let mut detector = Detector {
        grammar,
        nullability,
        boundaries: BTreeSet::new(),
        selected: Vec::new(),
        seen: HashSet::with_hasher(ahash::RandomState::new()),
    };
    let mut walker = GraphWalker::new();
    let roots = grammar
        .root()
        .into_iter()
        .chain(grammar.rules().into_iter().map(|(_, id)| id))
        .chain(grammar.ids());
    for id in roots {
        if !walker.is_visited(id) {
            walker.walk(&mut detector, id);
        }
    }
    detector.selected
}

/// Detect left recursion and wrap each selected node in a `LeftRecursive`
/// marker, in place: parents keep pointing at the same id, which now holds the
/// marker. Returns the wrapped ids.
///
/// The new nodes are not covered by `nullability`; recompute it before further
/// analysis.
pub fn break_left_recursion(
    grammar: &mut Grammar,
    nullability: &Nullability,
    options: &LeftRecursionOptions,
) -> Vec<ExprId> {
    let selected = detect_left_recursion(grammar, nullability);
    for &id in &selected {
        grammar.wrap_in_place(id, |operand| ExprKind::LeftRecursive {
            operand,
            left_associative: options.left_associative,
        });
    }
    if !selected.is_empty() {
        tracing::debug!(count = selected.len(), "broke left recursion");
    }
    selected
}
