use super::{ExprId, Grammar};
use crate::walk::{GraphWalker, Visit, Visitor};
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Copies every node on first visit and rewires children once they are done.
struct Copier<'g> {
    grammar: &'g mut Grammar,
    copies: HashMap<ExprId, ExprId, ahash::RandomState>,
}

impl Visitor for Copier<'_> {
    type Output = ExprId;

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn before(&mut self, id: ExprId, _depth: usize) {
        let expr = self.grammar.get(id).clone();
        let copy = self.grammar.push(expr);
        self.copies.insert(id, copy);
    }

    fn after(&mut self, id: ExprId, _depth: usize, edges: &[(ExprId, Visit<ExprId>)]) -> ExprId {
        let copy = self.copies[&id];
        for (index, (child, result)) in edges.iter().enumerate() {
            let target = match result {
                Visit::Done(target) => *target,
                // on the current path, so its copy already exists
                Visit::Cutoff => self.copies[child],
            };
            // the copy has the same shape as the original
            let _ = self.grammar.replace_child(copy, index, target);
        }
        copy
    }
}

impl Grammar {
    /// Copy the sub-graph reachable from `root` and return the new root.
    ///
    /// A node reachable along several paths is copied once, and cycles map onto
    /// the copied cycle. Copies keep their names but are not registered as rules.
    pub fn deep_copy(&mut self, root: ExprId) -> ExprId {
        self.deep_copy_sharing(root, &[])
    }

    /// Like [`Grammar::deep_copy`], but the nodes in `shared` (and everything
    /// below them) are referenced by the copy instead of duplicated.
    pub fn deep_copy_sharing(&mut self, root: ExprId, shared: &[ExprId]) -> ExprId {
        let mut walker = GraphWalker::new();
        for &id in shared {
            walker.mark_visited(id, id);
        }
        let mut copier = Copier {
            grammar: self,
            copies: HashMap::with_hasher(ahash::RandomState::new()),
        };
        match walker.walk(&mut copier, root) {
            Visit::Done(copy) => copy,
            Visit::Cutoff => root,
        }
    }
}
