use crate::expr::{CustomNullability, ExprId, ExprKind, Grammar};
use crate::walk::{GraphWalker, Visit, Visitor};
use smallvec::SmallVec;

/// How the nullability of a variant follows from its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Yes,
    No,
    /// Nullable iff every child is.
    All(SmallVec<[ExprId; 4]>),
    /// Nullable iff some child is.
    Any(SmallVec<[ExprId; 4]>),
    /// Mirrors one child.
    Single(ExprId),
}

impl Strategy {
    #[must_use]
    pub fn of(grammar: &Grammar, id: ExprId) -> Self {
        match grammar.kind(id) {
            ExprKind::Literal(text) => {
                if text.is_empty() {
                    Self::Yes
                } else {
                    Self::No
                }
            }
            ExprKind::Any | ExprKind::CharRange(..) | ExprKind::CharSet(_) | ExprKind::Reference(_) => Self::No,
            ExprKind::Optional(_) | ExprKind::ZeroMore(_) | ExprKind::Lookahead(_) | ExprKind::Not(_) => Self::Yes,
            ExprKind::Sequence(items) => Self::All(items.iter().copied().collect()),
            ExprKind::Choice(items) => Self::Any(items.iter().copied().collect()),
            ExprKind::Cluster(_) => Self::Any(grammar.children(id)),
            ExprKind::OneMore(e)
            | ExprKind::Token(e)
            | ExprKind::Capture { operand: e, .. }
            | ExprKind::LeftRecursive { operand: e, .. }
            | ExprKind::WithMinPrecedence { operand: e, .. } => Self::Single(*e),
            ExprKind::Custom(custom) => match custom.nullability {
                CustomNullability::Yes => Self::Yes,
                CustomNullability::No => Self::No,
                CustomNullability::AllChildren => Self::All(custom.children.iter().copied().collect()),
                CustomNullability::AnyChild => Self::Any(custom.children.iter().copied().collect()),
            },
        }
    }
}

/// Nullability of every expression of a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nullability {
    nullable: Vec<bool>,
}

impl Nullability {
    /// # Panics
    ///
    /// Panics if `id` was allocated after the analysis ran.
    #[must_use]
    pub fn is_nullable(&self, id: ExprId) -> bool {
        self.nullable[id.index()]
    }

    #[must_use]
    pub fn covers(&self, grammar: &Grammar) -> bool {
        self.nullable.len() == grammar.len()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.nullable.iter().filter(|n| **n).count()
    }
}

/// Lazy fixed point over the graph.
///
/// Each node is evaluated once its children have been walked. A node that
/// cannot be decided yet waits on its undecided children; deciding a child
/// re-evaluates its waiters. Whatever is still undecided at the end (pure
/// recursion such as `X = X`) is not nullable.
struct Analyzer<'g> {
    grammar: &'g Grammar,
    state: Vec<Option<bool>>,
    waiters: Vec<SmallVec<[ExprId; 2]>>,
    decided: Vec<ExprId>,
}

impl Analyzer<'_> {
    fn evaluate(&mut self, id: ExprId) -> Option<bool> {
        let value = |child: &ExprId| self.state[child.index()];
        let outcome = match Strategy::of(self.grammar, id) {
            Strategy::Yes => Some(true),
            Strategy::No => Some(false),
            Strategy::Single(child) => value(&child),
            Strategy::All(children) => {
                if children.iter().any(|c| value(c) == Some(false)) {
                    Some(false)
                } else if children.iter().all(|c| value(c) == Some(true)) {
                    Some(true)
                } else {
                    None
                }
            }
            Strategy::Any(children) => {
                if children.iter().any(|c| value(c) == Some(true)) {
                    Some(true)
                } else if children.iter().all(|c| value(c) == Some(false)) {
                    Some(false)
                } else {
                    None
                }
            }
        };
        if outcome.is_none() {
            for child in self.grammar.children(id) {
                if self.state[child.index()].is_none() && !self.waiters[child.index()].contains(&id) {
                    self.waiters[child.index()].push(id);
                }
            }
        }
        outcome
    }

    fn decide(&mut self, id: ExprId, nullable: bool) {
        self.state[id.index()] = Some(nullable);
        self.decided.push(id);
        while let Some(done) = self.decided.pop() {
            for waiter in std::mem::take(&mut self.waiters[done.index()]) {
                if self.state[waiter.index()].is_some() {
                    continue;
                }
                if let Some(value) = self.evaluate(waiter) {
                    self.state[waiter.index()] = Some(value);
                    self.decided.push(waiter);
                }
            }
        }
    }
}

impl Visitor for Analyzer<'_> {
    type Output = ();

    fn children(&mut self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.grammar.children(id)
    }

    fn after(&mut self, id: ExprId, _depth: usize, _edges: &[(ExprId, Visit<()>)]) {
        if self.state[id.index()].is_some() {
            return;
        }
        if let Some(value) = self.evaluate(id) {
            self.decide(id, value);
        }
    }
}

/// Compute the nullability of every expression in `grammar`.
#[must_use]
pub fn compute_nullability(grammar: &Grammar) -> Nullability {
    let mut analyzer = Analyzer {
        grammar,
        state: vec![None; grammar.len()],
        waiters: vec![SmallVec::new(); grammar.len()],
        decided: Vec::new(),
    };
    let mut walker = GraphWalker::new();
    for id in grammar.ids() {
        walker.walk(&mut analyzer, id);
    }
    Nullability {
        nullable: analyzer.state.into_iter().map(|s| s.unwrap_or(false)).collect(),
    }
}
