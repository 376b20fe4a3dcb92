use super::{CaptureMode, CustomExpr, ExprId, ExprKind, Grammar, Group, GroupKind};
use crate::config::PrepareOptions;
use crate::error::GrammarError;
use compact_str::CompactString;
use smallvec::SmallVec;

/// Owned expression tree, lowered into a [`Grammar`] arena.
///
/// `Peg` is the convenient way to write grammars by hand. Sharing and recursion
/// go through rule names ([`Peg::rule`]) or through already-allocated ids
/// ([`Peg::Id`]); everything else is lowered into fresh nodes.
///
/// # Example
///
/// ```rust
/// use strata::expr::{GrammarBuilder, Peg};
///
/// let grammar = GrammarBuilder::new()
///     .rule("digits", Peg::plus(Peg::range('0', '9')))
///     .rule("sum", Peg::seq([Peg::rule("digits"), Peg::lit("+"), Peg::rule("digits")]))
///     .root("sum")
///     .build()
///     .expect("valid grammar");
/// assert!(grammar.is_prepared());
/// ```
#[derive(Debug, Clone)]
pub enum Peg {
    Literal(CompactString),
    Any,
    CharRange(char, char),
    CharSet(SmallVec<[char; 8]>),
    Sequence(Vec<Peg>),
    Choice(Vec<Peg>),
    Optional(Box<Peg>),
    ZeroMore(Box<Peg>),
    OneMore(Box<Peg>),
    Lookahead(Box<Peg>),
    Not(Box<Peg>),
    Token(Box<Peg>),
    Capture(Box<Peg>, CaptureMode),
    LeftRecursive(Box<Peg>, bool),
    Cluster(Vec<PegGroup>),
    WithMinPrecedence(Box<Peg>, u32),
    Reference(CompactString),
    Custom(CustomExpr),
    /// An expression already present in the target grammar.
    Id(ExprId),
}

/// A precedence level in a [`Peg::Cluster`].
#[derive(Debug, Clone)]
pub struct PegGroup {
    pub precedence: u32,
    pub kind: GroupKind,
    pub alternatives: Vec<Peg>,
}

impl PegGroup {
    pub fn new(precedence: u32, kind: GroupKind, alternatives: impl IntoIterator<Item = Peg>) -> Self {
        Self {
            precedence,
            kind,
            alternatives: alternatives.into_iter().collect(),
        }
    }
}

impl Peg {
    pub fn lit(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    #[must_use]
    pub const fn range(lo: char, hi: char) -> Self {
        Self::CharRange(lo, hi)
    }

    #[must_use]
    pub fn set(chars: &str) -> Self {
        Self::CharSet(chars.chars().collect())
    }

    pub fn seq(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    pub fn choice(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Choice(items.into_iter().collect())
    }

    #[must_use]
    pub fn opt(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn star(inner: Self) -> Self {
        Self::ZeroMore(Box::new(inner))
    }

    #[must_use]
    pub fn plus(inner: Self) -> Self {
        Self::OneMore(Box::new(inner))
    }

    #[must_use]
    pub fn and(inner: Self) -> Self {
        Self::Lookahead(Box::new(inner))
    }

    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Reference to a named rule, resolved during preparation.
    pub fn rule(name: impl Into<CompactString>) -> Self {
        Self::Reference(name.into())
    }

    /// Explicit left-recursion boundary.
    #[must_use]
    pub fn left_recursive(inner: Self, left_associative: bool) -> Self {
        Self::LeftRecursive(Box::new(inner), left_associative)
    }

    pub fn cluster(groups: impl IntoIterator<Item = PegGroup>) -> Self {
        Self::Cluster(groups.into_iter().collect())
    }

    #[must_use]
    pub fn min_precedence(inner: Self, precedence: u32) -> Self {
        Self::WithMinPrecedence(Box::new(inner), precedence)
    }

    /// Reset every cluster's precedence floor, e.g. inside parentheses.
    #[must_use]
    pub fn drop_precedence(inner: Self) -> Self {
        Self::min_precedence(inner, 0)
    }

    /// Follow this expression by the grammar's whitespace.
    #[must_use]
    pub fn token(self) -> Self {
        Self::Token(Box::new(self))
    }

    #[must_use]
    pub fn capture(self, mode: CaptureMode) -> Self {
        Self::Capture(Box::new(self), mode)
    }

    /// Capture a node named `accessor` holding the matched text.
    pub fn text(self, accessor: impl Into<CompactString>) -> Self {
        self.capture(CaptureMode::text(accessor))
    }

    /// Capture a node named `accessor` wrapping the inner captures.
    pub fn node(self, accessor: impl Into<CompactString>) -> Self {
        self.capture(CaptureMode::node(accessor))
    }
}

impl Grammar {
    /// Lower a [`Peg`] tree into the arena.
    pub fn insert(&mut self, peg: Peg) -> ExprId {
        let kind = match peg {
            Peg::Id(id) => return id,
            Peg::Literal(text) => ExprKind::Literal(text),
            Peg::Any => ExprKind::Any,
            Peg::CharRange(lo, hi) => ExprKind::CharRange(lo, hi),
            Peg::CharSet(chars) => ExprKind::CharSet(chars),
            Peg::Sequence(items) => ExprKind::Sequence(self.insert_all(items)),
            Peg::Choice(items) => ExprKind::Choice(self.insert_all(items)),
            Peg::Optional(inner) => ExprKind::Optional(self.insert(*inner)),
            Peg::ZeroMore(inner) => ExprKind::ZeroMore(self.insert(*inner)),
            Peg::OneMore(inner) => ExprKind::OneMore(self.insert(*inner)),
            Peg::Lookahead(inner) => ExprKind::Lookahead(self.insert(*inner)),
            Peg::Not(inner) => ExprKind::Not(self.insert(*inner)),
            Peg::Token(inner) => ExprKind::Token(self.insert(*inner)),
            Peg::Capture(inner, mode) => ExprKind::Capture {
                operand: self.insert(*inner),
                mode,
            },
            Peg::LeftRecursive(inner, left_associative) => ExprKind::LeftRecursive {
                operand: self.insert(*inner),
                left_associative,
            },
            Peg::Cluster(groups) => {
                let mut lowered: Vec<Group> = groups
                    .into_iter()
                    .map(|g| Group {
                        precedence: g.precedence,
                        kind: g.kind,
                        alternatives: self.insert_all(g.alternatives),
                    })
                    .collect();
                lowered.sort_by(|a, b| b.precedence.cmp(&a.precedence));
                ExprKind::Cluster(lowered)
            }
            Peg::WithMinPrecedence(inner, precedence) => ExprKind::WithMinPrecedence {
                operand: self.insert(*inner),
                precedence,
            },
            Peg::Reference(name) => ExprKind::Reference(name),
            Peg::Custom(custom) => ExprKind::Custom(custom),
        };
        self.add(kind)
    }

    fn insert_all(&mut self, items: Vec<Peg>) -> Vec<ExprId> {
        items.into_iter().map(|p| self.insert(p)).collect()
    }
}

/// Builder for a prepared [`Grammar`].
///
/// Rules are lowered as they are added; [`GrammarBuilder::build`] resolves
/// references, breaks left recursion and validates the result.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    grammar: Grammar,
    root: Option<CompactString>,
    options: PrepareOptions,
    errors: Vec<GrammarError>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing grammar, e.g. to extend it with more rules.
    #[must_use]
    pub fn from_grammar(grammar: Grammar) -> Self {
        Self {
            grammar,
            ..Self::default()
        }
    }

    /// Define the rule `name`. Later references to `name` resolve to it.
    #[must_use]
    pub fn rule(mut self, name: impl Into<CompactString>, peg: Peg) -> Self {
        let id = self.grammar.insert(peg);
        if let Err(e) = self.grammar.define_rule(name, id) {
            self.errors.push(e);
        }
        self
    }

    /// Rule matched by [`crate::Parser::parse`]. Defaults to the first rule.
    #[must_use]
    pub fn root(mut self, name: impl Into<CompactString>) -> Self {
        self.root = Some(name.into());
        self
    }

    #[must_use]
    pub fn whitespace(mut self, peg: Peg) -> Self {
        let id = self.grammar.insert(peg);
        self.grammar.set_whitespace(id);
        self
    }

    #[must_use]
    pub fn options(mut self, options: PrepareOptions) -> Self {
        self.options = options;
        self
    }

    /// Direct access to the arena, for expressions that need ids up front.
    pub fn grammar_mut(&mut self) -> &mut Grammar {
        &mut self.grammar
    }

    /// Assemble the grammar without running the preprocessing passes.
    ///
    /// # Errors
    ///
    /// Returns the first rule definition error, or [`GrammarError::MissingRoot`]
    /// if no root can be determined.
    pub fn build_unprepared(mut self) -> Result<Grammar, GrammarError> {
        if let Some(e) = self.errors.into_iter().next() {
            return Err(e);
        }
        let root = match &self.root {
            Some(name) => self
                .grammar
                .rule(name)
                .ok_or_else(|| GrammarError::MissingRoot(name.to_string()))?,
            None => self
                .grammar
                .rules()
                .first()
                .map(|(_, id)| *id)
                .ok_or_else(|| GrammarError::MissingRoot("<no rules>".to_string()))?,
        };
        self.grammar.set_root(root);
        Ok(self.grammar)
    }

    /// Assemble and prepare the grammar.
    ///
    /// # Errors
    ///
    /// Returns any error from [`GrammarBuilder::build_unprepared`] or from
    /// [`Grammar::prepare`].
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let options = self.options.clone();
        let mut grammar = self.build_unprepared()?;
        grammar.prepare(&options)?;
        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowering_allocates_children_first() {
        let mut g = Grammar::new();
        let id = g.insert(Peg::seq([Peg::lit("a"), Peg::opt(Peg::any())]));
        let children = g.children(id);
        assert_eq!(children.len(), 2);
        assert!(matches!(g.kind(children[0]), ExprKind::Literal(s) if s == "a"));
        assert!(matches!(g.kind(children[1]), ExprKind::Optional(_)));
    }

    #[test]
    fn cluster_groups_are_sorted_by_precedence() {
        let mut g = Grammar::new();
        let id = g.insert(Peg::cluster([
            PegGroup::new(1, GroupKind::LeftAssociative, [Peg::lit("+")]),
            PegGroup::new(3, GroupKind::None, [Peg::lit("n")]),
            PegGroup::new(2, GroupKind::LeftAssociative, [Peg::lit("*")]),
        ]));
        let ExprKind::Cluster(groups) = g.kind(id) else {
            panic!("expected cluster");
        };
        let order: Vec<u32> = groups.iter().map(|g| g.precedence).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn id_is_shared_not_copied() {
        let mut g = Grammar::new();
        let shared = g.insert(Peg::lit("x"));
        let seq = g.insert(Peg::seq([Peg::Id(shared), Peg::Id(shared)]));
        assert_eq!(g.children(seq).as_slice(), &[shared, shared]);
    }

    #[test]
    fn missing_root_is_reported() {
        let err = GrammarBuilder::new()
            .rule("a", Peg::lit("a"))
            .root("b")
            .build_unprepared()
            .unwrap_err();
        assert!(matches!(err, GrammarError::MissingRoot(name) if name == "b"));
    }

    #[test]
    fn first_rule_is_default_root() {
        let grammar = GrammarBuilder::new()
            .rule("a", Peg::lit("a"))
            .rule("b", Peg::lit("b"))
            .build_unprepared()
            .unwrap();
        assert_eq!(grammar.root(), grammar.rule("a"));
    }
}
