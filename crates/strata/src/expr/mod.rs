//! # Expression Graph
//!
//! Parsing expressions live in an arena owned by [`Grammar`] and refer to each
//! other through [`ExprId`] handles. Shared sub-expressions and recursive rules
//! are therefore plain id reuse: a rule referencing itself simply holds its own
//! id among its children.
//!
//! ## Variants
//!
//! - **Terminals**: [`ExprKind::Literal`], [`ExprKind::Any`],
//!   [`ExprKind::CharRange`], [`ExprKind::CharSet`]
//! - **Combinators**: `Sequence`, `Choice`, `Optional`, `ZeroMore`, `OneMore`
//! - **Predicates**: `Lookahead`, `Not`
//! - **Decorations**: `Token` (trailing whitespace), `Capture`
//! - **Recursion**: `LeftRecursive`, `Cluster`, `WithMinPrecedence`
//! - **Transient / extension**: `Reference` (resolved away), `Custom`

mod builder;
mod copy;

pub use builder::{GrammarBuilder, Peg, PegGroup};

use crate::engine::MatchContext;
use crate::error::{EngineError, GrammarError};
use bitflags::bitflags;
use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Handle to an expression stored in a [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    /// Position of the expression in its arena.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("expression arena exceeds u32::MAX nodes"))
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Per-expression engine hints.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExprFlags: u8 {
        /// Failures of this expression are reported to the error handler.
        const RECORD_ERRORS = 1;
        /// Outcomes are memoized when the memo strategy is `Rules`.
        const MEMOIZE = 1 << 1;
    }
}

/// Associativity tag of a precedence group inside a [`ExprKind::Cluster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupKind {
    /// Alternatives are tried once, no seed growing.
    #[default]
    None,
    /// The level grows its seed; right operands may recurse into the same level.
    LeftRecursive,
    /// The level grows its seed; right operands must bind tighter.
    LeftAssociative,
}

impl GroupKind {
    /// Whether the level participates in seed growing.
    #[must_use]
    pub const fn grows(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One precedence level of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub precedence: u32,
    pub kind: GroupKind,
    pub alternatives: Vec<ExprId>,
}

impl Group {
    #[must_use]
    pub fn new(precedence: u32, kind: GroupKind, alternatives: impl IntoIterator<Item = ExprId>) -> Self {
        Self {
            precedence,
            kind,
            alternatives: alternatives.into_iter().collect(),
        }
    }
}

/// How a [`ExprKind::Capture`] contributes to the capture tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureMode {
    /// Wrap everything captured by the operand into a new node. When `false`,
    /// the accessor and tags are applied to the operand's own captures instead.
    pub capture: bool,
    /// Store the matched text on the new node.
    pub capture_text: bool,
    /// The accessor names a group (list) rather than a single child.
    pub multiple: bool,
    pub accessor: Option<CompactString>,
    pub tags: SmallVec<[CompactString; 2]>,
}

impl CaptureMode {
    /// A wrapping node reachable through `accessor`.
    #[must_use]
    pub fn node(accessor: impl Into<CompactString>) -> Self {
        Self {
            capture: true,
            accessor: Some(accessor.into()),
            ..Self::default()
        }
    }

    /// A wrapping node that also records the matched text.
    #[must_use]
    pub fn text(accessor: impl Into<CompactString>) -> Self {
        Self {
            capture_text: true,
            ..Self::node(accessor)
        }
    }

    /// Renames the operand's captures without adding a level.
    #[must_use]
    pub fn decorate(accessor: impl Into<CompactString>) -> Self {
        Self {
            accessor: Some(accessor.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<CompactString>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub const fn with_text(mut self) -> Self {
        self.capture_text = true;
        self
    }
}

/// Nullability declared by a custom expression over its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomNullability {
    Yes,
    No,
    AllChildren,
    AnyChild,
}

/// Signature of the matching closure of a custom expression.
pub type CustomMatcher = dyn Fn(&mut MatchContext<'_, '_>) -> Result<bool, EngineError> + Send + Sync;

/// Extension-supplied expression.
///
/// The closure receives a [`MatchContext`] and reports success or failure. On
/// success it must have advanced the context past what it matched; on failure
/// the engine restores the parse state.
#[derive(Clone)]
pub struct CustomExpr {
    pub description: CompactString,
    pub children: Vec<ExprId>,
    pub nullability: CustomNullability,
    pub matcher: Arc<CustomMatcher>,
}

impl CustomExpr {
    pub fn new<F>(description: impl Into<CompactString>, children: Vec<ExprId>, matcher: F) -> Self
    where
        F: Fn(&mut MatchContext<'_, '_>) -> Result<bool, EngineError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            children,
            nullability: CustomNullability::No,
            matcher: Arc::new(matcher),
        }
    }

    #[must_use]
    pub const fn with_nullability(mut self, nullability: CustomNullability) -> Self {
        self.nullability = nullability;
        self
    }
}

impl fmt::Debug for CustomExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomExpr")
            .field("description", &self.description)
            .field("children", &self.children)
            .field("nullability", &self.nullability)
            .finish_non_exhaustive()
    }
}

/// The closed set of expression variants.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Match an exact string.
    Literal(CompactString),
    /// Match any single character.
    Any,
    /// Match one character in the inclusive range.
    CharRange(char, char),
    /// Match one character out of the set.
    CharSet(SmallVec<[char; 8]>),
    Sequence(Vec<ExprId>),
    /// Ordered choice: first success wins.
    Choice(Vec<ExprId>),
    Optional(ExprId),
    ZeroMore(ExprId),
    OneMore(ExprId),
    Lookahead(ExprId),
    Not(ExprId),
    /// Operand followed by the grammar's whitespace.
    Token(ExprId),
    Capture { operand: ExprId, mode: CaptureMode },
    LeftRecursive { operand: ExprId, left_associative: bool },
    /// Precedence levels; stored sorted by decreasing precedence.
    Cluster(Vec<Group>),
    /// Override every cluster's precedence floor while parsing the operand.
    WithMinPrecedence { operand: ExprId, precedence: u32 },
    /// Placeholder for a named rule, replaced by reference resolution.
    Reference(CompactString),
    Custom(CustomExpr),
}

impl ExprKind {
    /// Short variant name, used when an expression has no better description.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Any => "any",
            Self::CharRange(..) => "char range",
            Self::CharSet(_) => "char set",
            Self::Sequence(_) => "sequence",
            Self::Choice(_) => "choice",
            Self::Optional(_) => "optional",
            Self::ZeroMore(_) => "zero or more",
            Self::OneMore(_) => "one or more",
            Self::Lookahead(_) => "lookahead",
            Self::Not(_) => "not",
            Self::Token(_) => "token",
            Self::Capture { .. } => "capture",
            Self::LeftRecursive { .. } => "left recursive",
            Self::Cluster(_) => "cluster",
            Self::WithMinPrecedence { .. } => "with min precedence",
            Self::Reference(_) => "reference",
            Self::Custom(_) => "custom",
        }
    }

    /// Whether this is a recursion boundary for left-recursion analysis.
    #[must_use]
    pub const fn is_recursion_boundary(&self) -> bool {
        matches!(self, Self::LeftRecursive { .. } | Self::Cluster(_))
    }

    /// Terminals report their failures by default.
    #[must_use]
    pub const fn default_flags(&self) -> ExprFlags {
        match self {
            Self::Literal(_) | Self::Any | Self::CharRange(..) | Self::CharSet(_) | Self::Token(_) => {
                ExprFlags::RECORD_ERRORS
            }
            _ => ExprFlags::empty(),
        }
    }

    fn children(&self) -> SmallVec<[ExprId; 4]> {
        match self {
            Self::Literal(_)
            | Self::Any
            | Self::CharRange(..)
            | Self::CharSet(_)
            | Self::Reference(_) => SmallVec::new(),
            Self::Sequence(items) | Self::Choice(items) => items.iter().copied().collect(),
            Self::Optional(e)
            | Self::ZeroMore(e)
            | Self::OneMore(e)
            | Self::Lookahead(e)
            | Self::Not(e)
            | Self::Token(e)
            | Self::Capture { operand: e, .. }
            | Self::LeftRecursive { operand: e, .. }
            | Self::WithMinPrecedence { operand: e, .. } => SmallVec::from_elem(*e, 1),
            Self::Cluster(groups) => groups
                .iter()
                .flat_map(|g| g.alternatives.iter().copied())
                .collect(),
            Self::Custom(custom) => custom.children.iter().copied().collect(),
        }
    }

    fn child_slot_mut(&mut self, index: usize) -> Option<&mut ExprId> {
        match self {
            Self::Literal(_)
            | Self::Any
            | Self::CharRange(..)
            | Self::CharSet(_)
            | Self::Reference(_) => None,
            Self::Sequence(items) | Self::Choice(items) => items.get_mut(index),
            Self::Optional(e)
            | Self::ZeroMore(e)
            | Self::OneMore(e)
            | Self::Lookahead(e)
            | Self::Not(e)
            | Self::Token(e)
            | Self::Capture { operand: e, .. }
            | Self::LeftRecursive { operand: e, .. }
            | Self::WithMinPrecedence { operand: e, .. } => (index == 0).then_some(e),
            Self::Cluster(groups) => groups
                .iter_mut()
                .flat_map(|g| g.alternatives.iter_mut())
                .nth(index),
            Self::Custom(custom) => custom.children.get_mut(index),
        }
    }
}

/// A node of the grammar graph.
#[derive(Debug, Clone)]
pub struct Expr {
    pub name: Option<CompactString>,
    pub kind: ExprKind,
    pub flags: ExprFlags,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind) -> Self {
        let flags = kind.default_flags();
        Self {
            name: None,
            kind,
            flags,
        }
    }

    #[must_use]
    pub fn records_errors(&self) -> bool {
        self.flags.contains(ExprFlags::RECORD_ERRORS)
    }
}

/// Arena of parsing expressions plus the rule table.
///
/// The grammar owns every node. Preprocessing passes mutate it through
/// [`Grammar::replace_child`] and [`Grammar::wrap_in_place`]; any mutation clears
/// the prepared flag so that [`crate::Parser::new`] refuses a graph that was
/// changed after [`Grammar::prepare`].
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    exprs: Vec<Expr>,
    rules: HashMap<CompactString, ExprId, ahash::RandomState>,
    root: Option<ExprId>,
    whitespace: Option<ExprId>,
    prepared: bool,
}

impl Grammar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expression and return its handle.
    pub fn add(&mut self, kind: ExprKind) -> ExprId {
        self.push(Expr::new(kind))
    }

    pub(crate) fn push(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::from_index(self.exprs.len());
        self.exprs.push(expr);
        self.prepared = false;
        id
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this grammar.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[must_use]
    pub fn try_get(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this grammar.
    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
        self.prepared = false;
        &mut self.exprs[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.get(id).kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Every id in the arena, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = ExprId> + '_ {
        (0..self.exprs.len()).map(ExprId::from_index)
    }

    /// Ordered children of an expression.
    #[must_use]
    pub fn children(&self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        self.get(id).kind.children()
    }

    /// Replace the `index`-th child of `parent` (in [`Grammar::children`] order).
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UnknownExpression`] if `parent` has no such child.
    pub fn replace_child(&mut self, parent: ExprId, index: usize, child: ExprId) -> Result<(), GrammarError> {
        let slot = self
            .exprs
            .get_mut(parent.index())
            .and_then(|e| e.kind.child_slot_mut(index))
            .ok_or_else(|| GrammarError::UnknownExpression(format!("child {index} of {parent}")))?;
        *slot = child;
        self.prepared = false;
        Ok(())
    }

    /// Move the node at `id` to a fresh slot and store `wrap(new_id)` at `id`.
    ///
    /// Every parent that pointed at `id` now points at the wrapper. The name stays
    /// on the wrapper, so error messages and rule lookups keep working.
    pub fn wrap_in_place(&mut self, id: ExprId, wrap: impl FnOnce(ExprId) -> ExprKind) -> ExprId {
        let mut moved = self.exprs[id.index()].clone();
        let name = moved.name.take();
        let flags = moved.flags;
        moved.flags = moved.kind.default_flags();
        let inner = self.push(moved);
        let kind = wrap(inner);
        let flags = flags | kind.default_flags();
        self.exprs[id.index()] = Expr { name, kind, flags };
        inner
    }

    /// Register `id` as the rule `name`. Named rules record errors and are
    /// memoized under [`MemoStrategy::Rules`](crate::memo::MemoStrategy).
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::DuplicateRule`] if the name is already taken by
    /// another expression.
    pub fn define_rule(&mut self, name: impl Into<CompactString>, id: ExprId) -> Result<ExprId, GrammarError> {
        let name = name.into();
        if let Some(&existing) = self.rules.get(&name)
            && existing != id
        {
            return Err(GrammarError::DuplicateRule(name.to_string()));
        }
        let expr = self.get_mut(id);
        expr.name = Some(name.clone());
        expr.flags |= ExprFlags::RECORD_ERRORS | ExprFlags::MEMOIZE;
        self.rules.insert(name, id);
        Ok(id)
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<ExprId> {
        self.rules.get(name).copied()
    }

    /// Registered rules, sorted by expression id for deterministic traversal.
    #[must_use]
    pub fn rules(&self) -> Vec<(&str, ExprId)> {
        let mut rules: Vec<_> = self.rules.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        rules.sort_by_key(|(_, id)| *id);
        rules
    }

    pub(crate) fn repoint_rules(&mut self, mut f: impl FnMut(ExprId) -> ExprId) {
        for id in self.rules.values_mut() {
            *id = f(*id);
        }
        self.root = self.root.map(&mut f);
        self.whitespace = self.whitespace.map(f);
    }

    pub fn set_root(&mut self, id: ExprId) {
        self.root = Some(id);
        self.prepared = false;
    }

    #[must_use]
    pub const fn root(&self) -> Option<ExprId> {
        self.root
    }

    /// Expression skipped after every [`ExprKind::Token`], in fast mode.
    pub fn set_whitespace(&mut self, id: ExprId) {
        self.whitespace = Some(id);
        self.prepared = false;
    }

    #[must_use]
    pub const fn whitespace(&self) -> Option<ExprId> {
        self.whitespace
    }

    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn mark_prepared(&mut self) {
        self.prepared = true;
    }

    /// Human-readable description used in error reports.
    #[must_use]
    pub fn describe(&self, id: ExprId) -> String {
        let expr = self.get(id);
        if let Some(name) = &expr.name {
            return name.to_string();
        }
        match &expr.kind {
            ExprKind::Literal(text) => format!("{:?}", text.as_str()),
            ExprKind::Any => "any character".to_string(),
            ExprKind::CharRange(lo, hi) => format!("[{lo:?}-{hi:?}]"),
            ExprKind::CharSet(chars) => {
                let set: String = chars.iter().collect();
                format!("[{set}]")
            }
            ExprKind::Token(operand) => self.describe(*operand),
            ExprKind::Capture { operand, mode } => match &mode.accessor {
                Some(accessor) => accessor.to_string(),
                None => self.describe(*operand),
            },
            ExprKind::Reference(target) => target.to_string(),
            ExprKind::Custom(custom) => custom.description.to_string(),
            kind => format!("{} {id}", kind.variant_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_follow_variant_order() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Literal("a".into()));
        let b = g.add(ExprKind::Literal("b".into()));
        let seq = g.add(ExprKind::Sequence(vec![a, b]));
        let cluster = g.add(ExprKind::Cluster(vec![
            Group::new(2, GroupKind::None, [b]),
            Group::new(1, GroupKind::LeftAssociative, [seq, a]),
        ]));
        assert_eq!(g.children(seq).as_slice(), &[a, b]);
        assert_eq!(g.children(cluster).as_slice(), &[b, seq, a]);
    }

    #[test]
    fn replace_child_reaches_cluster_alternatives() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Literal("a".into()));
        let b = g.add(ExprKind::Literal("b".into()));
        let cluster = g.add(ExprKind::Cluster(vec![
            Group::new(2, GroupKind::None, [a]),
            Group::new(1, GroupKind::None, [a, a]),
        ]));
        g.replace_child(cluster, 2, b).unwrap();
        assert_eq!(g.children(cluster).as_slice(), &[a, a, b]);
        assert!(g.replace_child(cluster, 3, b).is_err());
    }

    #[test]
    fn wrap_in_place_keeps_parents_and_name() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Literal("a".into()));
        let rule = g.add(ExprKind::Sequence(vec![a]));
        g.define_rule("R", rule).unwrap();
        let parent = g.add(ExprKind::Optional(rule));

        let inner = g.wrap_in_place(rule, |operand| ExprKind::LeftRecursive {
            operand,
            left_associative: false,
        });

        assert_eq!(g.children(parent).as_slice(), &[rule]);
        assert!(matches!(g.kind(rule), ExprKind::LeftRecursive { operand, .. } if *operand == inner));
        assert_eq!(g.get(rule).name.as_deref(), Some("R"));
        assert!(g.get(inner).name.is_none());
        assert!(matches!(g.kind(inner), ExprKind::Sequence(_)));
    }

    #[test]
    fn duplicate_rule_names_are_rejected() {
        let mut g = Grammar::new();
        let a = g.add(ExprKind::Any);
        let b = g.add(ExprKind::Any);
        g.define_rule("X", a).unwrap();
        assert!(g.define_rule("X", a).is_ok());
        assert!(matches!(g.define_rule("X", b), Err(GrammarError::DuplicateRule(_))));
    }

    #[test]
    fn describe_terminals() {
        let mut g = Grammar::new();
        let lit = g.add(ExprKind::Literal("b".into()));
        let range = g.add(ExprKind::CharRange('a', 'z'));
        let tok = g.add(ExprKind::Token(lit));
        assert_eq!(g.describe(lit), "\"b\"");
        assert_eq!(g.describe(range), "['a'-'z']");
        assert_eq!(g.describe(tok), "\"b\"");
    }
}
