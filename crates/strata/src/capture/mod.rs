//! # Capture Tree
//!
//! The output of a parse. `Capture` expressions contribute nodes; everything
//! else is transparent. Nodes are addressed by accessor name
//! ([`CaptureNode::get`], [`CaptureNode::group`]) or by tag
//! ([`CaptureNode::tagged`]).

mod slot;

pub use slot::{CaptureSlot, CaptureSnapshot};

use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

/// A node of the capture tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureNode {
    pub accessor: Option<CompactString>,
    /// Member of the group named by `accessor` rather than a single child.
    pub multiple: bool,
    pub tags: SmallVec<[CompactString; 2]>,
    /// Character range of the match.
    pub span: Range<usize>,
    pub text: Option<CompactString>,
    pub children: Vec<Arc<CaptureNode>>,
}

/// The root of a parse's captures.
pub type CaptureTree = CaptureNode;

impl CaptureNode {
    /// Unnamed node holding `children`.
    #[must_use]
    pub fn root(span: Range<usize>, children: Vec<Arc<Self>>) -> Self {
        Self {
            span,
            children,
            ..Self::default()
        }
    }

    /// First single child reachable through `accessor`.
    #[must_use]
    pub fn get(&self, accessor: &str) -> Option<&Self> {
        self.children
            .iter()
            .map(AsRef::as_ref)
            .find(|c| !c.multiple && c.accessor.as_deref() == Some(accessor))
    }

    /// Every group member reachable through `accessor`, in input order.
    #[must_use]
    pub fn group(&self, accessor: &str) -> Vec<&Self> {
        self.children
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| c.multiple && c.accessor.as_deref() == Some(accessor))
            .collect()
    }

    /// Children carrying `tag`.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children
            .iter()
            .map(AsRef::as_ref)
            .filter(move |c| c.has_tag(tag))
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Self> {
        self.children.get(index).map(AsRef::as_ref)
    }

    /// Compact rendering: `(label child ...)` for inner nodes, the text (or the
    /// label) for leaves. The label is the accessor, else the first tag, else `_`.
    #[must_use]
    pub fn to_sexpr(&self) -> String {
        let mut out = String::new();
        self.write_sexpr(&mut out);
        out
    }

    fn label(&self) -> &str {
        self.accessor
            .as_deref()
            .or_else(|| self.tags.first().map(CompactString::as_str))
            .unwrap_or("_")
    }

    fn write_sexpr(&self, out: &mut String) {
        if self.children.is_empty() {
            out.push_str(self.text().unwrap_or_else(|| self.label()));
            return;
        }
        let _ = write!(out, "({}", self.label());
        for child in &self.children {
            out.push(' ');
            child.write_sexpr(out);
        }
        out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(accessor: &str, text: &str, multiple: bool) -> Arc<CaptureNode> {
        Arc::new(CaptureNode {
            accessor: Some(accessor.into()),
            multiple,
            text: Some(text.into()),
            ..CaptureNode::default()
        })
    }

    #[test]
    fn accessors_and_groups() {
        let mut tagged = (*leaf("op", "+", false)).clone();
        tagged.tags.push("binary".into());
        let node = CaptureNode::root(
            0..5,
            vec![
                leaf("lhs", "1", false),
                Arc::new(tagged),
                leaf("arg", "2", true),
                leaf("arg", "3", true),
            ],
        );

        assert_eq!(node.get("lhs").and_then(CaptureNode::text), Some("1"));
        assert!(node.get("arg").is_none());
        let args: Vec<_> = node.group("arg").iter().filter_map(|n| n.text()).collect();
        assert_eq!(args, vec!["2", "3"]);
        assert_eq!(node.tagged("binary").count(), 1);
        assert_eq!(node.to_sexpr(), "(_ 1 + 2 3)");
    }

    #[test]
    fn sexpr_nests() {
        let inner = CaptureNode {
            accessor: Some("add".into()),
            children: vec![leaf("n", "1", false), leaf("n", "2", false)],
            ..CaptureNode::default()
        };
        let outer = CaptureNode {
            accessor: Some("add".into()),
            children: vec![Arc::new(inner), leaf("n", "3", false)],
            ..CaptureNode::default()
        };
        assert_eq!(outer.to_sexpr(), "(add (add 1 2) 3)");
    }
}
