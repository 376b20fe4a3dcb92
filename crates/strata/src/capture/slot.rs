use super::CaptureNode;
use crate::expr::CaptureMode;
use crate::state::StateSlot;
use compact_str::CompactString;
use std::ops::Range;
use std::sync::Arc;

/// Flat list of captured nodes not yet claimed by an enclosing capture.
///
/// Nodes before `committed` belong to the committed view. A `Capture`
/// expression remembers the list length when it starts and, on success, folds
/// everything pushed since into one node.
#[derive(Debug, Clone, Default)]
pub struct CaptureSlot {
    nodes: Vec<Arc<CaptureNode>>,
    committed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSnapshot {
    committed: usize,
    len: usize,
}

impl CaptureSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Arc<CaptureNode>] {
        &self.nodes
    }

    /// Apply a successful `Capture` whose operand started when the list had
    /// `base` nodes.
    pub(crate) fn close(&mut self, base: usize, mode: &CaptureMode, span: Range<usize>, text: Option<CompactString>) {
        if mode.capture {
            let children = self.nodes.drain(base..).collect();
            self.nodes.push(Arc::new(CaptureNode {
                accessor: mode.accessor.clone(),
                multiple: mode.multiple,
                tags: mode.tags.clone(),
                span,
                text,
                children,
            }));
            return;
        }
        for node in &mut self.nodes[base..] {
            let node = Arc::make_mut(node);
            if mode.accessor.is_some() {
                node.accessor.clone_from(&mode.accessor);
                node.multiple = mode.multiple;
            }
            node.tags.extend(mode.tags.iter().cloned());
        }
    }

    /// Everything captured, as the children of a root node.
    pub(crate) fn finish(&self, span: Range<usize>) -> CaptureNode {
        CaptureNode::root(span, self.nodes.clone())
    }
}

impl StateSlot for CaptureSlot {
    type Snapshot = CaptureSnapshot;
    type Delta = Arc<[Arc<CaptureNode>]>;

    fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            committed: self.committed,
            len: self.nodes.len(),
        }
    }

    fn restore(&mut self, snapshot: &CaptureSnapshot) {
        self.nodes.truncate(snapshot.len);
        self.committed = snapshot.committed;
    }

    fn uncommit(&mut self, snapshot: &CaptureSnapshot) {
        self.committed = snapshot.committed;
    }

    fn discard(&mut self) {
        self.nodes.truncate(self.committed);
    }

    fn commit(&mut self) {
        self.committed = self.nodes.len();
    }

    fn extract(&self) -> Option<Self::Delta> {
        (self.nodes.len() > self.committed).then(|| Arc::from(&self.nodes[self.committed..]))
    }

    fn merge(&mut self, delta: &Self::Delta) {
        self.nodes.extend(delta.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> Arc<CaptureNode> {
        Arc::new(CaptureNode {
            text: Some(text.into()),
            ..CaptureNode::default()
        })
    }

    #[test]
    fn transactional_views() {
        let mut slot = CaptureSlot::new();
        let outer = StateSlot::snapshot(&slot);
        slot.nodes.push(leaf("a"));
        StateSlot::commit(&mut slot);
        slot.nodes.push(leaf("b"));

        let delta = StateSlot::extract(&slot).unwrap();
        assert_eq!(delta.len(), 1);

        StateSlot::discard(&mut slot);
        assert_eq!(slot.len(), 1);

        StateSlot::uncommit(&mut slot, &outer);
        let delta = StateSlot::extract(&slot).unwrap();
        assert_eq!(delta[0].text(), Some("a"));

        StateSlot::restore(&mut slot, &outer);
        assert!(slot.is_empty());
        assert!(StateSlot::extract(&slot).is_none());

        StateSlot::merge(&mut slot, &delta);
        assert_eq!(slot.len(), 1);
    }

    #[test]
    fn close_wraps_or_decorates() {
        let mut slot = CaptureSlot::new();
        slot.nodes.push(leaf("x"));
        slot.nodes.push(leaf("1"));
        slot.nodes.push(leaf("2"));

        slot.close(1, &CaptureMode::decorate("arg").multiple(), 1..3, None);
        assert_eq!(slot.len(), 3);
        assert!(slot.nodes[2].multiple);

        slot.close(1, &CaptureMode::node("call"), 1..3, None);
        assert_eq!(slot.len(), 2);
        let call = &slot.nodes[1];
        assert_eq!(call.group("arg").len(), 2);
        assert_eq!(call.span, 1..3);
    }
}
