//! Drag-and-drop reparenting as an explicit state machine.
//!
//! A gesture runs `Idle → Dragging → Hovering* → Dropped | Cancelled` and
//! produces at most one structural mutation. Cancelled and rejected gestures
//! leave the tree untouched; every terminal transition returns to `Idle`.

use tracing::{debug, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, NodeId};
use crate::domain::store::NodeStore;

/// Anything that can reparent a node: the bare store, or a service that
/// also persists the change.
pub trait Reparent {
    fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> DomainResult<Node>;
    fn node(&self, id: NodeId) -> Option<&Node>;
}

impl Reparent for NodeStore {
    fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> DomainResult<Node> {
        NodeStore::reparent(self, id, new_parent)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.get(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { source: NodeId },
    Hovering { source: NodeId, target: NodeId },
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// The source now lives under the drop target
    Moved(Node),
    /// Dropped onto itself
    NoOp,
    /// Released without a drop target, or no gesture in progress
    Cancelled,
    /// The reparent was refused; nothing changed
    Rejected(DomainError),
}

#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Begin dragging `source`. The root and unknown ids cannot be dragged;
    /// the session stays idle then.
    pub fn start(&mut self, tree: &impl Reparent, source: NodeId) -> DomainResult<()> {
        let node = tree.node(source).ok_or(DomainError::NodeNotFound(source))?;
        if node.is_root() {
            return Err(DomainError::RootImmovable(source));
        }
        debug!("drag start: source={}", source);
        self.state = DragState::Dragging { source };
        Ok(())
    }

    /// Pointer entered a candidate drop node. Ignored while idle.
    pub fn hover(&mut self, target: NodeId) -> bool {
        match self.state {
            DragState::Dragging { source } | DragState::Hovering { source, .. } => {
                self.state = DragState::Hovering { source, target };
                true
            }
            DragState::Idle => false,
        }
    }

    /// Drop onto `target`, performing the single reparent of this gesture.
    pub fn drop_on(&mut self, tree: &mut impl Reparent, target: NodeId) -> DragOutcome {
        let state = std::mem::take(&mut self.state);
        let source = match state {
            DragState::Dragging { source } | DragState::Hovering { source, .. } => source,
            DragState::Idle => return DragOutcome::Cancelled,
        };
        if source == target {
            debug!("drag drop: source {} onto itself", source);
            return DragOutcome::NoOp;
        }
        match tree.reparent(source, target) {
            Ok(node) => {
                debug!("drag drop: moved {} under {}", source, target);
                DragOutcome::Moved(node)
            }
            Err(e) => {
                warn!("drag drop rejected: {}", e);
                DragOutcome::Rejected(e)
            }
        }
    }

    /// Pointer released outside any target.
    pub fn cancel(&mut self) -> DragOutcome {
        if self.state != DragState::Idle {
            debug!("drag cancelled: {:?}", self.state);
        }
        self.state = DragState::Idle;
        DragOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::Attributes;

    /// Root(1) -> S1(2), S2(3)
    fn store() -> NodeStore {
        let mut store = NodeStore::new();
        store.insert(1, "S1", "SUMILLA", Attributes::new()).unwrap();
        store.insert(1, "S2", "EVALUACION", Attributes::new()).unwrap();
        store
    }

    #[test]
    fn given_gesture_with_hovers_when_dropped_then_reparents_once() {
        let mut tree = store();
        let mut drag = DragSession::new();

        drag.start(&tree, 3).unwrap();
        assert!(drag.hover(1));
        assert!(drag.hover(2));
        assert_eq!(drag.state(), DragState::Hovering { source: 3, target: 2 });

        let outcome = drag.drop_on(&mut tree, 2);

        assert!(matches!(outcome, DragOutcome::Moved(ref n) if n.parent == Some(2)));
        assert_eq!(drag.state(), DragState::Idle);
        let children: Vec<_> = tree.query().children_of(2).iter().map(|n| n.id).collect();
        assert_eq!(children, vec![3]);
    }

    #[test]
    fn given_drop_on_descendant_when_dropped_then_rejected_and_unchanged() {
        let mut tree = store();
        tree.reparent(3, 2).unwrap();
        let before = tree.clone();
        let mut drag = DragSession::new();

        drag.start(&tree, 2).unwrap();
        let outcome = drag.drop_on(&mut tree, 3);

        assert_eq!(
            outcome,
            DragOutcome::Rejected(DomainError::CyclicReparent { id: 2, new_parent: 3 })
        );
        assert_eq!(tree, before);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn given_drop_on_self_when_dropped_then_noop() {
        let mut tree = store();
        let before = tree.clone();
        let mut drag = DragSession::new();
        drag.start(&tree, 2).unwrap();
        assert_eq!(drag.drop_on(&mut tree, 2), DragOutcome::NoOp);
        assert_eq!(tree, before);
    }

    #[test]
    fn given_root_when_start_then_refused_and_idle() {
        let tree = store();
        let mut drag = DragSession::new();
        assert_eq!(drag.start(&tree, 1), Err(DomainError::RootImmovable(1)));
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn given_gesture_when_cancelled_then_nothing_changes() {
        let mut tree = store();
        let before = tree.clone();
        let mut drag = DragSession::new();
        drag.start(&tree, 2).unwrap();
        drag.hover(3);
        assert_eq!(drag.cancel(), DragOutcome::Cancelled);
        assert_eq!(drag.drop_on(&mut tree, 3), DragOutcome::Cancelled);
        assert_eq!(tree, before);
    }

    #[test]
    fn given_idle_when_hover_then_ignored() {
        let mut drag = DragSession::new();
        assert!(!drag.hover(2));
        assert_eq!(drag.state(), DragState::Idle);
    }
}
