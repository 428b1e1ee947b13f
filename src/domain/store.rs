//! Node Store: the flat, ordered collection of template nodes.
//!
//! Nodes live in a `Vec` whose order defines sibling order, with an
//! id → position index for O(1) lookups. Parent links are plain ids; tree
//! views are derived on demand through [`TreeQuery`].
//!
//! Ids come from a high-water mark that only grows, so an id freed by a
//! deletion is never handed out again. The mark is part of the persisted
//! state; [`NodeStore::with_high_water`] restores it after a reload.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Attributes, Direction, Node, NodeId};
use crate::domain::query::TreeQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStore {
    nodes: Vec<Node>,
    positions: HashMap<NodeId, usize>,
    high_water: NodeId,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// A template holding only the root.
    pub fn new() -> Self {
        let nodes = vec![Node::root()];
        let positions = Self::index(&nodes);
        let high_water = Self::max_id(&nodes);
        Self {
            nodes,
            positions,
            high_water,
        }
    }

    /// Adopt a loaded collection.
    ///
    /// Rejects an empty collection, non-positive ids and duplicate ids.
    /// Dangling parents or a missing root are accepted here and reported by
    /// the validator instead.
    pub fn from_nodes(nodes: Vec<Node>) -> DomainResult<Self> {
        if nodes.is_empty() {
            return Err(DomainError::MalformedSnapshot(
                "template contains no nodes".to_string(),
            ));
        }
        let mut positions = HashMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            if node.id == 0 {
                return Err(DomainError::MalformedSnapshot(format!(
                    "node '{}' has id 0, ids must be positive",
                    node.name
                )));
            }
            if positions.insert(node.id, pos).is_some() {
                return Err(DomainError::MalformedSnapshot(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
        }
        let high_water = Self::max_id(&nodes);
        Ok(Self {
            nodes,
            positions,
            high_water,
        })
    }

    /// Raise the id high-water mark to at least `floor`.
    ///
    /// Used when hydrating, so ids of nodes deleted in an earlier session
    /// stay retired. A floor below the largest present id has no effect.
    pub fn with_high_water(mut self, floor: NodeId) -> Self {
        self.high_water = self.high_water.max(floor);
        self
    }

    /// Largest id ever handed out or loaded.
    pub fn high_water(&self) -> NodeId {
        self.high_water
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.positions.get(&id).map(|&pos| &self.nodes[pos])
    }

    pub fn query(&self) -> TreeQuery<'_> {
        TreeQuery::new(&self.nodes)
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.query().root().map(|n| n.id)
    }

    /// Next id under the monotonic rule: `max(existing) + 1`, where
    /// "existing" includes ids removed earlier.
    pub fn next_id(&self) -> NodeId {
        self.high_water.max(Self::max_id(&self.nodes)) + 1
    }

    /// Append a new node as the last child of `parent`.
    #[instrument(level = "debug", skip(self, attributes))]
    pub fn insert(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: &str,
        attributes: Attributes,
    ) -> DomainResult<Node> {
        if !self.positions.contains_key(&parent) {
            return Err(DomainError::InvalidParent(parent));
        }
        let node = Node {
            id: self.next_id(),
            name: name.to_string(),
            kind: kind.to_string(),
            parent: Some(parent),
            attributes,
        };
        self.high_water = node.id;
        self.positions.insert(node.id, self.nodes.len());
        self.nodes.push(node.clone());
        debug!("insert: id={} parent={} kind={}", node.id, parent, node.kind);
        Ok(node)
    }

    /// Remove a node and its whole subtree in one step.
    ///
    /// Returns every removed id so dependent state can react.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, id: NodeId) -> DomainResult<BTreeSet<NodeId>> {
        let node = self.get(id).ok_or(DomainError::NodeNotFound(id))?;
        if node.is_root() {
            return Err(DomainError::RootDeletionForbidden(id));
        }

        let mut removed = self.query().descendants_of(id);
        removed.insert(id);

        self.nodes.retain(|n| !removed.contains(&n.id));
        self.positions = Self::index(&self.nodes);
        debug!("delete: id={} removed={:?}", id, removed);
        Ok(removed)
    }

    /// Move a node (with its subtree) under `new_parent`, as its last child.
    ///
    /// Only the `parent` field changes. Nothing is touched on failure.
    #[instrument(level = "debug", skip(self))]
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> DomainResult<Node> {
        let node = self.get(id).ok_or(DomainError::NodeNotFound(id))?;
        if node.is_root() {
            return Err(DomainError::RootImmovable(id));
        }
        if new_parent == id || self.query().descendants_of(id).contains(&new_parent) {
            return Err(DomainError::CyclicReparent { id, new_parent });
        }
        if !self.positions.contains_key(&new_parent) {
            return Err(DomainError::InvalidParent(new_parent));
        }

        let pos = self.positions[&id];
        let mut moved = self.nodes.remove(pos);
        moved.parent = Some(new_parent);
        self.nodes.push(moved.clone());
        self.positions = Self::index(&self.nodes);
        debug!("reparent: id={} new_parent={}", id, new_parent);
        Ok(moved)
    }

    /// Swap a node with its neighbouring sibling.
    ///
    /// Swaps the backing positions of the two siblings, so every other node
    /// keeps its place. Returns `false` when the node is already first/last.
    #[instrument(level = "debug", skip(self))]
    pub fn reorder(&mut self, id: NodeId, direction: Direction) -> DomainResult<bool> {
        let node = self.get(id).ok_or(DomainError::NodeNotFound(id))?;
        let parent = node.parent;

        let siblings: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent == parent)
            .map(|(pos, _)| pos)
            .collect();
        let Some(rank) = siblings.iter().position(|&pos| self.nodes[pos].id == id) else {
            return Ok(false);
        };

        let target = match direction {
            Direction::Up if rank > 0 => rank - 1,
            Direction::Down if rank + 1 < siblings.len() => rank + 1,
            _ => return Ok(false),
        };

        let (a, b) = (siblings[rank], siblings[target]);
        self.nodes.swap(a, b);
        self.positions.insert(self.nodes[a].id, a);
        self.positions.insert(self.nodes[b].id, b);
        debug!("reorder: id={} direction={:?}", id, direction);
        Ok(true)
    }

    fn max_id(nodes: &[Node]) -> NodeId {
        nodes.iter().map(|n| n.id).max().unwrap_or(0)
    }

    fn index(nodes: &[Node]) -> HashMap<NodeId, usize> {
        nodes.iter().enumerate().map(|(pos, n)| (n.id, pos)).collect()
    }
}
