//! Read-only views over the flat node collection.
//!
//! Nothing here is cached: every query re-derives from the slice it was
//! built on, so the views can never drift from the store.

use std::collections::{BTreeSet, HashSet};

use termtree::Tree;
use tracing::{instrument, warn};

use crate::domain::node::{Node, NodeId};

/// Result of walking `parent` links from a node towards the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ancestry {
    /// Reached a parentless node after this many hops
    Depth(usize),
    /// Hit a `parent` value that resolves to no node
    Dangling { missing: NodeId },
    /// Came back to a node already on the path
    Cyclic,
}

/// Stateless query engine over a node snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TreeQuery<'a> {
    nodes: &'a [Node],
}

impl<'a> TreeQuery<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        Self { nodes }
    }

    pub fn get(&self, id: NodeId) -> Option<&'a Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// First parentless node in collection order.
    pub fn root(&self) -> Option<&'a Node> {
        self.nodes.iter().find(|n| n.is_root())
    }

    /// Direct children in flat-collection order.
    pub fn children_of(&self, id: NodeId) -> Vec<&'a Node> {
        self.nodes.iter().filter(|n| n.parent == Some(id)).collect()
    }

    pub fn root_children(&self) -> Vec<&'a Node> {
        match self.root() {
            Some(root) => self.children_of(root.id),
            None => Vec::new(),
        }
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.parent == Some(id))
    }

    pub fn parent_of(&self, id: NodeId) -> Option<&'a Node> {
        self.get(id).and_then(|n| n.parent).and_then(|p| self.get(p))
    }

    /// Transitive closure of `children_of`.
    ///
    /// Terminates on cyclic input: each node is expanded at most once. If the
    /// start node shows up among its own descendants the tree is corrupted and
    /// a warning is logged.
    #[instrument(level = "trace", skip(self))]
    pub fn descendants_of(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut found = BTreeSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            for child in self.children_of(current) {
                if found.insert(child.id) {
                    stack.push(child.id);
                }
            }
        }

        if found.contains(&id) {
            warn!("descendants_of: node {} is its own ancestor", id);
        }
        found
    }

    /// Walk `parent` links until a parentless node, a dangling reference or a
    /// repeat. Returns `None` for an unknown id.
    pub fn ancestry(&self, id: NodeId) -> Option<Ancestry> {
        let mut current = self.get(id)?;
        let mut seen = HashSet::from([current.id]);
        let mut hops = 0;

        while let Some(parent_id) = current.parent {
            let Some(parent) = self.get(parent_id) else {
                return Some(Ancestry::Dangling { missing: parent_id });
            };
            if !seen.insert(parent.id) {
                return Some(Ancestry::Cyclic);
            }
            hops += 1;
            current = parent;
        }
        Some(Ancestry::Depth(hops))
    }

    /// Distance to the root; root has depth 0. `None` when the id is unknown
    /// or its ancestor chain is broken.
    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        match self.ancestry(id)? {
            Ancestry::Depth(depth) => Some(depth),
            Ancestry::Dangling { .. } | Ancestry::Cyclic => None,
        }
    }

    /// Non-root nodes whose name or any attribute key contains `term`
    /// (case-insensitive). An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<&'a Node> {
        let needle = term.trim().to_lowercase();
        self.nodes
            .iter()
            .filter(|n| !n.is_root())
            .filter(|n| {
                needle.is_empty()
                    || n.name.to_lowercase().contains(&needle)
                    || n.attributes.keys().any(|k| k.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Render the hierarchy below the root as a text tree.
    ///
    /// Recursion stops after `max_depth` levels; a cut is marked with `…`.
    pub fn render_tree(&self, max_depth: usize) -> Tree<String> {
        fn build(query: &TreeQuery<'_>, id: NodeId, level: usize, max: usize, tree: &mut Tree<String>) {
            for child in query.children_of(id) {
                let mut child_tree = Tree::new(child.to_string());
                if level < max {
                    build(query, child.id, level + 1, max, &mut child_tree);
                } else if query.has_children(child.id) {
                    child_tree.push(Tree::new("…".to_string()));
                }
                tree.push(child_tree);
            }
        }

        match self.root() {
            Some(root) => {
                let mut tree = Tree::new(root.to_string());
                build(self, root.id, 1, max_depth.max(1), &mut tree);
                tree
            }
            None => Tree::new("Empty template".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::Attributes;

    fn node(id: NodeId, parent: Option<NodeId>) -> Node {
        Node {
            id,
            name: format!("N{id}"),
            kind: if parent.is_none() { String::new() } else { "SECTION".into() },
            parent,
            attributes: Attributes::new(),
        }
    }

    fn sample() -> Vec<Node> {
        vec![
            node(1, None),
            node(2, Some(1)),
            node(3, Some(2)),
            node(4, Some(1)),
            node(5, Some(3)),
        ]
    }

    #[test]
    fn given_tree_when_children_of_then_returns_collection_order() {
        let nodes = sample();
        let query = TreeQuery::new(&nodes);
        let ids: Vec<_> = query.children_of(1).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn given_tree_when_descendants_of_then_returns_transitive_closure() {
        let nodes = sample();
        let query = TreeQuery::new(&nodes);
        assert_eq!(query.descendants_of(2), BTreeSet::from([3, 5]));
        assert!(query.descendants_of(5).is_empty());
        assert!(!query.descendants_of(1).contains(&1));
    }

    #[test]
    fn given_tree_when_depth_of_then_counts_hops_to_root() {
        let nodes = sample();
        let query = TreeQuery::new(&nodes);
        assert_eq!(query.depth_of(1), Some(0));
        assert_eq!(query.depth_of(2), Some(1));
        assert_eq!(query.depth_of(5), Some(3));
        assert_eq!(query.depth_of(99), None);
    }

    #[test]
    fn given_cycle_when_querying_then_terminates_and_reports() {
        let nodes = vec![node(1, None), node(2, Some(3)), node(3, Some(2))];
        let query = TreeQuery::new(&nodes);
        assert_eq!(query.descendants_of(2), BTreeSet::from([2, 3]));
        assert_eq!(query.ancestry(2), Some(Ancestry::Cyclic));
        assert_eq!(query.depth_of(3), None);
    }

    #[test]
    fn given_dangling_parent_when_ancestry_then_names_missing_id() {
        let nodes = vec![node(1, None), node(2, Some(42))];
        let query = TreeQuery::new(&nodes);
        assert_eq!(query.ancestry(2), Some(Ancestry::Dangling { missing: 42 }));
    }

    #[test]
    fn given_term_when_search_then_matches_name_or_attribute_key() {
        let mut nodes = sample();
        nodes[3].name = "Bibliografía".into();
        nodes[1].attributes.insert("Referencias".into(), String::new());
        let query = TreeQuery::new(&nodes);

        let ids: Vec<_> = query.search("BIBLIO").iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4]);
        let ids: Vec<_> = query.search("referen").iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(query.search("").len(), 4);
    }

    #[test]
    fn given_depth_limit_when_render_tree_then_marks_cut() {
        let nodes = sample();
        let query = TreeQuery::new(&nodes);
        let rendered = query.render_tree(2).to_string();
        assert!(rendered.contains("N3"));
        assert!(!rendered.contains("N5"));
        assert!(rendered.contains('…'));
    }
}
