//! Template tree node

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identity of a node. Positive, unique, never reused.
pub type NodeId = u64;

/// Ordered field name → default value mapping.
pub type Attributes = IndexMap<String, String>;

/// Id of the root in a freshly created template.
pub const ROOT_ID: NodeId = 1;

/// One entry of the template tree: the root or a section.
///
/// Unknown fields in persisted records are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Category tag, empty for the root
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Back-reference to the parent, `None` only for the root
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Node {
    pub fn root() -> Self {
        Self {
            id: ROOT_ID,
            name: "Root".to_string(),
            kind: String::new(),
            parent: None,
            attributes: Attributes::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() || self.kind == self.name {
            write!(f, "{} #{}", self.name, self.id)
        } else {
            write!(f, "{} ({}) #{}", self.name, self.kind, self.id)
        }
    }
}

/// Direction of a sibling swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown direction: {other} (expected up|down)")),
        }
    }
}
