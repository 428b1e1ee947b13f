//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent structural violations of the template tree.
/// A failing operation never leaves the store partially modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid parent: no node with id {0}")]
    InvalidParent(NodeId),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("the root node ({0}) cannot be deleted")]
    RootDeletionForbidden(NodeId),

    #[error("the root node ({0}) cannot be moved")]
    RootImmovable(NodeId),

    #[error("moving node {id} under {new_parent} would create a cycle")]
    CyclicReparent { id: NodeId, new_parent: NodeId },

    #[error("malformed template snapshot: {0}")]
    MalformedSnapshot(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
