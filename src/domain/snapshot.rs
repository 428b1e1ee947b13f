//! Template snapshot blobs for import/export.
//!
//! Two shapes are accepted on import: the legacy bare node list and the
//! versioned `{version, nodes, metadata}` document. Export always writes the
//! versioned form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::Node;
use crate::domain::store::NodeStore;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub node_count: usize,
    pub section_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub version: String,
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SnapshotMetadata>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotBlob {
    Versioned(TemplateDocument),
    Legacy(Vec<Node>),
}

impl TemplateDocument {
    pub fn from_store(store: &NodeStore, exported_at: Option<DateTime<Utc>>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            nodes: store.nodes().to_vec(),
            metadata: Some(SnapshotMetadata {
                node_count: store.len(),
                section_count: store.query().root_children().len(),
                exported_at,
            }),
        }
    }

    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DomainError::MalformedSnapshot(e.to_string()))
    }
}

/// Parse either snapshot shape into a node list.
///
/// Fails with `MalformedSnapshot` for anything that is not a non-empty node
/// sequence once unwrapped.
pub fn parse_snapshot(text: &str) -> DomainResult<Vec<Node>> {
    let blob: SnapshotBlob = serde_json::from_str(text).map_err(|e| {
        DomainError::MalformedSnapshot(format!("not a template snapshot: {e}"))
    })?;
    let nodes = match blob {
        SnapshotBlob::Versioned(doc) => doc.nodes,
        SnapshotBlob::Legacy(nodes) => nodes,
    };
    if nodes.is_empty() {
        return Err(DomainError::MalformedSnapshot(
            "snapshot contains no nodes".to_string(),
        ));
    }
    Ok(nodes)
}

/// Serialize the bare node sequence, the shape kept in the key-value store.
pub fn to_node_list_json(store: &NodeStore) -> DomainResult<String> {
    serde_json::to_string(store.nodes()).map_err(|e| DomainError::MalformedSnapshot(e.to_string()))
}
