//! Template service: the node store plus its persisted copy.
//!
//! Lifecycle: hydrate once from the key-value store, mutate in memory, flush
//! the whole node list after every successful mutation. Flushing is best
//! effort: a failed write is logged and kept as a warning for the caller, the
//! in-memory store stays authoritative.
//!
//! The node list is stored bare under the template key. The id high-water
//! mark lives next to it under `<key>_high_water`, so ids of deleted nodes
//! are not reissued by a later session.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::snapshot::{parse_snapshot, to_node_list_json, TemplateDocument};
use crate::domain::{
    Attributes, Direction, DomainResult, Node, NodeId, NodeStore, Reparent, TreeQuery,
    ValidationReport, Validator,
};
use crate::infrastructure::traits::KeyValueStore;

pub struct TemplateService {
    store: NodeStore,
    kv: Arc<dyn KeyValueStore>,
    key: String,
    high_water_key: String,
    validator: Validator,
    persistence_warning: Option<ApplicationError>,
}

impl TemplateService {
    /// Load the persisted template, or start from the default root-only
    /// template when nothing was stored yet.
    ///
    /// A stored blob that cannot be parsed is reported as `MalformedSnapshot`.
    #[instrument(level = "debug", skip(kv, validator))]
    pub fn hydrate(
        kv: Arc<dyn KeyValueStore>,
        key: &str,
        validator: Validator,
    ) -> ApplicationResult<Self> {
        let store = match kv.get(key).with_key_context("read", key)? {
            Some(text) => NodeStore::from_nodes(parse_snapshot(&text)?)?,
            None => {
                debug!("hydrate: no template under '{}', using default", key);
                NodeStore::new()
            }
        };
        let high_water_key = format!("{key}_high_water");
        let floor = read_high_water(kv.as_ref(), &high_water_key)?;
        let store = store.with_high_water(floor);
        debug!(
            "hydrate: {} nodes, high_water={}",
            store.len(),
            store.high_water()
        );
        Ok(Self {
            store,
            kv,
            key: key.to_string(),
            high_water_key,
            validator,
            persistence_warning: None,
        })
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    pub fn query(&self) -> TreeQuery<'_> {
        self.store.query()
    }

    pub fn insert(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: &str,
        attributes: Attributes,
    ) -> ApplicationResult<Node> {
        let node = self.store.insert(parent, name, kind, attributes)?;
        self.flush();
        Ok(node)
    }

    /// Delete a node with its subtree; returns every removed id.
    pub fn delete(&mut self, id: NodeId) -> ApplicationResult<BTreeSet<NodeId>> {
        let removed = self.store.delete(id)?;
        self.flush();
        Ok(removed)
    }

    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> ApplicationResult<Node> {
        Ok(Reparent::reparent(self, id, new_parent)?)
    }

    /// Swap with the neighbouring sibling. Flushes only when something moved.
    pub fn reorder(&mut self, id: NodeId, direction: Direction) -> ApplicationResult<bool> {
        let moved = self.store.reorder(id, direction)?;
        if moved {
            self.flush();
        }
        Ok(moved)
    }

    pub fn validate(&self) -> ValidationReport {
        self.validator.validate(&self.store)
    }

    /// Versioned export blob of the current template.
    pub fn export_snapshot(&self, exported_at: DateTime<Utc>) -> ApplicationResult<String> {
        Ok(TemplateDocument::from_store(&self.store, Some(exported_at)).to_json()?)
    }

    /// Replace the template with an imported blob.
    ///
    /// The current template is untouched unless the blob parses into a
    /// usable node collection. Returns every id of the replaced template:
    /// values keyed by them no longer belong to the nodes carrying those ids.
    /// The high-water mark carries over, so later inserts stay above both.
    #[instrument(level = "debug", skip(self, text))]
    pub fn import_snapshot(&mut self, text: &str) -> ApplicationResult<BTreeSet<NodeId>> {
        let store =
            NodeStore::from_nodes(parse_snapshot(text)?)?.with_high_water(self.store.high_water());
        let replaced: BTreeSet<NodeId> = self.store.nodes().iter().map(|n| n.id).collect();
        self.store = store;
        self.flush();
        debug!(
            "import_snapshot: {} nodes, replaced {}",
            self.store.len(),
            replaced.len()
        );
        Ok(replaced)
    }

    /// The last failed write, if any; clears it.
    pub fn take_persistence_warning(&mut self) -> Option<ApplicationError> {
        self.persistence_warning.take()
    }

    fn flush(&mut self) {
        let written = to_node_list_json(&self.store)
            .map_err(ApplicationError::from)
            .and_then(|json| self.write(&self.key, &json))
            .and_then(|()| {
                self.write(&self.high_water_key, &self.store.high_water().to_string())
            });
        if let Err(e) = written {
            warn!("flush: {}", e);
            self.persistence_warning = Some(e);
        }
    }

    fn write(&self, key: &str, text: &str) -> ApplicationResult<()> {
        self.kv
            .set(key, text)
            .map_err(|source| ApplicationError::PersistenceWriteFailed {
                key: key.to_string(),
                source,
            })
    }
}

/// Stored high-water mark, 0 when absent. An unreadable value is ignored with
/// a warning; the node ids themselves still bound the next id from below.
fn read_high_water(kv: &dyn KeyValueStore, key: &str) -> ApplicationResult<NodeId> {
    let Some(text) = kv.get(key).with_key_context("read", key)? else {
        return Ok(0);
    };
    match text.trim().parse::<NodeId>() {
        Ok(mark) => Ok(mark),
        Err(e) => {
            warn!("read_high_water: ignoring '{}' under '{}': {}", text.trim(), key, e);
            Ok(0)
        }
    }
}

impl Reparent for TemplateService {
    fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> DomainResult<Node> {
        let node = self.store.reparent(id, new_parent)?;
        self.flush();
        Ok(node)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.get(id)
    }
}
