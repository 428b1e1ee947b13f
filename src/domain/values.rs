//! Value Map: user-entered field values keyed by node id and field name.
//!
//! Lives apart from the template; the two only meet when statistics are
//! computed or a document is resolved. Entries for ids the template no longer
//! knows are kept but ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::node::NodeId;
use crate::domain::store::NodeStore;

/// A single entered value: plain text, or a group of named sub-values
/// (tabular / grouped fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Grouped(IndexMap<String, String>),
}

impl FieldValue {
    /// Whether the value carries any non-blank text.
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Scalar(s) => !s.trim().is_empty(),
            FieldValue::Grouped(group) => group.values().any(|v| !v.trim().is_empty()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(s) => write!(f, "{s}"),
            FieldValue::Grouped(group) => write!(
                f,
                "{}",
                group
                    .iter()
                    .filter(|(_, v)| !v.trim().is_empty())
                    .map(|(k, v)| format!("{k}: {v}"))
                    .join("; ")
            ),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Scalar(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Scalar(s.to_string())
    }
}

/// Field name → value for one node.
pub type NodeValues = IndexMap<String, FieldValue>;

/// Progress of filling the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionStats {
    pub total: usize,
    pub filled: usize,
    pub percentage: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMap {
    entries: BTreeMap<NodeId, NodeValues>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes with at least one stored field.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Upsert a value. Field keys are not checked against the template.
    pub fn set_value(&mut self, node: NodeId, field: &str, value: impl Into<FieldValue>) {
        self.entries
            .entry(node)
            .or_default()
            .insert(field.to_string(), value.into());
    }

    /// Upsert one cell of a grouped value.
    ///
    /// A scalar already stored under `field` becomes the group entry `value`
    /// unless it is blank.
    pub fn set_group_value(&mut self, node: NodeId, field: &str, key: &str, value: &str) {
        let values = self.entries.entry(node).or_default();
        let slot = values
            .entry(field.to_string())
            .or_insert_with(|| FieldValue::Grouped(IndexMap::new()));

        if let FieldValue::Scalar(old) = slot {
            let mut group = IndexMap::new();
            if !old.trim().is_empty() {
                group.insert("value".to_string(), std::mem::take(old));
            }
            *slot = FieldValue::Grouped(group);
        }
        if let FieldValue::Grouped(group) = slot {
            group.insert(key.to_string(), value.to_string());
        }
    }

    pub fn get_value(&self, node: NodeId, field: &str) -> Option<&FieldValue> {
        self.entries.get(&node).and_then(|values| values.get(field))
    }

    pub fn node_values(&self, node: NodeId) -> Option<&NodeValues> {
        self.entries.get(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeValues)> {
        self.entries.iter()
    }

    /// Drop the entries of removed nodes.
    pub fn remove_nodes(&mut self, removed: &BTreeSet<NodeId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| !removed.contains(id));
        let dropped = before - self.entries.len();
        debug!("remove_nodes: dropped {} entries", dropped);
        dropped
    }

    /// Ids with stored values that the template does not know.
    pub fn stale_ids(&self, store: &NodeStore) -> Vec<NodeId> {
        self.entries
            .keys()
            .copied()
            .filter(|id| store.get(*id).is_none())
            .collect()
    }

    /// Count template fields and how many of them hold non-blank values.
    ///
    /// The denominator is every attribute key of every node; a field counts
    /// as filled only when the value stored under that exact key is non-blank.
    pub fn completion_stats(&self, store: &NodeStore) -> CompletionStats {
        let mut total = 0;
        let mut filled = 0;
        for node in store.nodes() {
            for field in node.attributes.keys() {
                total += 1;
                if self
                    .get_value(node.id, field)
                    .is_some_and(FieldValue::is_filled)
                {
                    filled += 1;
                }
            }
        }
        let percentage = if total == 0 {
            0
        } else {
            ((filled as f64 / total as f64) * 100.0).round() as u8
        };
        CompletionStats {
            total,
            filled,
            percentage,
        }
    }

    /// At least one root-child section has a non-blank value.
    pub fn is_exportable(&self, store: &NodeStore) -> bool {
        store.query().root_children().iter().any(|section| {
            self.node_values(section.id)
                .is_some_and(|values| values.values().any(FieldValue::is_filled))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::Attributes;

    fn attrs(keys: &[&str]) -> Attributes {
        keys.iter().map(|k| (k.to_string(), String::new())).collect()
    }

    /// Root(1) -> S1(2){A,B}, S2(3){C}
    fn template() -> NodeStore {
        let mut store = NodeStore::new();
        store.insert(1, "S1", "SUMILLA", attrs(&["A", "B"])).unwrap();
        store.insert(1, "S2", "EVALUACION", attrs(&["C"])).unwrap();
        store
    }

    #[test]
    fn given_one_of_three_fields_filled_when_stats_then_33_percent() {
        let store = template();
        let mut values = ValueMap::new();
        values.set_value(2, "A", "x");

        let stats = values.completion_stats(&store);

        assert_eq!(
            stats,
            CompletionStats {
                total: 3,
                filled: 1,
                percentage: 33
            }
        );
    }

    #[test]
    fn given_blank_and_unknown_fields_when_stats_then_not_counted() {
        let store = template();
        let mut values = ValueMap::new();
        values.set_value(2, "A", "   ");
        values.set_value(2, "Unknown", "text");
        values.set_value(99, "C", "stale");

        let stats = values.completion_stats(&store);

        assert_eq!(stats.filled, 0);
        assert_eq!(values.stale_ids(&store), vec![99]);
    }

    #[test]
    fn given_two_of_three_when_stats_then_rounds_to_nearest() {
        let store = template();
        let mut values = ValueMap::new();
        values.set_value(2, "A", "x");
        values.set_value(3, "C", "y");
        assert_eq!(values.completion_stats(&store).percentage, 67);
    }

    #[test]
    fn given_no_fields_when_stats_then_zero_percent() {
        let store = NodeStore::new();
        let stats = ValueMap::new().completion_stats(&store);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage, 0);
    }

    #[test]
    fn given_scalar_when_set_group_value_then_converts_to_group() {
        let mut values = ValueMap::new();
        values.set_value(2, "Horario", "Lunes");
        values.set_group_value(2, "Horario", "Martes", "10:00");

        let Some(FieldValue::Grouped(group)) = values.get_value(2, "Horario") else {
            panic!("expected grouped value");
        };
        assert_eq!(group.get("value").map(String::as_str), Some("Lunes"));
        assert_eq!(group.get("Martes").map(String::as_str), Some("10:00"));
    }

    #[test]
    fn given_grouped_value_when_checking_filled_then_any_cell_counts() {
        let mut group = IndexMap::new();
        group.insert("a".to_string(), " ".to_string());
        assert!(!FieldValue::Grouped(group.clone()).is_filled());
        group.insert("b".to_string(), "x".to_string());
        assert!(FieldValue::Grouped(group).is_filled());
    }

    #[test]
    fn given_values_only_on_nested_section_when_is_exportable_then_false() {
        let mut store = template();
        store.insert(2, "Sub", "OTRO", attrs(&["D"])).unwrap();
        let mut values = ValueMap::new();
        values.set_value(4, "D", "deep");
        assert!(!values.is_exportable(&store));

        values.set_value(3, "C", "top");
        assert!(values.is_exportable(&store));
    }

    #[test]
    fn given_persisted_json_when_deserializing_then_accepts_both_shapes() {
        let json = r#"{"2": {"A": "x", "Tabla": {"fila1": "uno"}}}"#;
        let values: ValueMap = serde_json::from_str(json).unwrap();
        assert_eq!(values.get_value(2, "A"), Some(&FieldValue::from("x")));
        assert!(matches!(
            values.get_value(2, "Tabla"),
            Some(FieldValue::Grouped(_))
        ));
    }

    #[test]
    fn given_removed_ids_when_remove_nodes_then_drops_their_entries() {
        let mut values = ValueMap::new();
        values.set_value(2, "A", "x");
        values.set_value(3, "C", "y");
        assert_eq!(values.remove_nodes(&BTreeSet::from([2, 7])), 1);
        assert!(values.get_value(2, "A").is_none());
        assert!(values.get_value(3, "C").is_some());
    }
}
