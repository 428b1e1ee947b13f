//! Structural and content checks over the whole template.
//!
//! Findings are plain data. Validation never mutates and never fails; the
//! caller decides whether errors block what it is about to do.

use std::collections::HashSet;

use thiserror::Error;

use crate::domain::node::NodeId;
use crate::domain::query::Ancestry;
use crate::domain::store::NodeStore;

/// Section tags a complete syllabus is expected to have.
pub const DEFAULT_RECOMMENDED_SECTIONS: &[&str] = &[
    "INFORMACION_GENERAL",
    "SUMILLA",
    "COMPETENCIAS",
    "EVALUACION",
    "BIBLIOGRAFIA",
];

pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Broken structure; export must not proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("template has no root node")]
    MissingRoot,

    #[error("template has several root nodes: {0:?}")]
    MultipleRoots(Vec<NodeId>),

    #[error("node {id} references missing parent {parent}")]
    DanglingParent { id: NodeId, parent: NodeId },

    #[error("node {id} is part of a parent cycle")]
    Cycle { id: NodeId },
}

/// Advisory findings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    #[error("recommended section missing: {0}")]
    MissingRecommendedSection(String),

    #[error("node {id} is nested {depth} levels deep (max {max})")]
    TooDeep { id: NodeId, depth: usize, max: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    recommended_sections: Vec<String>,
    max_depth: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(
            DEFAULT_RECOMMENDED_SECTIONS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_MAX_DEPTH,
        )
    }
}

impl Validator {
    pub fn new(recommended_sections: Vec<String>, max_depth: usize) -> Self {
        Self {
            recommended_sections,
            max_depth,
        }
    }

    pub fn validate(&self, store: &NodeStore) -> ValidationReport {
        let mut report = ValidationReport::default();
        let query = store.query();

        let roots: Vec<NodeId> = store
            .nodes()
            .iter()
            .filter(|n| n.is_root())
            .map(|n| n.id)
            .collect();
        match roots.len() {
            0 => report.errors.push(ValidationError::MissingRoot),
            1 => {}
            _ => report.errors.push(ValidationError::MultipleRoots(roots)),
        }

        for node in store.nodes() {
            if let Some(parent) = node.parent {
                if store.get(parent).is_none() {
                    report
                        .errors
                        .push(ValidationError::DanglingParent { id: node.id, parent });
                }
            }
            match query.ancestry(node.id) {
                Some(Ancestry::Cyclic) => report.errors.push(ValidationError::Cycle { id: node.id }),
                Some(Ancestry::Depth(depth)) if depth > self.max_depth => {
                    report.warnings.push(ValidationWarning::TooDeep {
                        id: node.id,
                        depth,
                        max: self.max_depth,
                    })
                }
                _ => {}
            }
        }

        let present: HashSet<&str> = query
            .root_children()
            .iter()
            .map(|n| n.kind.as_str())
            .collect();
        for tag in &self.recommended_sections {
            if !present.contains(tag.as_str()) {
                report
                    .warnings
                    .push(ValidationWarning::MissingRecommendedSection(tag.clone()));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::{Attributes, Node};

    fn node(id: NodeId, parent: Option<NodeId>, kind: &str) -> Node {
        Node {
            id,
            name: kind.to_string(),
            kind: kind.to_string(),
            parent,
            attributes: Attributes::new(),
        }
    }

    fn complete_template() -> NodeStore {
        let mut store = NodeStore::new();
        for tag in DEFAULT_RECOMMENDED_SECTIONS {
            store.insert(1, tag, tag, Attributes::new()).unwrap();
        }
        store
    }

    #[test]
    fn given_complete_template_when_validate_then_clean() {
        let report = Validator::default().validate(&complete_template());
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn given_root_only_when_validate_then_warns_for_every_recommended_section() {
        let report = Validator::default().validate(&NodeStore::new());
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), DEFAULT_RECOMMENDED_SECTIONS.len());
    }

    #[test]
    fn given_nested_recommended_tag_when_validate_then_still_missing() {
        let mut store = NodeStore::new();
        store.insert(1, "Info", "INFORMACION_GENERAL", Attributes::new()).unwrap();
        store.insert(2, "Sumilla", "SUMILLA", Attributes::new()).unwrap();
        let report = Validator::default().validate(&store);
        assert!(report
            .warnings
            .contains(&ValidationWarning::MissingRecommendedSection("SUMILLA".into())));
        assert!(!report
            .warnings
            .contains(&ValidationWarning::MissingRecommendedSection("INFORMACION_GENERAL".into())));
    }

    #[test]
    fn given_chain_deeper_than_max_when_validate_then_warns_per_deep_node() {
        let mut store = complete_template();
        let mut parent = 2;
        for _ in 0..5 {
            parent = store.insert(parent, "Sub", "OTRO", Attributes::new()).unwrap().id;
        }
        // depths 2..=6 below root-child 2; 5 and 6 exceed 4
        let report = Validator::new(Vec::new(), 4).validate(&store);
        let deep: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| matches!(w, ValidationWarning::TooDeep { .. }))
            .collect();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn given_dangling_parent_and_no_root_when_validate_then_reports_errors() {
        let store = NodeStore::from_nodes(vec![node(2, Some(1), "SUMILLA")]).unwrap();
        let report = Validator::default().validate(&store);
        assert!(report.errors.contains(&ValidationError::MissingRoot));
        assert!(report
            .errors
            .contains(&ValidationError::DanglingParent { id: 2, parent: 1 }));
    }

    #[test]
    fn given_cycle_when_validate_then_reports_without_panicking() {
        let store = NodeStore::from_nodes(vec![
            node(1, None, ""),
            node(2, Some(3), "A"),
            node(3, Some(2), "B"),
        ])
        .unwrap();
        let report = Validator::new(Vec::new(), 4).validate(&store);
        assert_eq!(
            report.errors,
            vec![ValidationError::Cycle { id: 2 }, ValidationError::Cycle { id: 3 }]
        );
    }

    #[test]
    fn given_two_roots_when_validate_then_multiple_roots() {
        let store = NodeStore::from_nodes(vec![node(1, None, ""), node(2, None, "")]).unwrap();
        let report = Validator::new(Vec::new(), 4).validate(&store);
        assert_eq!(report.errors, vec![ValidationError::MultipleRoots(vec![1, 2])]);
    }
}
