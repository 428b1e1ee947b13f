//! Resolved syllabus document: the template merged with entered values.
//!
//! This is what document generators consume. Sections follow sibling order,
//! fields follow attribute order, blank fields are left out.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::domain::node::{Node, NodeId};
use crate::domain::query::TreeQuery;
use crate::domain::values::{FieldValue, ValueMap};

/// Nesting bound for resolution; protects against corrupted parent cycles.
pub const MAX_RESOLVE_DEPTH: usize = 16;

/// Fallbacks for the document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDefaults {
    pub faculty: String,
    pub program: String,
    pub course: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSection {
    pub id: NodeId,
    pub title: String,
    pub depth: usize,
    pub fields: Vec<ResolvedField>,
    pub children: Vec<ResolvedSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyllabusDocument {
    pub title: String,
    pub faculty: String,
    pub program: String,
    pub course: String,
    pub sections: Vec<ResolvedSection>,
}

impl SyllabusDocument {
    pub fn resolve(nodes: &[Node], values: &ValueMap, defaults: &HeaderDefaults) -> Self {
        let query = TreeQuery::new(nodes);
        let sections = query
            .root_children()
            .into_iter()
            .map(|section| resolve_section(&query, section, values, 1))
            .collect();

        let faculty = lookup_last(nodes, values, &["Facultad/EPG", "Facultad"])
            .unwrap_or_else(|| defaults.faculty.clone());
        let program = lookup_last(nodes, values, &["Programa de Estudio", "Programa"])
            .unwrap_or_else(|| defaults.program.clone());
        let course = lookup_last(nodes, values, &["Nombre de asignatura", "Asignatura", "Curso"])
            .unwrap_or_else(|| defaults.course.clone());

        Self {
            title: format!("Sílabo: {course}"),
            faculty,
            program,
            course,
            sections,
        }
    }

    pub fn field_count(&self) -> usize {
        fn count(section: &ResolvedSection) -> usize {
            section.fields.len() + section.children.iter().map(count).sum::<usize>()
        }
        self.sections.iter().map(count).sum()
    }
}

fn resolve_section(query: &TreeQuery<'_>, node: &Node, values: &ValueMap, depth: usize) -> ResolvedSection {
    let fields = node
        .attributes
        .iter()
        .filter_map(|(key, default)| {
            let value = match values.get_value(node.id, key) {
                Some(v) if v.is_filled() => v.to_string(),
                _ => default.clone(),
            };
            if value.trim().is_empty() {
                return None;
            }
            Some(ResolvedField {
                key: key.clone(),
                label: format_field_label(key),
                value,
            })
        })
        .collect();

    let children = if depth < MAX_RESOLVE_DEPTH {
        query
            .children_of(node.id)
            .into_iter()
            .map(|child| resolve_section(query, child, values, depth + 1))
            .collect()
    } else {
        Vec::new()
    };

    ResolvedSection {
        id: node.id,
        title: node.name.clone(),
        depth,
        fields,
        children,
    }
}

/// Scan nodes in order; for each node the first filled key in `keys` wins,
/// and later nodes override earlier ones.
fn lookup_last(nodes: &[Node], values: &ValueMap, keys: &[&str]) -> Option<String> {
    nodes
        .iter()
        .filter_map(|node| {
            keys.iter()
                .filter_map(|key| values.get_value(node.id, key))
                .find(|v| v.is_filled())
                .map(FieldValue::to_string)
        })
        .last()
}

/// Humanise a field key: `codigoCurso` → `Codigo Curso`, `A/B` → `A / B`.
pub fn format_field_label(key: &str) -> String {
    static CAMEL: OnceLock<Regex> = OnceLock::new();
    let camel = CAMEL.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"));

    let spaced = camel.replace_all(key, "$1 $2").replace('/', " / ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Silabo_<course code>_<semester>_<date>.pdf`, looking the code and
/// semester up across all nodes.
pub fn export_filename(nodes: &[Node], values: &ValueMap, today: NaiveDate) -> String {
    let code = lookup_last(nodes, values, &["codigoCurso"]).unwrap_or_else(|| "CURSO".to_string());
    let semester = lookup_last(nodes, values, &["semestre"]).unwrap_or_else(|| today.year().to_string());
    format!(
        "Silabo_{}_{}_{}.pdf",
        sanitize(&code),
        sanitize(&semester),
        today.format("%Y-%m-%d")
    )
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
