//! I/O boundary traits for testability
//!
//! Persistence and document generation are ports: services only see these
//! traits, so tests can swap in in-memory or failing implementations.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::DocumentConfig;
use crate::domain::document::{ResolvedSection, SyllabusDocument};
use crate::domain::{HeaderDefaults, Node, ValueMap};

/// Opaque string key-value store backing the persisted snapshots.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if never written.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Outcome reported by a document generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    pub filename: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn ok(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            filename: Some(filename.into()),
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// External collaborator turning the template and its values into a document.
pub trait DocumentGenerator: Send + Sync {
    fn generate(&self, nodes: &[Node], values: &ValueMap, filename_hint: &str) -> GenerationResult;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Keys are restricted to a safe file-name alphabet.
    pub fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {key:?}"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write through a temp file in the same directory and rename it into
    /// place, so readers never see a half-written snapshot.
    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!("set: key={} path={}", key, path.display());
        Ok(())
    }
}

/// Process-local store; writes can be made to fail for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory store lock poisoned")
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "writes disabled",
            ));
        }
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Writes a self-contained HTML rendering of the resolved syllabus.
///
/// The `.pdf` suffix of the hint is replaced by `.html`; rasterising to PDF
/// is left to external tooling.
#[derive(Debug, Clone)]
pub struct HtmlDocumentGenerator {
    config: DocumentConfig,
}

impl HtmlDocumentGenerator {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn output_path(&self, filename_hint: &str) -> PathBuf {
        let stem = filename_hint
            .strip_suffix(".pdf")
            .unwrap_or(filename_hint);
        self.config.output_dir.join(format!("{stem}.html"))
    }

    pub fn render(&self, document: &SyllabusDocument) -> Result<String, fmt::Error> {
        let mut html = String::new();
        writeln!(html, "<!DOCTYPE html>")?;
        writeln!(html, "<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">")?;
        writeln!(html, "<title>{}</title>", escape(&document.title))?;
        writeln!(html, "</head>\n<body>\n<header>")?;
        if !self.config.institution.is_empty() {
            writeln!(html, "<h1>{}</h1>", escape(&self.config.institution))?;
        }
        if !self.config.address.is_empty() {
            writeln!(html, "<p class=\"address\">{}</p>", escape(&self.config.address))?;
        }
        writeln!(html, "<h2>{}</h2>", escape(&document.faculty))?;
        writeln!(html, "<h3>{}</h3>", escape(&document.program))?;
        writeln!(html, "<h2>{}</h2>", escape(&document.title))?;
        writeln!(html, "</header>")?;
        for (i, section) in document.sections.iter().enumerate() {
            render_section(&mut html, section, &format!("{}", i + 1))?;
        }
        writeln!(html, "</body>\n</html>")?;
        Ok(html)
    }
}

fn render_section(html: &mut String, section: &ResolvedSection, number: &str) -> fmt::Result {
    let level = (section.depth + 1).min(6);
    writeln!(html, "<section id=\"node-{}\">", section.id)?;
    writeln!(
        html,
        "<h{level}>{number}. {}</h{level}>",
        escape(&section.title)
    )?;
    if !section.fields.is_empty() {
        writeln!(html, "<dl>")?;
        for field in &section.fields {
            writeln!(
                html,
                "<dt>{}</dt><dd>{}</dd>",
                escape(&field.label),
                escape(&field.value)
            )?;
        }
        writeln!(html, "</dl>")?;
    }
    for (i, child) in section.children.iter().enumerate() {
        render_section(html, child, &format!("{number}.{}", i + 1))?;
    }
    writeln!(html, "</section>")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

impl DocumentGenerator for HtmlDocumentGenerator {
    fn generate(&self, nodes: &[Node], values: &ValueMap, filename_hint: &str) -> GenerationResult {
        let defaults = HeaderDefaults {
            faculty: self.config.default_faculty.clone(),
            program: self.config.default_program.clone(),
            course: self.config.default_course.clone(),
        };
        let document = SyllabusDocument::resolve(nodes, values, &defaults);
        let path = self.output_path(filename_hint);
        let html = match self.render(&document) {
            Ok(html) => html,
            Err(e) => return GenerationResult::failed(format!("render {}: {e}", path.display())),
        };

        let written = std::fs::create_dir_all(&self.config.output_dir)
            .and_then(|_| std::fs::write(&path, html));
        match written {
            Ok(()) => {
                debug!("generate: wrote {}", path.display());
                GenerationResult::ok(
                    path.display().to_string(),
                    format!(
                        "{} sections, {} fields",
                        document.sections.len(),
                        document.field_count()
                    ),
                )
            }
            Err(e) => GenerationResult::failed(format!("write {}: {e}", path.display())),
        }
    }
}
