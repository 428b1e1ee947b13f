//! Syllabus service: entered values, completion and document export.
//!
//! Values have their own lifecycle next to the template. They are keyed by
//! node id and only meet the template for statistics and export.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::services::TemplateService;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{export_filename, CompletionStats, FieldValue, NodeId, NodeStore, ValueMap};
use crate::infrastructure::traits::{DocumentGenerator, GenerationResult, KeyValueStore};

/// Persisted counters of successful document generations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationStats {
    pub count: u64,
    pub last_generated: Option<DateTime<Utc>>,
}

pub struct SyllabusService {
    values: ValueMap,
    kv: Arc<dyn KeyValueStore>,
    values_key: String,
    stats_key: String,
    generator: Arc<dyn DocumentGenerator>,
    persistence_warning: Option<ApplicationError>,
}

impl SyllabusService {
    #[instrument(level = "debug", skip(kv, generator))]
    pub fn hydrate(
        kv: Arc<dyn KeyValueStore>,
        values_key: &str,
        stats_key: &str,
        generator: Arc<dyn DocumentGenerator>,
    ) -> ApplicationResult<Self> {
        let values = match kv.get(values_key).with_key_context("read", values_key)? {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                ApplicationError::operation(format!("parse values '{values_key}'"), e)
            })?,
            None => ValueMap::new(),
        };
        debug!("hydrate: values for {} nodes", values.len());
        Ok(Self {
            values,
            kv,
            values_key: values_key.to_string(),
            stats_key: stats_key.to_string(),
            generator,
            persistence_warning: None,
        })
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn get_value(&self, node: NodeId, field: &str) -> Option<&FieldValue> {
        self.values.get_value(node, field)
    }

    /// Upsert a value; accepted even for unknown nodes or fields.
    pub fn set_value(&mut self, node: NodeId, field: &str, value: &str) {
        self.values.set_value(node, field, value);
        debug!("set_value: node={} field={}", node, field);
        self.flush_values();
    }

    pub fn set_group_value(&mut self, node: NodeId, field: &str, key: &str, value: &str) {
        self.values.set_group_value(node, field, key, value);
        debug!("set_group_value: node={} field={} key={}", node, field, key);
        self.flush_values();
    }

    pub fn completion(&self, template: &NodeStore) -> CompletionStats {
        let stale = self.values.stale_ids(template);
        if !stale.is_empty() {
            warn!("completion: ignoring values of unknown nodes {:?}", stale);
        }
        self.values.completion_stats(template)
    }

    /// Drop values of deleted nodes.
    pub fn forget_nodes(&mut self, removed: &BTreeSet<NodeId>) -> usize {
        let dropped = self.values.remove_nodes(removed);
        if dropped > 0 {
            self.flush_values();
        }
        dropped
    }

    pub fn generation_stats(&self) -> ApplicationResult<GenerationStats> {
        match self.kv.get(&self.stats_key).with_key_context("read", &self.stats_key)? {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                ApplicationError::operation(format!("parse stats '{}'", self.stats_key), e)
            }),
            None => Ok(GenerationStats::default()),
        }
    }

    /// Hand the template and values to the document generator.
    ///
    /// Refused while the template has structural errors or no top-level
    /// section has a filled value; the generator is not called then.
    #[instrument(level = "debug", skip(self, template))]
    pub fn export(
        &mut self,
        template: &TemplateService,
        filename: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApplicationResult<GenerationResult> {
        let report = template.validate();
        if !report.is_valid() {
            return Err(ApplicationError::ExportBlocked {
                errors: report.errors,
            });
        }
        if !self.values.is_exportable(template.store()) {
            return Err(ApplicationError::NotExportable);
        }

        let filename = match filename {
            Some(name) => name.to_string(),
            None => export_filename(template.nodes(), &self.values, now.date_naive()),
        };
        let result = self
            .generator
            .generate(template.nodes(), &self.values, &filename);
        if !result.success {
            return Err(ApplicationError::GenerationFailed {
                message: result
                    .error
                    .or(result.message)
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        self.record_generation(now);
        info!("export: generated {:?}", result.filename);
        Ok(result)
    }

    pub fn take_persistence_warning(&mut self) -> Option<ApplicationError> {
        self.persistence_warning.take()
    }

    fn record_generation(&mut self, now: DateTime<Utc>) {
        let mut stats = match self.generation_stats() {
            Ok(stats) => stats,
            Err(e) => {
                warn!("record_generation: resetting unreadable stats: {}", e);
                GenerationStats::default()
            }
        };
        stats.count += 1;
        stats.last_generated = Some(now);
        match serde_json::to_string(&stats) {
            Ok(json) => self.write(self.stats_key.clone(), &json),
            Err(e) => warn!("record_generation: {}", e),
        }
    }

    fn flush_values(&mut self) {
        match serde_json::to_string(&self.values) {
            Ok(json) => self.write(self.values_key.clone(), &json),
            Err(e) => warn!("flush_values: {}", e),
        }
    }

    fn write(&mut self, key: String, json: &str) {
        if let Err(source) = self.kv.set(&key, json) {
            let e = ApplicationError::PersistenceWriteFailed { key, source };
            warn!("write: {}", e);
            self.persistence_warning = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Attributes, Node, Validator};
    use crate::infrastructure::traits::MemoryKeyValueStore;

    struct Recorder;

    impl DocumentGenerator for Recorder {
        fn generate(&self, nodes: &[Node], _values: &ValueMap, hint: &str) -> GenerationResult {
            GenerationResult::ok(hint, format!("{} nodes", nodes.len()))
        }
    }

    fn setup() -> (Arc<MemoryKeyValueStore>, TemplateService, SyllabusService) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut template =
            TemplateService::hydrate(kv.clone(), "mptt_template", Validator::default()).unwrap();
        let mut attrs = Attributes::new();
        attrs.insert("codigoCurso".into(), String::new());
        template.insert(1, "Info", "INFORMACION_GENERAL", attrs).unwrap();
        let syllabus = SyllabusService::hydrate(
            kv.clone(),
            "syllabus_editor_data",
            "pdf_generation_stats",
            Arc::new(Recorder),
        )
        .unwrap();
        (kv, template, syllabus)
    }

    #[test]
    fn given_no_values_when_export_then_not_exportable() {
        let (_, template, mut syllabus) = setup();
        let err = syllabus.export(&template, None, Utc::now()).unwrap_err();
        assert!(matches!(err, ApplicationError::NotExportable));
    }

    #[test]
    fn given_filled_section_when_export_then_counts_generation() {
        let (_, template, mut syllabus) = setup();
        syllabus.set_value(2, "codigoCurso", "MED101");

        let result = syllabus.export(&template, None, Utc::now()).unwrap();

        assert!(result.success);
        assert!(result
            .filename
            .is_some_and(|f| f.starts_with("Silabo_MED101_")));
        assert_eq!(syllabus.generation_stats().unwrap().count, 1);
    }

    #[test]
    fn given_stored_values_when_hydrate_then_restored() {
        let (kv, _, mut syllabus) = setup();
        syllabus.set_group_value(2, "Horario", "Lunes", "8:00");

        let again =
            SyllabusService::hydrate(kv, "syllabus_editor_data", "pdf_generation_stats", Arc::new(Recorder))
                .unwrap();

        assert_eq!(again.values(), syllabus.values());
    }
}
