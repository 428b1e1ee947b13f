//! Service container for dependency injection
//!
//! Wires settings and ports into the application services.

use std::sync::Arc;

use crate::application::services::{SyllabusService, TemplateService};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::Validator;
use crate::infrastructure::traits::{
    DocumentGenerator, FileKeyValueStore, HtmlDocumentGenerator, KeyValueStore,
};

/// Container holding settings and the I/O ports services are built from.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Persistence port
    pub kv: Arc<dyn KeyValueStore>,

    /// Document generation port
    pub generator: Arc<dyn DocumentGenerator>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let kv = Arc::new(FileKeyValueStore::new(settings.data_dir.clone()));
        let generator = Arc::new(HtmlDocumentGenerator::new(settings.document.clone()));
        Self::with_deps(settings, kv, generator)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        kv: Arc<dyn KeyValueStore>,
        generator: Arc<dyn DocumentGenerator>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            kv,
            generator,
        }
    }

    pub fn validator(&self) -> Validator {
        Validator::new(
            self.settings.validation.recommended_sections.clone(),
            self.settings.validation.max_depth,
        )
    }

    /// Hydrate the template from the configured storage key.
    pub fn template_service(&self) -> ApplicationResult<TemplateService> {
        TemplateService::hydrate(
            self.kv.clone(),
            &self.settings.storage.template_key,
            self.validator(),
        )
    }

    /// Hydrate the value map from the configured storage keys.
    pub fn syllabus_service(&self) -> ApplicationResult<SyllabusService> {
        SyllabusService::hydrate(
            self.kv.clone(),
            &self.settings.storage.values_key,
            &self.settings.storage.stats_key,
            self.generator.clone(),
        )
    }
}
