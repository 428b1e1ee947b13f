//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/syllabus/syllabus.toml`
//! 3. Local config: `<dir>/.syllabus.toml`
//! 4. Environment variables: `SYLLABUS_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::validate::{DEFAULT_MAX_DEPTH, DEFAULT_RECOMMENDED_SECTIONS};

/// Keys under which snapshots live in the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub template_key: String,
    pub values_key: String,
    pub stats_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            template_key: "mptt_template".into(),
            values_key: "syllabus_editor_data".into(),
            stats_key: "pdf_generation_stats".into(),
        }
    }
}

/// Validator thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Nodes deeper than this are reported
    pub max_depth: usize,
    /// Section tags expected among the top-level sections
    pub recommended_sections: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            recommended_sections: DEFAULT_RECOMMENDED_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Document generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentConfig {
    pub output_dir: PathBuf,
    pub institution: String,
    pub address: String,
    pub default_faculty: String,
    pub default_program: String,
    pub default_course: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            institution: String::new(),
            address: String::new(),
            default_faculty: "Facultad".into(),
            default_program: "Programa de Estudio".into(),
            default_course: "Asignatura".into(),
        }
    }
}

/// Raw sections for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStorageConfig {
    pub template_key: Option<String>,
    pub values_key: Option<String>,
    pub stats_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawValidationConfig {
    pub max_depth: Option<usize>,
    pub recommended_sections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDocumentConfig {
    pub output_dir: Option<PathBuf>,
    pub institution: Option<String>,
    pub address: Option<String>,
    pub default_faculty: Option<String>,
    pub default_program: Option<String>,
    pub default_course: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub storage: RawStorageConfig,
    pub validation: RawValidationConfig,
    pub document: RawDocumentConfig,
}

/// Union of `base` and `overlay` in first-seen order; `!ITEM` in the overlay
/// removes an inherited item.
///
/// # Examples
/// ```ignore
/// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
/// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
/// ```
pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
    let mut result: IndexSet<String> = base.iter().cloned().collect();
    for item in overlay {
        if let Some(negated) = item.strip_prefix('!') {
            result.shift_remove(negated);
        } else {
            result.insert(item.clone());
        }
    }
    result.into_iter().collect()
}

fn pick<T: Clone>(overlay: &Option<T>, base: &T) -> T {
    overlay.clone().unwrap_or_else(|| base.clone())
}

/// Unified configuration for syllabus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory backing the key-value store (default: ~/.syllabus)
    pub data_dir: PathBuf,
    pub storage: StorageConfig,
    pub validation: ValidationConfig,
    pub document: DocumentConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageConfig::default(),
            validation: ValidationConfig::default(),
            document: DocumentConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".syllabus"))
        .unwrap_or_else(|| PathBuf::from("~/.syllabus"))
}

/// Get the XDG config directory for syllabus.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "syllabus").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("syllabus.toml"))
}

/// Get the path to the local config file in a working directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".syllabus.toml")
}

/// Expand `~`, `$VAR` and `${VAR}`; leaves the input as is when a variable
/// is undefined.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn expand_paths(&mut self) {
        self.data_dir = expand_path(&self.data_dir);
        self.document.output_dir = expand_path(&self.document.output_dir);
    }

    /// Scalars: overlay wins when given. `recommended_sections`: `union`
    /// merges with negation, otherwise the overlay replaces.
    fn overlay(&self, raw: &RawSettings, union: bool) -> Self {
        let recommended_sections = match &raw.validation.recommended_sections {
            Some(items) if union => merge_array(&self.validation.recommended_sections, items),
            Some(items) => items.clone(),
            None => self.validation.recommended_sections.clone(),
        };
        Self {
            data_dir: pick(&raw.data_dir, &self.data_dir),
            storage: StorageConfig {
                template_key: pick(&raw.storage.template_key, &self.storage.template_key),
                values_key: pick(&raw.storage.values_key, &self.storage.values_key),
                stats_key: pick(&raw.storage.stats_key, &self.storage.stats_key),
            },
            validation: ValidationConfig {
                max_depth: pick(&raw.validation.max_depth, &self.validation.max_depth),
                recommended_sections,
            },
            document: DocumentConfig {
                output_dir: pick(&raw.document.output_dir, &self.document.output_dir),
                institution: pick(&raw.document.institution, &self.document.institution),
                address: pick(&raw.document.address, &self.document.address),
                default_faculty: pick(&raw.document.default_faculty, &self.document.default_faculty),
                default_program: pick(&raw.document.default_program, &self.document.default_program),
                default_course: pick(&raw.document.default_course, &self.document.default_course),
            },
        }
    }

    /// Merge local config onto self with union semantics for arrays.
    pub fn merge_with(&self, local: &RawSettings) -> Self {
        self.overlay(local, true)
    }

    /// Apply global config onto defaults; arrays replace.
    pub fn apply_global(&self, global: &RawSettings) -> Self {
        self.overlay(global, false)
    }

    /// Load settings with layered precedence.
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with `!item` negation
    /// - Any → Env vars: REPLACE
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.apply_global(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply SYLLABUS_* environment variables as explicit overrides, e.g.
    /// `SYLLABUS_DATA_DIR`, `SYLLABUS_VALIDATION__MAX_DEPTH`,
    /// `SYLLABUS_VALIDATION__RECOMMENDED_SECTIONS=SUMILLA,EVALUACION`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("SYLLABUS")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("validation.recommended_sections")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        let string = |key: &str| config.get_string(key).ok();
        if let Some(val) = string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Some(val) = string("storage.template_key") {
            settings.storage.template_key = val;
        }
        if let Some(val) = string("storage.values_key") {
            settings.storage.values_key = val;
        }
        if let Some(val) = string("storage.stats_key") {
            settings.storage.stats_key = val;
        }
        if let Ok(val) = config.get::<usize>("validation.max_depth") {
            settings.validation.max_depth = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("validation.recommended_sections") {
            settings.validation.recommended_sections = val;
        }
        if let Some(val) = string("document.output_dir") {
            settings.document.output_dir = PathBuf::from(val);
        }
        if let Some(val) = string("document.institution") {
            settings.document.institution = val;
        }
        if let Some(val) = string("document.address") {
            settings.document.address = val;
        }
        if let Some(val) = string("document.default_faculty") {
            settings.document.default_faculty = val;
        }
        if let Some(val) = string("document.default_program") {
            settings.document.default_program = val;
        }
        if let Some(val) = string("document.default_course") {
            settings.document.default_course = val;
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# syllabus configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/syllabus/syllabus.toml  (defines your baseline)
#   Local:  <dir>/.syllabus.toml              (per-course additions)
#   Env:    SYLLABUS_* environment variables  (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global; "!ITEM" removes an inherited item:
#     recommended_sections = ["RECURSOS", "!BIBLIOGRAFIA"]

# Directory holding the stored template and values
# data_dir = "~/.syllabus"

[storage]
# template_key = "mptt_template"
# values_key = "syllabus_editor_data"
# stats_key = "pdf_generation_stats"

[validation]
# Nodes nested deeper than this are reported
# max_depth = 4
# recommended_sections = ["INFORMACION_GENERAL", "SUMILLA", "COMPETENCIAS", "EVALUACION", "BIBLIOGRAFIA"]

[document]
# output_dir = "."
# institution = "Universidad Nacional"
# address = "Av. Universitaria 123"
# default_faculty = "Facultad"
# default_program = "Programa de Estudio"
# default_course = "Asignatura"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load(None).expect("load defaults");
        assert_eq!(settings.storage.template_key, "mptt_template");
        assert_eq!(settings.validation.recommended_sections.len(), 5);
    }

    #[test]
    fn given_tilde_in_data_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            data_dir: PathBuf::from("~/.syllabus"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.data_dir.to_string_lossy();
        assert!(dir.starts_with(&home), "data_dir should start with home: {dir}");
        assert!(!dir.contains('~'));
    }

    #[test]
    fn test_merge_array_union_keeps_order() {
        let result = merge_array(&strings(&["b", "a"]), &strings(&["c", "a"]));
        assert_eq!(result, strings(&["b", "a", "c"]));
    }

    #[test]
    fn test_merge_array_negation() {
        let result = merge_array(&strings(&["a", "b"]), &strings(&["!a", "c", "!x"]));
        assert_eq!(result, strings(&["b", "c"]));
    }

    #[test]
    fn given_global_sections_when_apply_global_then_replaces() {
        let raw = RawSettings {
            validation: RawValidationConfig {
                recommended_sections: Some(strings(&["SUMILLA"])),
                max_depth: None,
            },
            ..RawSettings::default()
        };

        let result = Settings::default().apply_global(&raw);

        assert_eq!(result.validation.recommended_sections, strings(&["SUMILLA"]));
        assert_eq!(result.validation.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn given_local_sections_when_merge_with_then_unions_with_negation() {
        let raw = RawSettings {
            validation: RawValidationConfig {
                recommended_sections: Some(strings(&["RECURSOS", "!BIBLIOGRAFIA"])),
                max_depth: Some(6),
            },
            document: RawDocumentConfig {
                institution: Some("UNMSM".into()),
                ..RawDocumentConfig::default()
            },
            ..RawSettings::default()
        };

        let result = Settings::default().merge_with(&raw);

        let sections = &result.validation.recommended_sections;
        assert!(sections.contains(&"RECURSOS".to_string()));
        assert!(!sections.contains(&"BIBLIOGRAFIA".to_string()));
        assert_eq!(sections.len(), 5);
        assert_eq!(result.validation.max_depth, 6);
        assert_eq!(result.document.institution, "UNMSM");
        assert_eq!(result.document.default_course, "Asignatura");
    }

    #[test]
    fn given_settings_when_to_toml_then_round_trips() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn given_template_when_parsed_then_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.data_dir.is_none());
    }
}
