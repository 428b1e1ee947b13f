//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (KeyValueStore, DocumentGenerator)
//! but are themselves concrete structs, not traits.

mod syllabus;
mod template;

pub use syllabus::{GenerationStats, SyllabusService};
pub use template::TemplateService;
