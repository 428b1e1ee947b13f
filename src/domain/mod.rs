//! Domain layer: template tree, values and their rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod document;
pub mod drag;
pub mod error;
pub mod node;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod validate;
pub mod values;

pub use document::{export_filename, format_field_label, HeaderDefaults, SyllabusDocument};
pub use drag::{DragOutcome, DragSession, DragState, Reparent};
pub use error::{DomainError, DomainResult};
pub use node::{Attributes, Direction, Node, NodeId, ROOT_ID};
pub use query::{Ancestry, TreeQuery};
pub use snapshot::{parse_snapshot, TemplateDocument};
pub use store::NodeStore;
pub use validate::{ValidationError, ValidationReport, ValidationWarning, Validator};
pub use values::{CompletionStats, FieldValue, ValueMap};
