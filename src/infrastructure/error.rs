//! Errors raised at the process boundary: template files and the working
//! directory. Storage failures of the key-value store surface as
//! application errors instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

/// Direction of a template file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Import,
    Export,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAction::Import => f.write_str("read"),
            FileAction::Export => f.write_str("write"),
        }
    }
}

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot {action} template file {}", .path.display())]
    TemplateFile {
        action: FileAction,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn template_file(
        action: FileAction,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::TemplateFile {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;
