//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::{FileAction, InfraError};

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            CliError::Infra(InfraError::TemplateFile { action, .. }) => match action {
                FileAction::Import => exitcode::NOINPUT,
                FileAction::Export => exitcode::CANTCREAT,
            },
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::Domain(DomainError::MalformedSnapshot(_))
                | ApplicationError::ExportBlocked { .. }
                | ApplicationError::NotExportable => exitcode::DATAERR,
                ApplicationError::Domain(_) => exitcode::USAGE,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::PersistenceWriteFailed { .. } => exitcode::IOERR,
                ApplicationError::GenerationFailed { .. } => exitcode::CANTCREAT,
                ApplicationError::OperationFailed { .. } => exitcode::SOFTWARE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DomainError::MalformedSnapshot("x".into()).into(), exitcode::DATAERR)]
    #[case(DomainError::CyclicReparent { id: 2, new_parent: 3 }.into(), exitcode::USAGE)]
    #[case(ApplicationError::NotExportable.into(), exitcode::DATAERR)]
    #[case(ApplicationError::Config { message: "bad".into() }.into(), exitcode::CONFIG)]
    #[case(CliError::InvalidArgs("x".into()), exitcode::USAGE)]
    #[case(
        InfraError::template_file(FileAction::Import, "t.json", std::io::ErrorKind::NotFound.into()).into(),
        exitcode::NOINPUT
    )]
    #[case(
        InfraError::template_file(FileAction::Export, "t.json", std::io::ErrorKind::PermissionDenied.into()).into(),
        exitcode::CANTCREAT
    )]
    fn given_error_when_exit_code_then_maps_to_sysexits(#[case] err: CliError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
    }
}
