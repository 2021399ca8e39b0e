//! CLI error type with exit code mapping

use std::path::Path;

use miette::Diagnostic;
use omni_core::CoreError;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The template parsed but is not a valid cluster template
    #[error("Validation failed: {message}")]
    #[diagnostic(code(omni::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Template error: {message}")]
    #[diagnostic(code(omni::cli::template))]
    Template {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(omni::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(omni::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn template_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// IO error naming the file involved
    pub fn io_at(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let help = match &err {
            CoreError::MissingKind { .. } => {
                Some("every document needs `kind: Cluster`, `ControlPlane`, `Workers` or `Machine`")
            }
            CoreError::MissingDocument { .. } => {
                Some("a cluster template starts with a Cluster document")
            }
            _ => None,
        };
        CliError::Template {
            message: err.to_string(),
            help: help.map(str::to_string),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
