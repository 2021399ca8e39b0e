//! Core error types

use thiserror::Error;

use crate::kind::DocumentKind;
use crate::template::TemplateBundle;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize {context}: {source}")]
    Serialize {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Document {index} has no `kind` field")]
    MissingKind { index: usize },

    #[error("Document {index} has unknown kind `{kind}`{}", suggestion.map(|s| format!(" (did you mean `{}`?)", s)).unwrap_or_default())]
    UnknownKind {
        index: usize,
        kind: String,
        suggestion: Option<&'static str>,
    },

    #[error("Template has no {kind} document")]
    MissingDocument { kind: DocumentKind },

    #[error("Invalid template:\n  - {}", problems.join("\n  - "))]
    InvalidTemplate { problems: Vec<String> },

    #[error("Invalid machine set kind `{kind}`, expected `controlplane` or `worker`")]
    InvalidMachineSetKind { kind: String },

    #[error("Invalid machine ID {id:?}")]
    InvalidMachineId { id: String },

    #[error("Invalid patch: {message}")]
    InvalidPatch { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl CoreError {
    pub(crate) fn parse(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        CoreError::Parse {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn serialize(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        CoreError::Serialize {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Compose failure, with the stream produced before the failing fragment
#[derive(Error, Debug)]
#[error("{source}")]
pub struct ComposeError {
    pub partial: String,
    #[source]
    pub source: CoreError,
}

/// Split failure, with the fragments accumulated before the failing document
#[derive(Error, Debug)]
#[error("{source}")]
pub struct SplitError {
    pub partial: TemplateBundle,
    #[source]
    pub source: CoreError,
}
