//! Error types for omni-provider

use std::time::Duration;

use thiserror::Error;

/// Result type for omni-provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to Omni
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// The requested resource does not exist (yet, or anymore)
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// Omni API error
    #[error("Omni API error: {0}")]
    Api(String),

    /// Template synchronization failed
    #[error("failed to sync template for cluster '{cluster}': {message}")]
    Sync { cluster: String, message: String },

    /// Cluster deletion failed
    #[error("failed to delete cluster '{cluster}': {message}")]
    Delete { cluster: String, message: String },

    /// Template export failed
    #[error("failed to export template for cluster '{cluster}': {message}")]
    Export { cluster: String, message: String },

    /// Template encoding or decoding error
    #[error("template error: {0}")]
    Template(#[from] omni_core::CoreError),

    /// The poller gave up
    #[error("timed out waiting for {operation} of cluster '{cluster}' after {} ({attempts} attempts)", humantime_serde::re::humantime::format_duration(*elapsed))]
    Timeout {
        operation: String,
        cluster: String,
        elapsed: Duration,
        attempts: u32,
    },

    /// The poller was cancelled
    #[error("{operation} of cluster '{cluster}' was cancelled")]
    Cancelled { operation: String, cluster: String },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubeconfig could not be issued or decoded
    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ProviderError {
    fn from(e: serde_yaml::Error) -> Self {
        ProviderError::InvalidConfig(e.to_string())
    }
}

impl ProviderError {
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        ProviderError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}
