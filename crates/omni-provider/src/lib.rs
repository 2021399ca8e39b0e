//! Omni Provider - Declarative cluster management for Omni
//!
//! This crate provides:
//! - **State seams**: `OmniState` and `Management` traits standing in for the Omni client
//! - **Readiness Poller**: Bounded, cancellable waits for cluster readiness and deletion
//! - **Resources**: `omni_cluster`, machine set / machine templates and kubeconfigs
//! - **Data Sources**: Machine statuses, cluster templates and the default join config
//! - **Configuration**: Endpoint and service account key with environment fallback

pub mod config;
pub mod data_sources;
pub mod diagnostics;
pub mod error;
pub mod poller;
pub mod provider;
pub mod resources;
pub mod state;

pub use config::{ProviderConfig, ResolvedConfig, SecretString};
pub use data_sources::DataSource;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ProviderError, Result};
pub use poller::{PollConfig, PollState, ReadinessPoller};
pub use provider::{ConfiguredProvider, OmniProvider, PROVIDER_TYPE_NAME};
pub use resources::Resource;
pub use state::{Management, MockOmniState, OmniState};
