//! Omni Core - Cluster template documents for the Omni provider
//!
//! This crate provides the template codec used throughout the provider:
//! - `DocumentKind`: The `kind` discriminator of a template document
//! - `TemplateDocument`: Typed Cluster / ControlPlane / Workers / Machine documents
//! - `TemplateBundle`: Compose fragments into one stream and split it back
//! - `validate`: Structural checks on a full cluster template
//! - `KubeConfig`: Kubeconfig model returned by the management API

pub mod compare;
pub mod document;
pub mod error;
pub mod kind;
pub mod kubeconfig;
pub mod template;

pub use compare::yaml_equivalent;
pub use document::{
    BackupConfiguration, ClusterDocument, ClusterFeatures, MachineDocument, MachineInstall,
    MachineSetDocument, Patch, TemplateDocument, VersionSettings,
};
pub use error::{ComposeError, CoreError, Result, SplitError};
pub use kind::{DocumentKind, suggest_kind};
pub use kubeconfig::{
    ClusterEntry, ContextEntry, KubeConfig, NamedCluster, NamedContext, NamedUser, UserEntry,
};
pub use template::{
    SplitMode, TemplateBundle, cluster_name, compose, split, split_with_mode, validate,
};
