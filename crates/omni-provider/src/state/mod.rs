//! Omni state and management seams
//!
//! The provider never talks to Omni directly. Everything it needs from the
//! Omni client goes through two traits:
//! - **`OmniState`**: cluster template operations and resource lookups
//! - **`Management`**: kubeconfig issuance and machine join configuration
//!
//! `MockOmniState` implements both in memory for tests.

mod mock;
mod status;

pub use mock::{MockOmniState, OperationCounts};
pub use status::{
    BlockDevice, ClusterDestroyStatus, ClusterPhase, ClusterStatus, HardwareStatus, MachineRole,
    MachineStatus, MachineStatusSpec, MemoryModule, NetworkStatus, Processor, ResourceMetadata,
    ResourcePhase,
};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Resource type name of cluster statuses
pub const CLUSTER_STATUS_TYPE: &str = "ClusterStatuses.omni.sidero.dev";

/// Resource type name of cluster destroy statuses
pub const CLUSTER_DESTROY_STATUS_TYPE: &str = "ClusterDestroyStatuses.omni.sidero.dev";

/// Resource type name of machine statuses
pub const MACHINE_STATUS_TYPE: &str = "MachineStatuses.omni.sidero.dev";

/// Resource type name of machine links
pub const LINK_TYPE: &str = "Links.omni.sidero.dev";

/// Cluster template operations and resource lookups
///
/// Lookups of a missing resource must fail with `ProviderError::NotFound`.
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait OmniState: Send + Sync {
    /// Submit a full cluster template
    async fn sync_template(&self, template: &str) -> Result<()>;

    /// Export the current template of a cluster
    async fn export_template(&self, cluster: &str) -> Result<String>;

    /// Request deletion of a cluster
    async fn delete_cluster(&self, cluster: &str) -> Result<()>;

    async fn cluster_status(&self, cluster: &str) -> Result<ClusterStatus>;

    async fn cluster_destroy_status(&self, cluster: &str) -> Result<ClusterDestroyStatus>;

    async fn list_machine_statuses(&self) -> Result<Vec<MachineStatus>>;

    /// Start tearing down a machine link
    ///
    /// Returns true once the link has no finalizers left and can be destroyed.
    async fn teardown_machine_link(&self, machine: &str) -> Result<bool>;

    async fn destroy_machine_link(&self, machine: &str) -> Result<()>;
}

/// Options of a service account kubeconfig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountOptions {
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub user: String,
    pub groups: Vec<String>,
}

/// Machine join configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinConfig {
    pub kernel_args: Vec<String>,
    pub config: String,
}

/// Management API operations
#[async_trait]
pub trait Management: Send + Sync {
    /// Issue a service account kubeconfig for a cluster
    async fn kubeconfig(&self, cluster: &str, options: &ServiceAccountOptions) -> Result<Vec<u8>>;

    /// Default machine join configuration
    async fn machine_join_config(&self) -> Result<JoinConfig>;
}
