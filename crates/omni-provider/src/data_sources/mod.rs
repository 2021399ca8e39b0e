//! Read-only data sources

mod cluster_template;
mod join_config;
mod machine_status;

pub use cluster_template::{
    BackupConfigurationModel, CLUSTER_TEMPLATE_DATA_SOURCE, ClusterFeaturesModel,
    ClusterTemplateConfig, ClusterTemplateDataSource, ClusterTemplateModel, VersionModel,
    go_duration,
};
pub use join_config::{
    DEFAULT_JOIN_CONFIG_ID, JOIN_CONFIG_DATA_SOURCE, JoinConfigDataSource, JoinConfigModel,
};
pub use machine_status::{
    HardwareInfo, MACHINE_STATUS_DATA_SOURCE, MachineFilters, MachineInfo, MachineStatusConfig,
    MachineStatusDataSource, MachineStatusModel,
};

use async_trait::async_trait;

use crate::diagnostics::Diagnostics;

/// Contract of a data source
#[async_trait]
pub trait DataSource: Send + Sync {
    type Config: Send + Sync;
    type Model: Send + Sync;

    /// Full type name, e.g. `omni_machine_status`
    fn type_name(&self) -> &'static str;

    async fn read(&self, config: Self::Config) -> Result<Self::Model, Diagnostics>;
}
