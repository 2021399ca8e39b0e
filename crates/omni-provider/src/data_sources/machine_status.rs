//! `omni_machine_status` data source
//!
//! Lists machine statuses, optionally filtered, and flattens each one into a
//! `MachineInfo` record.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::DataSource;
use crate::diagnostics::{Diagnostics, WithSummary};
use crate::state::{
    BlockDevice, MachineRole, MachineStatus, MemoryModule, NetworkStatus, OmniState, Processor,
};

pub const MACHINE_STATUS_DATA_SOURCE: &str = "omni_machine_status";

/// All set filters must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineFilters {
    /// Every label must be present with the same value
    pub labels: IndexMap<String, String>,
    /// Every image label key must be present
    pub image_labels: Vec<String>,
    pub cluster: Option<String>,
    pub id: Option<String>,
    pub connected: Option<bool>,
    pub maintenance: Option<bool>,
    /// `controlplane` or `worker`
    pub role: Option<String>,
}

impl MachineFilters {
    fn role(&self) -> Result<Option<MachineRole>, Diagnostics> {
        match self.role.as_deref() {
            None => Ok(None),
            Some("controlplane") => Ok(Some(MachineRole::ControlPlane)),
            Some("worker") => Ok(Some(MachineRole::Worker)),
            Some(other) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.add_attribute_error(
                    "filters.role",
                    "Invalid role filter",
                    format!("expected `controlplane` or `worker`, got `{}`", other),
                );
                Err(diagnostics)
            }
        }
    }

    fn matches(&self, machine: &MachineStatus, role: Option<MachineRole>) -> bool {
        let spec = &machine.spec;

        self.labels
            .iter()
            .all(|(k, v)| machine.metadata.labels.get(k) == Some(v))
            && self
                .image_labels
                .iter()
                .all(|k| spec.image_labels.contains_key(k))
            && self.cluster.as_ref().is_none_or(|c| &spec.cluster == c)
            && self.id.as_ref().is_none_or(|id| &machine.metadata.id == id)
            && self.connected.is_none_or(|c| spec.connected == c)
            && self.maintenance.is_none_or(|m| spec.maintenance == m)
            && role.is_none_or(|r| spec.role == r)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatusConfig {
    #[serde(default)]
    pub filters: Option<MachineFilters>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub processors: Vec<Processor>,
    pub memory_modules: Vec<MemoryModule>,
    pub block_devices: Vec<BlockDevice>,
    pub arch: String,
}

/// Flat view of one machine status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub namespace: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    pub phase: String,
    /// RFC 3339
    pub created: String,
    /// RFC 3339
    pub updated: String,
    pub labels: IndexMap<String, String>,
    pub talos_version: String,
    pub hardware: HardwareInfo,
    pub network: NetworkStatus,
    pub management_address: String,
    pub connected: bool,
    pub maintenance: bool,
    pub cluster: String,
    /// `controlplane`, `worker` or `none`
    pub role: String,
    pub image_labels: IndexMap<String, String>,
}

impl From<MachineStatus> for MachineInfo {
    fn from(status: MachineStatus) -> Self {
        let MachineStatus { metadata, spec } = status;
        Self {
            namespace: metadata.namespace,
            resource_type: metadata.resource_type,
            id: metadata.id,
            phase: metadata.phase.to_string(),
            created: metadata.created.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated: metadata.updated.to_rfc3339_opts(SecondsFormat::Secs, true),
            labels: metadata.labels,
            talos_version: spec.talos_version,
            hardware: HardwareInfo {
                processors: spec.hardware.processors,
                memory_modules: spec.hardware.memory_modules,
                block_devices: spec.hardware.blockdevices,
                arch: spec.hardware.arch,
            },
            network: spec.network,
            management_address: spec.management_address,
            connected: spec.connected,
            maintenance: spec.maintenance,
            cluster: spec.cluster,
            role: spec.role.as_str().to_string(),
            image_labels: spec.image_labels,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatusModel {
    pub filters: Option<MachineFilters>,
    pub machines: Vec<MachineInfo>,
}

pub struct MachineStatusDataSource<S: ?Sized> {
    state: Arc<S>,
}

impl<S: OmniState + ?Sized> MachineStatusDataSource<S> {
    pub fn new(state: Arc<S>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl<S: OmniState + ?Sized> DataSource for MachineStatusDataSource<S> {
    type Config = MachineStatusConfig;
    type Model = MachineStatusModel;

    fn type_name(&self) -> &'static str {
        MACHINE_STATUS_DATA_SOURCE
    }

    async fn read(&self, config: MachineStatusConfig) -> Result<MachineStatusModel, Diagnostics> {
        let role = match &config.filters {
            Some(filters) => filters.role()?,
            None => None,
        };

        let machines = self
            .state
            .list_machine_statuses()
            .await
            .summary("Failed to get omni machine statuses")?;
        tracing::debug!(count = machines.len(), "machine statuses found");

        let machines = machines
            .into_iter()
            .filter(|machine| {
                config
                    .filters
                    .as_ref()
                    .is_none_or(|filters| filters.matches(machine, role))
            })
            .map(MachineInfo::from)
            .collect();

        Ok(MachineStatusModel {
            filters: config.filters,
            machines,
        })
    }
}
