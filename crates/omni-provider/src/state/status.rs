//! Status resources read from Omni

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterPhase {
    #[default]
    Unknown,
    ScalingUp,
    ScalingDown,
    Running,
    Destroying,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub ready: bool,
    #[serde(default)]
    pub phase: ClusterPhase,
}

impl ClusterStatus {
    pub fn ready() -> Self {
        Self {
            ready: true,
            phase: ClusterPhase::Running,
        }
    }

    pub fn pending(phase: ClusterPhase) -> Self {
        Self {
            ready: false,
            phase,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDestroyStatus {
    pub phase: String,
}

/// Lifecycle phase of a resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourcePhase {
    #[default]
    Running,
    TearingDown,
}

impl std::fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourcePhase::Running => write!(f, "running"),
            ResourcePhase::TearingDown => write!(f, "tearingDown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub id: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub phase: ResourcePhase,
    #[serde(default)]
    pub version: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
}

/// Role of a machine in its cluster
///
/// Encoded as 0 / 1 / 2 on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MachineRole {
    #[default]
    None,
    ControlPlane,
    Worker,
}

impl MachineRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineRole::None => "none",
            MachineRole::ControlPlane => "controlplane",
            MachineRole::Worker => "worker",
        }
    }
}

impl TryFrom<u8> for MachineRole {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MachineRole::None),
            1 => Ok(MachineRole::ControlPlane),
            2 => Ok(MachineRole::Worker),
            other => Err(format!("unknown machine role {}", other)),
        }
    }
}

impl From<MachineRole> for u8 {
    fn from(role: MachineRole) -> Self {
        match role {
            MachineRole::None => 0,
            MachineRole::ControlPlane => 1,
            MachineRole::Worker => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processor {
    pub core_count: u32,
    pub thread_count: u32,
    /// MHz
    pub frequency: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryModule {
    pub size_mb: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockDevice {
    pub size: u64,
    pub model: String,
    pub linux_name: String,
    pub name: String,
    pub serial: String,
    pub uuid: String,
    pub wwid: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub bus_path: String,
    pub system_disk: bool,
    pub readonly: bool,
    pub transport: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HardwareStatus {
    pub processors: Vec<Processor>,
    pub memory_modules: Vec<MemoryModule>,
    pub blockdevices: Vec<BlockDevice>,
    pub arch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkStatus {
    pub hostname: String,
    pub domainname: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineStatusSpec {
    pub talos_version: String,
    pub hardware: HardwareStatus,
    pub network: NetworkStatus,
    pub management_address: String,
    pub connected: bool,
    pub maintenance: bool,
    pub cluster: String,
    pub role: MachineRole,
    pub image_labels: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub metadata: ResourceMetadata,
    pub spec: MachineStatusSpec,
}

impl MachineStatus {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}
